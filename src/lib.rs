pub mod commands;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod preset;
pub mod progress;
pub mod runner;
pub mod scheduler;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testing;
