pub mod convert;
pub mod gif;
pub mod presets;
pub mod still;
