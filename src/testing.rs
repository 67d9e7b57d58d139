//! Helpers shared by the unit tests.

use std::path::{Path, PathBuf};

/// Write an executable shell script standing in for the encoder binary.
///
/// Tests point `FFMPEG_PATH`-style configuration at these stubs so that
/// subprocess behavior is exercised without a real FFmpeg install.
pub(crate) fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    path
}
