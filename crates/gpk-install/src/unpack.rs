//! Tarball extraction via the `tar` CLI.

use gpk_core::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, trace};

/// Extract a plain tar archive into `dest`, creating it first.
///
/// # Errors
/// Returns `Io` when the destination cannot be created or `tar` fails.
pub fn unpack(tar: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

    trace!(tar = %tar.display(), dest = %dest.display(), "extracting");
    let output = Command::new("tar")
        .arg("xf")
        .arg(tar)
        .arg("-C")
        .arg(dest)
        .output()
        .map_err(|e| Error::io(tar, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::io(
            tar,
            std::io::Error::other(format!("tar extraction failed: {}", stderr.trim())),
        ));
    }

    debug!(dest = %dest.display(), "unpacked");
    Ok(())
}
