use crate::chain::ClassifiedChain;
use crate::error::{Error, Result};
use crate::types::OutputPaths;
use log::info;
use std::fs;
use std::io::Write;
use std::path::Path;

/// rw-r--r--
pub const OUTPUT_MODE: u32 = 0o644;

/// Writes each role's PEM text to its path. Both files are always written;
/// a role with no certificates yields an empty file.
pub fn write_classified(classified: &ClassifiedChain, paths: &OutputPaths) -> Result<()> {
    for group in classified.groups() {
        let path = paths.path_for(group.role);
        write_pem(path, &group.pem).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Wrote {} {} certificate(s) to {}",
            group.count,
            group.role,
            path.display()
        );
    }
    Ok(())
}

fn write_pem(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(OUTPUT_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))?;
    }
    Ok(())
}
