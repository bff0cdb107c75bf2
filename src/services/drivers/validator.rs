//! Driver archive validation.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Local file header signature of ZIP/JAR archives.
pub const ARCHIVE_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Check that `path` holds a well-formed archive.
///
/// Read-only. Rejects a missing path, an empty or undersized file, a wrong
/// leading signature and a file the archive reader cannot open.
pub fn validate_archive(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::invalid_archive(path, "file does not exist"))?;
    if !metadata.is_file() {
        return Err(Error::invalid_archive(path, "not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(Error::invalid_archive(path, "file is empty"));
    }

    let mut file =
        File::open(path).map_err(|e| Error::invalid_archive(path, format!("cannot open: {}", e)))?;

    let mut header = [0u8; 4];
    file.read_exact(&mut header)
        .map_err(|_| Error::invalid_archive(path, "file is too small"))?;
    if header != ARCHIVE_MAGIC {
        return Err(Error::invalid_archive(
            path,
            format!("bad signature 0x{}", hex::encode(header)),
        ));
    }

    let file =
        File::open(path).map_err(|e| Error::invalid_archive(path, format!("cannot open: {}", e)))?;
    let archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::invalid_archive(path, format!("corrupt archive: {}", e)))?;

    debug!(
        "Validated archive {} ({} entries)",
        path.display(),
        archive.len()
    );
    Ok(())
}
