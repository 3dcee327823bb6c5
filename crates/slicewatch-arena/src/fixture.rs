//! Fixture file I/O.
//!
//! The trivial external contract: read every byte of a file, and write
//! received bytes in the order they arrived.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ArenaError;
use crate::view::View;

/// Read all bytes of `path`.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<u8>, ArenaError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ArenaError::fixture(path, e))?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "fixture read");
    Ok(bytes)
}

/// Write the bytes of `views` to `path`, in iteration order.
///
/// Returns the number of bytes written.
pub fn write_views<'a, I>(path: impl AsRef<Path>, views: I) -> Result<u64, ArenaError>
where
    I: IntoIterator<Item = &'a View>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ArenaError::fixture(path, e))?;
    let mut out = BufWriter::new(file);
    let mut written = 0u64;
    for view in views {
        let bytes = view.read();
        out.write_all(&bytes)
            .map_err(|e| ArenaError::fixture(path, e))?;
        written += bytes.len() as u64;
    }
    out.flush().map_err(|e| ArenaError::fixture(path, e))?;
    tracing::debug!(path = %path.display(), written, "fixture written");
    Ok(written)
}
