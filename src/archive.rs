use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Result, SplitError};

/// Zip `files` into `writer`, one DEFLATE entry per file named after the
/// file itself (no directory prefix), in the given order. Returns the entry
/// count.
pub fn write_archive<W: Write + Seek>(files: &[PathBuf], writer: W) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SplitError::Staging(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("staged file has no usable name: {}", path.display()),
                ))
            })?;

        zip.start_file(name, options)?;
        let mut src = File::open(path)?;
        io::copy(&mut src, &mut zip)?;
    }

    zip.finish()?;
    Ok(files.len())
}
