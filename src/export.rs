//! Archive export: bundle a run's outputs into one ZIP.
//!
//! Entries are written in output-array order (completion order), DEFLATE
//! at a fixed compression level. Filenames are taken as-is: producers are
//! responsible for sanitization and collision safety before outputs reach
//! the export layer (see [`crate::filename`]).

use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::output::OutputFile;

/// DEFLATE level used for every archive. Level 6 is the historical
/// default of this tool family: measurably smaller than level 1 on
/// image-heavy bundles, far cheaper than level 9.
const COMPRESSION_LEVEL: i64 = 6;

/// Errors from archive construction.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a ZIP archive containing every output, in array order.
///
/// Returns the archive bytes; delivery is the caller's concern.
pub fn build_zip(outputs: &[OutputFile]) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for output in outputs {
        writer.start_file(&*output.filename, options)?;
        writer.write_all(&output.data)?;
    }

    let cursor = writer.finish()?;
    let bytes = cursor.into_inner();
    debug!(
        "built zip: {} entries, {} bytes",
        outputs.len(),
        bytes.len()
    );
    Ok(bytes)
}
