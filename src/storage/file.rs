use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::instrument;

use crate::domain::Document;

/// Errors that can occur when loading an ONLV document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document file was not found.
    #[error("document not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read document")]
    Io(#[from] io::Error),
    /// The file is not a valid ONLV JSON document.
    #[error("failed to parse document")]
    Json(#[from] serde_json::Error),
}

/// Reads an ONLV document from a JSON file.
///
/// # Errors
///
/// Returns an error if the file does not exist, cannot be read, or does not
/// contain an ONLV document.
#[instrument]
pub fn load(path: &Path) -> Result<Document, LoadError> {
    let file = File::open(path).map_err(|io_error| match io_error.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound,
        _ => LoadError::Io(io_error),
    })?;

    let document = serde_json::from_reader(BufReader::new(file))?;
    Ok(document)
}

/// Writes an ONLV document as pretty-printed JSON.
///
/// Parent directories are created automatically if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
#[instrument(skip(document))]
pub fn save(document: &Document, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
