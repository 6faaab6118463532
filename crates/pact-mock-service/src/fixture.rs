//! Sources of interaction documents.

use crate::{Error, Result};
use std::path::PathBuf;

/// An interaction document to load into the mock service
///
/// The contents are handed to the mock service verbatim; they are not parsed
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fixture {
    /// A file on disk
    Path(PathBuf),
    /// A document held in memory
    Bytes {
        /// Name used in logs and errors
        name: String,
        /// Document contents
        data: Vec<u8>,
    },
}

impl Fixture {
    /// Fixture read from a file
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Fixture::Path(path.into())
    }

    /// Fixture held in memory
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Fixture::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Name used in logs and errors
    pub fn name(&self) -> String {
        match self {
            Fixture::Path(path) => path.display().to_string(),
            Fixture::Bytes { name, .. } => name.clone(),
        }
    }

    /// Read the whole document
    pub async fn open(&self) -> Result<Vec<u8>> {
        match self {
            Fixture::Path(path) => tokio::fs::read(path).await.map_err(|source| Error::Fixture {
                name: self.name(),
                source,
            }),
            Fixture::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

impl From<PathBuf> for Fixture {
    fn from(path: PathBuf) -> Self {
        Fixture::Path(path)
    }
}
