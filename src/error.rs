//
// error.rs
// Dicom-Study-rs
//
// Error taxonomy shared by the study aggregator, the DICOM instance reader and the field dictionary.
//
// Thales Matheus Mendonça Santos - November 2025

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StudyError>;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Directory does not exist - {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No instance with SOP Instance UID {0}")]
    InstanceNotFound(String),

    #[error("Data dictionary not found - {0}")]
    DictionaryNotFound(String),

    #[error("File already exists - {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Malformed DICOM file {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("Instance index {index} out of range (study has {count} instances)")]
    OutOfRange { index: usize, count: usize },

    #[error("Study has already been tidied")]
    Closed,

    /// An instance reports a different parent study than the first one discovered.
    #[error("{} -- study instance uid ({found}) does not match current study ({expected})", .path.display())]
    StudyMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize study summary")]
    Json(#[from] serde_json::Error),
}

impl StudyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StudyError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StudyError::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the "not found" family (missing directory, instance or dictionary).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StudyError::DirectoryNotFound(_)
                | StudyError::InstanceNotFound(_)
                | StudyError::DictionaryNotFound(_)
        )
    }
}
