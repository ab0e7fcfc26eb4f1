//
// binary.rs
// Dicom-Study-rs
//
// Copies large binary element values out to temporary files, one per value, and deletes them on release.
//
// Thales Matheus Mendonça Santos - November 2025

use std::io::Write;
use std::path::Path;

use dicom::core::Tag;
use sha2::{Digest, Sha256};
use tempfile::{Builder, TempPath};

use crate::error::{Result, StudyError};

/// Values at least this long are stored out of line. Pixel Data is always stored out of line.
pub const BINARY_INLINE_THRESHOLD: usize = 256;

/// One extracted binary value.
#[derive(Debug)]
pub struct BinaryItem {
    pub tag_path: Vec<Tag>,
    pub size: usize,
    pub digest: String,
    file: Option<TempPath>,
}

impl BinaryItem {
    /// Location of the temporary file, or `None` once released.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Tag path rendered as `(GGGG,EEEE)/(GGGG,EEEE)`.
    pub fn tag_path_string(&self) -> String {
        self.tag_path
            .iter()
            .map(|t| format_tag(*t))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The binary items of a single instance, in extraction order.
#[derive(Debug, Default)]
pub struct BinaryStore {
    items: Vec<BinaryItem>,
}

impl BinaryStore {
    /// Write `bytes` to a fresh temporary file and return its item index.
    pub fn add(&mut self, tag_path: &[Tag], bytes: &[u8]) -> Result<usize> {
        let mut tmp = Builder::new()
            .prefix("mint")
            .suffix(".bin")
            .tempfile()
            .map_err(|e| StudyError::io(std::env::temp_dir(), e))?;
        tmp.write_all(bytes)
            .map_err(|e| StudyError::io(tmp.path(), e))?;

        let digest = hex::encode(Sha256::digest(bytes));
        let index = self.items.len();
        let file = tmp.into_temp_path();
        tracing::debug!("Extracted binary item {} ({} bytes) to {:?}", index, bytes.len(), file);

        self.items.push(BinaryItem {
            tag_path: tag_path.to_vec(),
            size: bytes.len(),
            digest: digest[..16].to_string(),
            file: Some(file),
        });
        Ok(index)
    }

    pub fn items(&self) -> &[BinaryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Delete every temporary file still held. Keeps going past failures and reports the first.
    pub fn release(&mut self) -> Result<()> {
        let mut first_error = None;
        for item in &mut self.items {
            let Some(file) = item.file.take() else {
                continue;
            };
            let path = file.to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!("Failed to remove binary item {:?}: {}", path, e);
                first_error.get_or_insert(StudyError::io(path, e));
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}
