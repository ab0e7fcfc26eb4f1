//
// dictionary.rs
// Dicom-Study-rs
//
// Field dictionary handed to every instance: resolves tag names from the standard dictionary plus optional overrides.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use dicom::core::dictionary::DataDictionary;
use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;

use crate::error::{Result, StudyError};

/// Reference selecting the DICOM standard dictionary bundled with `dicom`.
pub const DEFAULT_SOURCE: &str = "std";

/// Read-only tag metadata shared by a study and all of its instances.
#[derive(Debug, Clone)]
pub struct FieldDictionary {
    source: String,
    overrides: HashMap<Tag, String>,
}

impl Default for FieldDictionary {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            overrides: HashMap::new(),
        }
    }
}

impl FieldDictionary {
    /// Open a dictionary by reference.
    ///
    /// `""` and `"std"` select the standard dictionary. Any other reference must name a JSON
    /// file mapping `"GGGGEEEE"` tag keys to names, layered over the standard dictionary.
    pub fn open(reference: &str) -> Result<Self> {
        if reference.is_empty() || reference == DEFAULT_SOURCE {
            return Ok(Self::default());
        }

        let path = Path::new(reference);
        if !path.is_file() {
            return Err(StudyError::DictionaryNotFound(reference.to_string()));
        }

        let file = File::open(path).map_err(|e| StudyError::io(path, e))?;
        let raw: HashMap<String, String> =
            serde_json::from_reader(file).map_err(|e| StudyError::format(path, e))?;

        let mut overrides = HashMap::with_capacity(raw.len());
        for (key, name) in raw {
            let tag = parse_tag_key(&key)
                .ok_or_else(|| StudyError::format(path, format!("invalid tag key '{key}'")))?;
            overrides.insert(tag, name);
        }

        tracing::debug!(
            "Loaded {} dictionary overrides from {}",
            overrides.len(),
            reference
        );

        Ok(Self {
            source: reference.to_string(),
            overrides,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tag_name(&self, tag: Tag) -> String {
        if let Some(name) = self.overrides.get(&tag) {
            return name.clone();
        }
        StandardDataDictionary
            .by_tag(tag)
            .map(|e| e.alias.to_string())
            .unwrap_or_else(|| "UnknownTag".to_string())
    }
}

fn parse_tag_key(key: &str) -> Option<Tag> {
    let hex: String = key.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex.len() != 8 {
        return None;
    }
    let group = u16::from_str_radix(&hex[..4], 16).ok()?;
    let element = u16::from_str_radix(&hex[4..], 16).ok()?;
    Some(Tag(group, element))
}
