//
// instance.rs
// Dicom-Study-rs
//
// One DICOM P10 file of a study: recognition, parsing, UID access, debug output and temporary binary cleanup.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dicom::core::value::Value;
use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};

use crate::binary::BinaryStore;
use crate::dicom_access::{
    ElementAccess, SERIES_INSTANCE_UID, SOP_INSTANCE_UID, STUDY_INSTANCE_UID,
};
use crate::dictionary::FieldDictionary;
use crate::dump::{is_out_of_line, InstanceDump};
use crate::error::{Result, StudyError};

/// What a study needs from each file it aggregates.
pub trait Instance: Sized {
    /// Cheap, side-effect free check run on every file found under the study directory.
    fn is_recognized(path: &Path) -> bool;

    /// Build the instance. May still fail with a format error after `is_recognized` passed.
    fn open(path: &Path, dictionary: &Arc<FieldDictionary>) -> Result<Self>;

    fn sop_instance_uid(&self) -> &str;

    fn study_instance_uid(&self) -> &str;

    /// Write this instance's block of the study dump.
    fn debug(&self, out: &mut dyn Write) -> Result<()>;

    /// Release temporary resources. The study calls this once per instance.
    fn tidy(&mut self) -> Result<()>;

    /// Source file, when the instance was read from disk.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Check for the 128-byte preamble followed by the `DICM` magic.
pub fn is_dicom(path: &Path) -> bool {
    let mut header = [0_u8; 132];
    match File::open(path).and_then(|mut f| f.read_exact(&mut header)) {
        Ok(()) => &header[128..] == b"DICM",
        Err(_) => false,
    }
}

/// A parsed DICOM instance.
///
/// The parsed object stays in memory as a whole; large binary values are also copied out to
/// temporary files that exist until [`Instance::tidy`].
pub struct DicomInstance {
    path: PathBuf,
    object: DefaultDicomObject,
    dictionary: Arc<FieldDictionary>,
    sop_instance_uid: String,
    study_instance_uid: String,
    series_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    binaries: BinaryStore,
}

impl DicomInstance {
    pub fn series_instance_uid(&self) -> Option<&str> {
        self.series_instance_uid.as_deref()
    }

    pub fn transfer_syntax(&self) -> Option<&str> {
        self.transfer_syntax.as_deref()
    }

    pub fn binaries(&self) -> &BinaryStore {
        &self.binaries
    }

    pub fn object(&self) -> &DefaultDicomObject {
        &self.object
    }
}

impl Instance for DicomInstance {
    fn is_recognized(path: &Path) -> bool {
        is_dicom(path)
    }

    fn open(path: &Path, dictionary: &Arc<FieldDictionary>) -> Result<Self> {
        let object = open_file(path).map_err(|e| StudyError::format(path, e))?;

        let sop_instance_uid = object
            .element_str(SOP_INSTANCE_UID)
            .or_else(|| object.meta_sop_instance_uid())
            .ok_or_else(|| StudyError::format(path, "missing SOP Instance UID"))?;
        let study_instance_uid = object.element_str(STUDY_INSTANCE_UID).unwrap_or_default();
        let series_instance_uid = object.element_str(SERIES_INSTANCE_UID);
        let transfer_syntax = object.transfer_syntax();

        let mut binaries = BinaryStore::default();
        let mut tag_path = Vec::new();
        if let Err(e) = extract_binaries(&object, &mut tag_path, &mut binaries) {
            // Files already written for this instance must not outlive the failed open.
            let _ = binaries.release();
            return Err(e);
        }

        tracing::debug!(
            "Read instance {} from {:?} ({} binary items)",
            sop_instance_uid,
            path,
            binaries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            object,
            dictionary: Arc::clone(dictionary),
            sop_instance_uid,
            study_instance_uid,
            series_instance_uid,
            transfer_syntax,
            binaries,
        })
    }

    fn sop_instance_uid(&self) -> &str {
        &self.sop_instance_uid
    }

    fn study_instance_uid(&self) -> &str {
        &self.study_instance_uid
    }

    fn debug(&self, out: &mut dyn Write) -> Result<()> {
        let io_err = |e| StudyError::io(&self.path, e);
        writeln!(out, "> Instance {}", self.sop_instance_uid).map_err(io_err)?;
        InstanceDump::new(&self.dictionary, &self.binaries)
            .write_object(&self.object, 0, out)
            .map_err(io_err)
    }

    fn tidy(&mut self) -> Result<()> {
        self.binaries.release()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn extract_binaries(
    obj: &InMemDicomObject<StandardDataDictionary>,
    tag_path: &mut Vec<Tag>,
    store: &mut BinaryStore,
) -> Result<()> {
    for elem in obj.iter() {
        let header = elem.header();
        tag_path.push(header.tag);
        match elem.value() {
            Value::Primitive(p) => {
                let bytes = p.to_bytes();
                if is_out_of_line(header.tag, header.vr, bytes.len()) {
                    store.add(tag_path, &bytes)?;
                }
            }
            Value::Sequence(seq) => {
                for item in seq.items() {
                    extract_binaries(item, tag_path, store)?;
                }
            }
            Value::PixelSequence(p) => {
                for fragment in p.fragments() {
                    store.add(tag_path, fragment)?;
                }
            }
        }
        tag_path.pop();
    }
    Ok(())
}
