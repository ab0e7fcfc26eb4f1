use dicom::core::Tag;
use dicom::object::DefaultDicomObject;

pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Small helper trait to pull trimmed string values from a parsed DICOM file.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn transfer_syntax(&self) -> Option<String>;
    fn meta_sop_instance_uid(&self) -> Option<String>;
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .and_then(|s| non_empty(&s))
    }

    fn transfer_syntax(&self) -> Option<String> {
        non_empty(self.meta().transfer_syntax())
    }

    fn meta_sop_instance_uid(&self) -> Option<String> {
        non_empty(&self.meta().media_storage_sop_instance_uid)
    }
}

/// UIDs are padded to even length with NUL, text values with spaces.
pub fn trim_padding(value: &str) -> &str {
    value.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = trim_padding(value);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
