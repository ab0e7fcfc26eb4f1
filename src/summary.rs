//
// summary.rs
// Dicom-Study-rs
//
// Builds the JSON study summary: study-level attributes plus instances grouped by series.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDate;

use crate::dicom_access::{ElementAccess, PATIENT_ID, PATIENT_NAME, STUDY_DATE};
use crate::error::{Result, StudyError};
use crate::instance::{DicomInstance, Instance};
use crate::models::{BinaryItemSummary, InstanceSummary, SeriesSummary, StudySummary};
use crate::study::Study;

/// Series key used for instances without a Series Instance UID.
pub const UNKNOWN_SERIES: &str = "UNKNOWN";

impl Study<DicomInstance> {
    /// Summarize the study. Study-level attributes come from the first instance, like the UID.
    pub fn summary(&self) -> Result<StudySummary> {
        self.ensure_open()?;

        let first = self.instances().next().map(DicomInstance::object);
        let study_date = first
            .and_then(|obj| obj.element_str(STUDY_DATE))
            .map(|raw| format_study_date(&raw));
        let patient_name = first.and_then(|obj| obj.element_str(PATIENT_NAME));
        let patient_id = first.and_then(|obj| obj.element_str(PATIENT_ID));

        let mut series: BTreeMap<String, SeriesSummary> = BTreeMap::new();
        for instance in self.instances() {
            let key = instance
                .series_instance_uid()
                .unwrap_or(UNKNOWN_SERIES)
                .to_string();
            series
                .entry(key)
                .or_default()
                .instances
                .push(summarize_instance(instance));
        }

        Ok(StudySummary {
            study_instance_uid: self.study_instance_uid().to_string(),
            directory: self.directory().to_path_buf(),
            dictionary: self.dictionary().source().to_string(),
            number_of_instances: self.num_instances(),
            study_date,
            patient_name,
            patient_id,
            series,
        })
    }

    /// Write the pretty-printed summary to the current output (file or stdout).
    pub fn write_summary(&mut self) -> Result<()> {
        let summary = self.summary()?;
        let json = serde_json::to_string_pretty(&summary)?;
        self.with_output(|_, out, sink| {
            writeln!(out, "{}", json).map_err(|e| StudyError::io(sink, e))
        })
    }
}

fn summarize_instance(instance: &DicomInstance) -> InstanceSummary {
    InstanceSummary {
        sop_instance_uid: instance.sop_instance_uid().to_string(),
        path: instance.path().map(|p| p.to_path_buf()).unwrap_or_default(),
        transfer_syntax: instance.transfer_syntax().map(str::to_string),
        binary_items: instance
            .binaries()
            .items()
            .iter()
            .enumerate()
            .map(|(bid, item)| BinaryItemSummary {
                bid,
                tag_path: item.tag_path_string(),
                size: item.size,
                digest: item.digest.clone(),
            })
            .collect(),
    }
}

/// DA values are `YYYYMMDD`; anything else is passed through untouched.
fn format_study_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
