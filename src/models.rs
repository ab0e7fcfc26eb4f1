//
// models.rs
// Dicom-Study-rs
//
// Defines serializable data structures for the study summary: study, series and per-instance records.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// Study-level view of an aggregated directory, emitted as JSON by `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub study_instance_uid: String,
    pub directory: PathBuf,
    pub dictionary: String,
    pub number_of_instances: usize,
    pub study_date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    pub series: BTreeMap<String, SeriesSummary>,
}

/// Instances grouped under one Series Instance UID, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesSummary {
    pub instances: Vec<InstanceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub sop_instance_uid: String,
    pub path: PathBuf,
    pub transfer_syntax: Option<String>,
    pub binary_items: Vec<BinaryItemSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryItemSummary {
    pub bid: usize,
    pub tag_path: String,
    pub size: usize,
    pub digest: String,
}
