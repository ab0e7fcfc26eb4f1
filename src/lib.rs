//
// lib.rs
// Dicom-Study-rs
//
// Exposes the crate's modules and re-exports the study aggregator and CLI entry point for binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: the study aggregator and the pieces it is built from.
pub mod binary;
pub mod cli;
pub mod dicom_access;
pub mod dictionary;
pub mod dump;
pub mod error;
pub mod instance;
pub mod models;
pub mod study;
pub mod summary;

pub use cli::{execute, run as run_cli, Cli};
pub use dictionary::FieldDictionary;
pub use error::{Result, StudyError};
pub use instance::{DicomInstance, Instance};
pub use study::Study;
