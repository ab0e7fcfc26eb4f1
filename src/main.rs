//
// main.rs
// Dicom-Study-rs
//
// Entry point that hands off execution to the CLI layer; any error is printed and exits with status 1.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_study::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
