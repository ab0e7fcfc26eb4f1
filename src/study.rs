//
// study.rs
// Dicom-Study-rs
//
// Aggregates every DICOM instance under a directory into one study, indexed by SOP Instance UID, and dumps it.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::dictionary::FieldDictionary;
use crate::error::{Result, StudyError};
use crate::instance::{DicomInstance, Instance};

/// All instances found under one directory.
///
/// The instance list and the UID index are built together while reading the directory and never
/// change afterwards. The study owns its output file; the dictionary is shared.
pub struct Study<I: Instance = DicomInstance> {
    directory: PathBuf,
    instances: Vec<I>,
    by_uid: HashMap<String, usize>,
    dictionary: Arc<FieldDictionary>,
    output: Option<Output>,
    closed: bool,
}

struct Output {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Output {
    /// Never overwrites: an existing path, dangling symlinks included, is `OutputExists`.
    fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StudyError::OutputExists(path.to_path_buf()),
                _ => StudyError::io(path, e),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| StudyError::io(&self.path, e))?;
        tracing::debug!("Closed output {:?}", self.path);
        Ok(())
    }
}

impl Study<DicomInstance> {
    /// Read every DICOM file under `directory`.
    pub fn open(directory: impl AsRef<Path>, dictionary: Arc<FieldDictionary>) -> Result<Self> {
        Self::read(directory, dictionary)
    }
}

impl<I: Instance> Study<I> {
    /// Walk `directory` once, keeping every file the instance type recognizes.
    ///
    /// A recognized file that fails to parse aborts the whole read; instances built before it
    /// are tidied on the way out.
    pub fn read(directory: impl AsRef<Path>, dictionary: Arc<FieldDictionary>) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(StudyError::DirectoryNotFound(directory.to_path_buf()));
        }

        let mut candidates = Vec::new();
        for entry in WalkDir::new(directory)
            .contents_first(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| directory.to_path_buf());
                StudyError::io(path, io::Error::from(e))
            })?;
            // Follows symlinks, so a link to a file counts as that file.
            if !entry.path().is_file() {
                continue;
            }
            if I::is_recognized(entry.path()) {
                candidates.push(entry.into_path());
            } else {
                tracing::debug!("Skipping non-DICOM file {:?}", entry.path());
            }
        }

        let mut study = Study {
            directory: directory.to_path_buf(),
            instances: Vec::with_capacity(candidates.len()),
            by_uid: HashMap::with_capacity(candidates.len()),
            dictionary,
            output: None,
            closed: false,
        };

        // On error `study` is dropped here, which tidies whatever was already read.
        for path in candidates {
            let instance = I::open(&path, &study.dictionary)?;
            let uid = instance.sop_instance_uid().to_string();
            if let Some(previous) = study.by_uid.insert(uid, study.instances.len()) {
                tracing::warn!(
                    "Duplicate SOP Instance UID {} in {:?} replaces instance {} in the index",
                    instance.sop_instance_uid(),
                    path,
                    previous
                );
            }
            study.instances.push(instance);
        }

        tracing::info!(
            "Read {} instance(s) from {:?}",
            study.instances.len(),
            study.directory
        );
        Ok(study)
    }

    /// Redirect `dump` to a new file, or back to stdout with `None` or an empty path.
    ///
    /// The new file is created before the previous output is closed, so any failure (an existing
    /// file, a missing directory) leaves the current output untouched.
    pub fn set_output(&mut self, output: Option<&Path>) -> Result<()> {
        self.ensure_open()?;

        let next = match output.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Some(Output::create(path)?),
            None => None,
        };

        if let Some(previous) = self.output.take() {
            previous.close()?;
        }
        self.output = next;
        Ok(())
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.path.as_path())
    }

    /// Study Instance UID reported by the first instance, or `""` for an empty study.
    ///
    /// Other instances are not cross-checked here; see [`Study::check_consistency`].
    pub fn study_instance_uid(&self) -> &str {
        self.instances
            .first()
            .map(|i| i.study_instance_uid())
            .unwrap_or("")
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn instance(&self, index: usize) -> Result<&I> {
        self.ensure_open()?;
        self.instances.get(index).ok_or(StudyError::OutOfRange {
            index,
            count: self.instances.len(),
        })
    }

    pub fn instance_by_uid(&self, sop_instance_uid: &str) -> Result<&I> {
        self.ensure_open()?;
        self.by_uid
            .get(sop_instance_uid)
            .map(|&idx| &self.instances[idx])
            .ok_or_else(|| StudyError::InstanceNotFound(sop_instance_uid.to_string()))
    }

    /// Instances in discovery order.
    pub fn instances(&self) -> impl Iterator<Item = &I> {
        self.instances.iter()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn dictionary(&self) -> &FieldDictionary {
        &self.dictionary
    }

    /// Fail on the first instance whose Study Instance UID differs from the study's.
    pub fn check_consistency(&self) -> Result<()> {
        self.ensure_open()?;
        let expected = self.study_instance_uid();
        for instance in &self.instances {
            if instance.study_instance_uid() != expected {
                return Err(StudyError::StudyMismatch {
                    path: instance
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from(instance.sop_instance_uid())),
                    expected: expected.to_string(),
                    found: instance.study_instance_uid().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Write the study header and every instance block to the output file, or stdout.
    pub fn dump(&mut self) -> Result<()> {
        self.with_output(dump_instances::<I>)
    }

    /// Same text as [`Study::dump`], into any writer.
    pub fn dump_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.ensure_open()?;
        dump_instances(&self.instances, out, Path::new("<writer>"))
    }

    pub fn dump_to_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.dump_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Run `write` against the current output (file or stdout), then flush it.
    pub(crate) fn with_output<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&[I], &mut dyn Write, &Path) -> Result<()>,
    {
        self.ensure_open()?;
        let instances: &[I] = &self.instances;
        match self.output.as_mut() {
            Some(output) => {
                let out: &mut dyn Write = &mut output.writer;
                write(instances, out, &output.path)?;
                output
                    .writer
                    .flush()
                    .map_err(|e| StudyError::io(&output.path, e))
            }
            None => {
                let stdout_name = Path::new("<stdout>");
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                write(instances, &mut handle as &mut dyn Write, stdout_name)?;
                handle.flush().map_err(|e| StudyError::io(stdout_name, e))
            }
        }
    }

    /// Release every instance's temporary files and close the output.
    ///
    /// Every instance is tidied even if an earlier one fails; the first failure is returned.
    /// Calling it again does nothing. Afterwards the study only answers `num_instances` and
    /// `study_instance_uid`.
    pub fn tidy(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for instance in &mut self.instances {
            if let Err(e) = instance.tidy() {
                tracing::warn!(
                    "Failed to tidy instance {}: {}",
                    instance.sop_instance_uid(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }
        if let Some(output) = self.output.take() {
            if let Err(e) = output.close() {
                first_error.get_or_insert(e);
            }
        }

        tracing::info!("Tidied {} instance(s)", self.instances.len());
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(StudyError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<I: Instance> Drop for Study<I> {
    fn drop(&mut self) {
        if let Err(e) = self.tidy() {
            tracing::warn!("Study tidy on drop failed: {}", e);
        }
    }
}

fn dump_instances<I: Instance>(instances: &[I], out: &mut dyn Write, sink: &Path) -> Result<()> {
    let uid = instances
        .first()
        .map(|i| i.study_instance_uid())
        .unwrap_or("");
    writeln!(out, "> Study {}", uid).map_err(|e| StudyError::io(sink, e))?;

    for instance in instances {
        instance.debug(&mut *out)?;
    }
    Ok(())
}
