//! Scraping a list of files.
//!
//! Each file is read, validated, parsed and scraped on its own; a failure
//! is recorded against that file and the next one is processed. When a
//! stamp value is configured, every file with at least one named field is
//! written back out with the value set on all of its fields.

use super::scraper::{scrape_fields, stamp_fields, FieldAnomaly};
use crate::config::PdfConfig;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::validation::{validate_and_parse, ValidationIssue};
use crate::writer::write_document_with_config;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default file name for stamped output.
pub const DEFAULT_OUTPUT_NAME: &str = "stamped.pdf";

/// Settings for [`scrape_files`].
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Parsing, validation and output settings
    pub config: PdfConfig,
    /// Value written to `/V` of every field; read-only scrape when `None`
    pub stamp: Option<Object>,
    /// Directory stamped files are written to
    pub output_dir: PathBuf,
    /// File name of stamped output
    pub output_name: String,
    /// Checked before each file
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            config: PdfConfig::default(),
            stamp: None,
            output_dir: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            cancel: None,
        }
    }
}

impl ScrapeOptions {
    /// Read-only scraping with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document configuration.
    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }

    /// Stamp `value` into every field.
    pub fn with_stamp(mut self, value: Object) -> Self {
        self.stamp = Some(value);
        self
    }

    /// Set where stamped files go.
    pub fn with_output(mut self, dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self.output_name = name.into();
        self
    }

    /// Stop starting new files once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Output name for the file at `index` out of `total`.
    ///
    /// With more than one input the index is prefixed so outputs do not
    /// overwrite each other.
    pub fn output_name_for(&self, index: usize, total: usize) -> String {
        if total > 1 {
            format!("{}_{}", index, self.output_name)
        } else {
            self.output_name.clone()
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// What one file produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileScrape {
    /// Field names in `/Fields` order
    pub fields: Vec<String>,
    /// Skipped `/Fields` entries
    pub anomalies: Vec<FieldAnomaly>,
    /// Validation warnings
    pub warnings: Vec<ValidationIssue>,
    /// Number of fields stamped
    pub stamped: usize,
    /// Where the stamped document was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PathBuf>,
}

/// Per-file entry of a [`ScrapeReport`].
#[derive(Debug)]
pub struct FileReport {
    /// Position in the input list
    pub index: usize,
    /// Input path
    pub path: PathBuf,
    /// Fields found, or why the file was given up on
    pub outcome: Result<FileScrape>,
}

impl Serialize for FileReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("index", &self.index)?;
        map.serialize_entry("path", &self.path)?;
        match &self.outcome {
            Ok(scrape) => {
                map.serialize_entry("fields", &scrape.fields)?;
                map.serialize_entry("anomalies", &scrape.anomalies)?;
                map.serialize_entry("warnings", &scrape.warnings)?;
                map.serialize_entry("stamped", &scrape.stamped)?;
                if let Some(ref written) = scrape.written {
                    map.serialize_entry("written", written)?;
                }
            },
            Err(e) => {
                map.serialize_entry("error", &e.to_string())?;
                map.serialize_entry("severity", &e.severity())?;
            },
        }
        map.end()
    }
}

/// Result of scraping a batch of files.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// One entry per input, in input order
    pub files: Vec<FileReport>,
}

impl ScrapeReport {
    /// Field names of all successfully scraped files, in input order.
    pub fn field_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|file| file.outcome.as_ref().ok())
            .flat_map(|scrape| scrape.fields.iter().cloned())
            .collect()
    }

    /// Files that could not be scraped.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.files
            .iter()
            .filter_map(|file| file.outcome.as_ref().err().map(|e| (file.path.as_path(), e)))
    }

    /// Every file was scraped without skipping a field.
    pub fn is_complete(&self) -> bool {
        self.files
            .iter()
            .all(|file| matches!(&file.outcome, Ok(scrape) if scrape.anomalies.is_empty()))
    }
}

impl Serialize for ScrapeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ScrapeReport", 2)?;
        state.serialize_field("acro_form_fields", &self.field_names())?;
        state.serialize_field("files", &self.files)?;
        state.end()
    }
}

/// Scrape every file in `paths`, isolating failures per file.
pub fn scrape_files<P: AsRef<Path>>(paths: &[P], options: &ScrapeOptions) -> ScrapeReport {
    let total = paths.len();
    let files = paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let path = path.as_ref();
            let outcome = if options.cancelled() {
                Err(Error::Cancelled)
            } else {
                scrape_file(index, path, total, options)
            };
            if let Err(ref e) = outcome {
                log::warn!("Skipping {} (#{}): {}", path.display(), index, e);
            }
            FileReport {
                index,
                path: path.to_path_buf(),
                outcome,
            }
        })
        .collect();
    ScrapeReport { files }
}

fn scrape_file(index: usize, path: &Path, total: usize, options: &ScrapeOptions) -> Result<FileScrape> {
    let data = std::fs::read(path)?;
    let (mut doc, validation) = validate_and_parse(&data, &options.config)?;
    let outcome = match options.stamp {
        Some(ref value) => stamp_fields(&mut doc, value)?,
        None => scrape_fields(&doc)?,
    };

    let written = if outcome.stamped > 0 {
        let name = options.output_name_for(index, total);
        Some(write_document_with_config(&doc, &options.output_dir, &name, &options.config)?)
    } else {
        None
    };

    log::debug!(
        "{}: {} fields, {} skipped",
        path.display(),
        outcome.fields.len(),
        outcome.anomalies.len()
    );
    Ok(FileScrape {
        fields: outcome.names(),
        anomalies: outcome.anomalies,
        warnings: validation.warnings,
        stamped: outcome.stamped,
        written,
    })
}
