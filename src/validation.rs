//! Structural validation of input files.
//!
//! Checks the subset of ISO 32000-1:2008 that form processing relies on:
//! a readable header and trailer, no encryption, a catalog reachable from
//! `/Root`, and an AcroForm of the expected shape. Findings are split into
//! errors and warnings; [`ValidationMode::Relaxed`] reports the
//! catalog-shape findings as warnings instead of errors.

use crate::config::{PdfConfig, ValidationMode};
use crate::document::{parse_header, Document};
use crate::error::{Error, Result};
use crate::object::Object;
use serde::Serialize;
use std::fmt;

/// Kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Header missing or malformed
    InvalidHeader,
    /// Header names a version outside 1.0-2.0
    UnsupportedVersion,
    /// Encrypted document
    Encrypted,
    /// Cross-reference data or objects could not be read
    Unreadable,
    /// Trailer `/Root` missing or not a reference
    MissingRoot,
    /// `/Root` does not lead to a dictionary
    CatalogNotDictionary,
    /// Catalog lacks `/Type /Catalog`
    CatalogType,
    /// Catalog lacks `/Pages`
    MissingPages,
    /// An in-use object could not be loaded
    ObjectLoadFailed,
    /// `/AcroForm` is not a dictionary with a `/Fields` array
    InvalidAcroForm,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            IssueCode::InvalidHeader => "invalid-header",
            IssueCode::UnsupportedVersion => "unsupported-version",
            IssueCode::Encrypted => "encrypted",
            IssueCode::Unreadable => "unreadable",
            IssueCode::MissingRoot => "missing-root",
            IssueCode::CatalogNotDictionary => "catalog-not-dictionary",
            IssueCode::CatalogType => "catalog-type",
            IssueCode::MissingPages => "missing-pages",
            IssueCode::ObjectLoadFailed => "object-load-failed",
            IssueCode::InvalidAcroForm => "invalid-acroform",
        };
        f.write_str(code)
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Finding kind.
    pub code: IssueCode,
    /// Human-readable message.
    pub message: String,
    /// Clause of ISO 32000-1:2008 the finding refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause: Option<String>,
}

impl ValidationIssue {
    /// Create a finding.
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            clause: None,
        }
    }

    /// Set the clause reference.
    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clause = Some(clause.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref clause) = self.clause {
            write!(f, " (ISO 32000-1 {})", clause)?;
        }
        Ok(())
    }
}

/// Outcome of validating one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Findings that make the input unusable.
    pub errors: Vec<ValidationIssue>,
    /// Findings that are reported but tolerated.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No error-level findings.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    fn add_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Error in strict mode, warning in relaxed mode.
    fn add_catalog_issue(&mut self, mode: ValidationMode, issue: ValidationIssue) {
        match mode {
            ValidationMode::Strict => self.add_error(issue),
            ValidationMode::Relaxed => self.add_warning(issue),
        }
    }

    fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::ValidationFailed(self.errors.iter().map(ToString::to_string).collect()))
        }
    }
}

/// Validate a file held in memory.
///
/// Returns [`Error::ValidationFailed`] listing every error-level finding.
///
/// ```
/// use pdf_formkit::config::PdfConfig;
/// use pdf_formkit::error::Error;
/// use pdf_formkit::validation::validate;
///
/// let err = validate(b"not a pdf", &PdfConfig::default()).unwrap_err();
/// assert!(matches!(err, Error::ValidationFailed(_)));
/// ```
pub fn validate(data: &[u8], config: &PdfConfig) -> Result<ValidationReport> {
    validate_and_parse(data, config).map(|(_, report)| report)
}

/// Validate a file and hand back the parsed document when it passes.
pub fn validate_and_parse(data: &[u8], config: &PdfConfig) -> Result<(Document, ValidationReport)> {
    let mut report = ValidationReport::default();

    if let Err(e) = parse_header(data, &config.parser) {
        let code = match e {
            Error::UnsupportedVersion(_) => IssueCode::UnsupportedVersion,
            _ => IssueCode::InvalidHeader,
        };
        report.add_error(ValidationIssue::new(code, e.to_string()).with_clause("7.5.2"));
        return report.into_result().map(|r| (Document::new(), r));
    }

    let doc = match Document::parse(data, &config.parser) {
        Ok(doc) => doc,
        Err(Error::Unsupported(what)) => {
            report.add_error(
                ValidationIssue::new(IssueCode::Encrypted, format!("unsupported: {}", what))
                    .with_clause("7.6"),
            );
            return report.into_result().map(|r| (Document::new(), r));
        },
        Err(e) => {
            report.add_error(ValidationIssue::new(IssueCode::Unreadable, e.to_string()).with_clause("7.5"));
            return report.into_result().map(|r| (Document::new(), r));
        },
    };

    validate_document(&doc, config.validation, &mut report);
    log::debug!(
        "Validated document {}: {} errors, {} warnings",
        doc.id(),
        report.errors.len(),
        report.warnings.len()
    );
    report.into_result().map(|r| (doc, r))
}

/// Checks that need the parsed object graph.
fn validate_document(doc: &Document, mode: ValidationMode, report: &mut ValidationReport) {
    for issue in doc.load_issues() {
        report.add_catalog_issue(
            mode,
            ValidationIssue::new(IssueCode::ObjectLoadFailed, issue.clone()).with_clause("7.5.4"),
        );
    }

    if let Err(e) = doc.root() {
        report.add_error(ValidationIssue::new(IssueCode::MissingRoot, e.to_string()).with_clause("7.5.5"));
        return;
    }
    let catalog = match doc.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            report.add_error(
                ValidationIssue::new(IssueCode::CatalogNotDictionary, e.to_string()).with_clause("7.7.2"),
            );
            return;
        },
    };

    if catalog.type_name() != Some("Catalog") {
        report.add_catalog_issue(
            mode,
            ValidationIssue::new(IssueCode::CatalogType, "catalog has no /Type /Catalog").with_clause("7.7.2"),
        );
    }
    if !catalog.contains_key("Pages") {
        report.add_catalog_issue(
            mode,
            ValidationIssue::new(IssueCode::MissingPages, "catalog has no /Pages").with_clause("7.7.2"),
        );
    }

    if let Some(entry) = catalog.get("AcroForm") {
        if let Some(problem) = acroform_problem(doc, entry) {
            report.add_catalog_issue(
                mode,
                ValidationIssue::new(IssueCode::InvalidAcroForm, problem).with_clause("12.7.2"),
            );
        }
    }
}

/// Describe what is wrong with an `/AcroForm` entry, if anything.
///
/// A null entry counts as an absent form.
fn acroform_problem(doc: &Document, entry: &Object) -> Option<String> {
    let acroform = match doc.dereference(entry) {
        Ok(Object::Null) => return None,
        Ok(Object::Dictionary(dict)) => dict,
        Ok(other) => return Some(format!("/AcroForm is {}, not a dictionary", other.type_name())),
        Err(e) => return Some(format!("/AcroForm: {}", e)),
    };
    match acroform.get("Fields").map(|fields| doc.dereference(fields)) {
        None => Some("/AcroForm has no /Fields".to_string()),
        Some(Ok(Object::Array(_))) => None,
        Some(Ok(other)) => Some(format!("/AcroForm /Fields is {}, not an array", other.type_name())),
        Some(Err(e)) => Some(format!("/AcroForm /Fields: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, ObjectRef};
    use crate::writer::DocumentWriter;

    fn build(catalog: Dictionary, extra: Vec<(ObjectRef, Object)>) -> Vec<u8> {
        let mut doc = Document::new();
        for (reference, object) in extra {
            doc.insert_object(reference, object);
        }
        let root = doc.add_object(catalog);
        doc.set_root(root);
        DocumentWriter::new(&doc).to_bytes().unwrap()
    }

    fn full_catalog() -> Dictionary {
        [
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(ObjectRef::new(1, 0))),
            (
                "AcroForm",
                Object::Dictionary([("Fields", Object::Array(vec![]))].into_iter().collect()),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn pages() -> (ObjectRef, Object) {
        let dict: Dictionary = [("Type", Object::name("Pages")), ("Count", Object::Integer(0))]
            .into_iter()
            .collect();
        (ObjectRef::new(1, 0), Object::Dictionary(dict))
    }

    #[test]
    fn test_well_formed_document_passes_strict() {
        let data = build(full_catalog(), vec![pages()]);
        let config = PdfConfig::new().with_validation(ValidationMode::Strict);
        let report = validate(&data, &config).unwrap();
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_garbage_fails_on_header() {
        match validate(b"hello world", &PdfConfig::default()) {
            Err(Error::ValidationFailed(reasons)) => {
                assert_eq!(reasons.len(), 1);
                assert!(reasons[0].starts_with("[invalid-header]"));
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version() {
        let err = validate(b"%PDF-9.1\n", &PdfConfig::default()).unwrap_err();
        assert!(format!("{}", err).contains("unsupported-version"));
    }

    #[test]
    fn test_catalog_shape_is_a_warning_when_relaxed() {
        let catalog: Dictionary = [(
            "AcroForm",
            Object::Dictionary([("Fields", Object::Integer(3))].into_iter().collect()),
        )]
        .into_iter()
        .collect();
        let data = build(catalog.clone(), vec![]);

        let report = validate(&data, &PdfConfig::default()).unwrap();
        let codes: Vec<IssueCode> = report.warnings.iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::CatalogType, IssueCode::MissingPages, IssueCode::InvalidAcroForm]
        );

        let strict = PdfConfig::new().with_validation(ValidationMode::Strict);
        match validate(&data, &strict) {
            Err(Error::ValidationFailed(reasons)) => assert_eq!(reasons.len(), 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_catalog_that_is_not_a_dictionary_fails() {
        let mut doc = Document::new();
        let root = doc.add_object(Object::Integer(1));
        doc.set_root(root);
        let data = DocumentWriter::new(&doc).to_bytes().unwrap();
        let err = validate(&data, &PdfConfig::default()).unwrap_err();
        assert!(format!("{}", err).contains("catalog-not-dictionary"));
    }

    #[test]
    fn test_null_acroform_is_accepted() {
        let mut catalog = full_catalog();
        catalog.insert("AcroForm", Object::Null);
        let data = build(catalog, vec![pages()]);
        let strict = PdfConfig::new().with_validation(ValidationMode::Strict);
        assert!(validate(&data, &strict).is_ok());
    }

    #[test]
    fn test_validate_and_parse_returns_document() {
        let data = build(full_catalog(), vec![pages()]);
        let (doc, report) = validate_and_parse(&data, &PdfConfig::default()).unwrap();
        assert!(report.is_valid());
        assert_eq!(doc.object_count(), 2);
    }
}
