//! Integration tests for field scraping and batch processing.

mod common;

use common::*;
use pdf_formkit::config::{PdfConfig, ValidationMode};
use pdf_formkit::document::Document;
use pdf_formkit::error::{Error, Severity};
use pdf_formkit::forms::{scrape_fields, scrape_files, FieldAnomaly, ScrapeOptions};
use pdf_formkit::object::{Dictionary, Object, ObjectRef};
use pdf_formkit::parser_config::ParserOptions;
use tempfile::tempdir;

/// Scraping an unmodified document twice gives the same names.
#[test]
fn test_scrape_is_repeatable() {
    let data = to_bytes(&form_document(
        vec![text_field("first"), text_field("second")],
        Dictionary::new(),
    ));
    let doc = Document::parse(&data, &ParserOptions::default()).unwrap();

    let once = scrape_fields(&doc).unwrap();
    let twice = scrape_fields(&doc).unwrap();
    assert_eq!(once.names(), vec!["first", "second"]);
    assert_eq!(once, twice);
}

/// Names come out in `/Fields` order, not table order.
#[test]
fn test_scrape_follows_fields_order() {
    let mut doc = Document::new();
    for (id, name) in [(5, "C"), (3, "A"), (4, "B")] {
        doc.insert_object(ObjectRef::new(id, 0), text_field(name));
    }
    let fields = [3, 4, 5]
        .iter()
        .map(|&id| Object::Reference(ObjectRef::new(id, 0)))
        .collect();
    let root = doc.add_object(dict([(
        "AcroForm",
        Object::Dictionary(dict([("Fields", Object::Array(fields))])),
    )]));
    doc.set_root(root);

    assert_eq!(scrape_fields(&doc).unwrap().names(), vec!["A", "B", "C"]);
}

/// An incremental update that redefines a field wins over the original.
#[test]
fn test_incremental_update_is_applied() {
    let mut pdf = classic_pdf(&[
        "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [3 0 R] >> >>",
        "<< /Type /Pages /Kids [] /Count 0 >>",
        "<< /FT /Tx /T (old) >>",
    ]);
    let tail = String::from_utf8_lossy(&pdf[pdf.len() - 32..]).into_owned();
    let prev: usize = tail
        .split_whitespace()
        .rev()
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap();

    let offset = pdf.len();
    pdf.extend_from_slice(b"3 0 obj\n<< /FT /Tx /T (new) >>\nendobj\n");
    let xref = pdf.len();
    pdf.extend_from_slice(
        format!(
            "xref\n3 1\n{:010} 00000 n \ntrailer\n<< /Size 4 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            offset, prev, xref
        )
        .as_bytes(),
    );

    let doc = Document::parse(&pdf, &ParserOptions::strict()).unwrap();
    assert_eq!(scrape_fields(&doc).unwrap().names(), vec!["new"]);
}

/// One unreadable input does not stop the others.
#[test]
fn test_batch_isolates_failures() {
    let dir = tempdir().unwrap();
    let good = write_file(
        dir.path(),
        "good.pdf",
        &to_bytes(&form_document(vec![text_field("name"), text_field("email")], Dictionary::new())),
    );
    let garbage = write_file(dir.path(), "garbage.pdf", b"this is not a pdf");
    let missing = dir.path().join("missing.pdf");

    let mut partial = form_document(vec![text_field("zip")], Dictionary::new());
    let root = partial.root().unwrap();
    if let Some(Object::Dictionary(catalog)) = partial.find_entry_mut(root) {
        if let Some(Object::Dictionary(form)) = catalog.get_mut("AcroForm") {
            if let Some(Object::Array(fields)) = form.get_mut("Fields") {
                fields.push(Object::Reference(ObjectRef::new(90, 0)));
            }
        }
    }
    let partial = write_file(dir.path(), "partial.pdf", &to_bytes(&partial));

    let report = scrape_files(&[good, garbage, missing, partial], &ScrapeOptions::new());
    assert_eq!(report.field_names(), vec!["name", "email", "zip"]);
    assert_eq!(report.failures().count(), 2);
    assert!(!report.is_complete());

    assert!(matches!(report.files[1].outcome, Err(Error::ValidationFailed(_))));
    assert!(matches!(report.files[2].outcome, Err(Error::Io(_))));
    let partial = report.files[3].outcome.as_ref().unwrap();
    assert_eq!(
        partial.anomalies,
        vec![FieldAnomaly::DanglingReference {
            index: 1,
            reference: ObjectRef::new(90, 0)
        }]
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(
        json["acro_form_fields"],
        serde_json::json!(["name", "email", "zip"])
    );
    assert_eq!(json["files"].as_array().unwrap().len(), 4);
}

/// Stamping writes one output per changed input, prefixed by input index.
#[test]
fn test_batch_stamping_writes_outputs() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let first = write_file(
        dir.path(),
        "a.pdf",
        &to_bytes(&form_document(vec![text_field("a1"), text_field("a2")], Dictionary::new())),
    );
    let formless = write_file(dir.path(), "b.pdf", &to_bytes(&formless_document()));
    let third = write_file(
        dir.path(),
        "c.pdf",
        &to_bytes(&form_document(vec![text_field("c1")], Dictionary::new())),
    );

    let options = ScrapeOptions::new()
        .with_stamp(Object::text("STUFF!"))
        .with_output(&out, "stamped.pdf");
    let report = scrape_files(&[first, formless, third], &options);

    let written: Vec<_> = report
        .files
        .iter()
        .map(|f| f.outcome.as_ref().unwrap().written.clone())
        .collect();
    assert_eq!(
        written,
        vec![
            Some(out.join("0_stamped.pdf")),
            None,
            Some(out.join("2_stamped.pdf"))
        ]
    );

    let stamped = Document::open(out.join("0_stamped.pdf"), &ParserOptions::default()).unwrap();
    assert_eq!(scrape_fields(&stamped).unwrap().names(), vec!["a1", "a2"]);
    for index in 0..2 {
        assert_eq!(field_at(&stamped, index).text_entry("V").as_deref(), Some("STUFF!"));
    }
    assert!(!out.join("1_stamped.pdf").exists());
}

/// A single input keeps the plain output name.
#[test]
fn test_single_file_output_name() {
    let dir = tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "form.pdf",
        &to_bytes(&form_document(vec![text_field("x")], Dictionary::new())),
    );
    let options = ScrapeOptions::new()
        .with_stamp(Object::Integer(7))
        .with_output(dir.path(), "filled.pdf");
    let report = scrape_files(&[input], &options);
    let scrape = report.files[0].outcome.as_ref().unwrap();
    assert_eq!(scrape.stamped, 1);
    assert_eq!(scrape.written.as_deref(), Some(dir.path().join("filled.pdf").as_path()));
}

/// Catalog problems fail strict validation but only warn in relaxed mode.
#[test]
fn test_validation_mode_controls_catalog_checks() {
    let dir = tempdir().unwrap();
    let mut doc = Document::new();
    let field = doc.add_object(text_field("lonely"));
    let root = doc.add_object(dict([(
        "AcroForm",
        Object::Dictionary(dict([("Fields", Object::Array(vec![Object::Reference(field)]))])),
    )]));
    doc.set_root(root);
    let path = write_file(dir.path(), "bare.pdf", &to_bytes(&doc));

    let relaxed = scrape_files(&[&path], &ScrapeOptions::new());
    let scrape = relaxed.files[0].outcome.as_ref().unwrap();
    assert_eq!(scrape.fields, vec!["lonely"]);
    assert_eq!(scrape.warnings.len(), 2);

    let strict = ScrapeOptions::new().with_config(PdfConfig::new().with_validation(ValidationMode::Strict));
    let report = scrape_files(&[&path], &strict);
    assert!(matches!(report.files[0].outcome, Err(Error::ValidationFailed(ref reasons)) if reasons.len() == 2));
}

/// A 1.5 file indexed only by an ASCIIHex-encoded xref stream.
///
/// `extra` is spliced into the xref stream dictionary.
fn xref_stream_file(extra: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();
    for body in [
        "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [4 0 R] >> >>",
        "<< /Type /Pages /Kids [] /Count 0 >>",
        "<< /Producer (fixture) >>",
        "<< /FT /Tx /T (inner) >>",
    ] {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", offsets.len(), body).as_bytes());
    }
    let xref = pdf.len();
    offsets.push(xref);

    let mut rows = String::from("000000FF");
    for offset in &offsets {
        rows.push_str(&format!("01{:04X}00", offset));
    }
    rows.push('>');
    pdf.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R /Filter /ASCIIHexDecode {} /Length {} >>\nstream\n{}\nendstream\nendobj\nstartxref\n{}\n%%EOF\n",
            extra,
            rows.len(),
            rows,
            xref
        )
        .as_bytes(),
    );
    pdf
}

fn strict_parsing() -> ScrapeOptions {
    ScrapeOptions::new().with_config(PdfConfig::new().with_parser(ParserOptions::strict()))
}

/// The xref stream fixture itself is well formed.
#[test]
fn test_xref_stream_fixture_scrapes() {
    let doc = Document::parse(&xref_stream_file(""), &ParserOptions::strict()).unwrap();
    assert_eq!(scrape_fields(&doc).unwrap().names(), vec!["inner"]);
}

/// A predictor with zero columns fails that file only.
#[test]
fn test_batch_survives_zero_column_predictor() {
    let dir = tempdir().unwrap();
    let bad = write_file(
        dir.path(),
        "bad.pdf",
        &xref_stream_file("/DecodeParms << /Predictor 2 /Columns 0 >>"),
    );
    let good = write_file(
        dir.path(),
        "good.pdf",
        &to_bytes(&form_document(vec![text_field("name")], Dictionary::new())),
    );

    let report = scrape_files(&[&bad, &good], &strict_parsing());
    assert_eq!(report.files.len(), 2);
    assert!(report.files[0].outcome.is_err());
    assert_eq!(report.field_names(), vec!["name"]);
    assert!(report
        .failures()
        .all(|(_, e)| e.severity() == Severity::Document));
}

/// An xref subsection whose object numbers run past `u32::MAX` fails that file only.
#[test]
fn test_batch_survives_overflowing_xref_subsection() {
    let dir = tempdir().unwrap();
    let mut pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
    let xref = pdf.len();
    pdf.extend_from_slice(
        format!(
            "xref\n4294967295 2\n0000000009 00000 n \n0000000009 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            xref
        )
        .as_bytes(),
    );
    let bad = write_file(dir.path(), "bad.pdf", &pdf);
    let good = write_file(
        dir.path(),
        "good.pdf",
        &to_bytes(&form_document(vec![text_field("zip")], Dictionary::new())),
    );

    let report = scrape_files(&[&bad, &good], &strict_parsing());
    assert_eq!(report.files.len(), 2);
    assert!(report.files[0].outcome.is_err());
    assert_eq!(report.field_names(), vec!["zip"]);
}

/// Structurally hostile inputs never take the batch down, in either parser mode.
#[test]
fn test_batch_isolates_malformed_structures() {
    let dir = tempdir().unwrap();
    let good_bytes = to_bytes(&form_document(vec![text_field("kept")], Dictionary::new()));

    let mut overflowing_classic = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
    let xref = overflowing_classic.len();
    overflowing_classic.extend_from_slice(
        format!(
            "xref\n4294967294 3\n0000000000 65535 f \n0000000009 00000 n \n0000000009 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            xref
        )
        .as_bytes(),
    );
    let mut deep_nesting = b"%PDF-1.4\n1 0 obj\n".to_vec();
    deep_nesting.extend(std::iter::repeat(b'[').take(10_000));
    deep_nesting.extend_from_slice(b"\nendobj\nstartxref\n9\n%%EOF\n");

    let fixtures: Vec<(&str, Vec<u8>)> = vec![
        ("zero_columns", xref_stream_file("/DecodeParms << /Predictor 2 /Columns 0 >>")),
        ("negative_columns", xref_stream_file("/DecodeParms << /Predictor 12 /Columns -4 >>")),
        (
            "row_overflow",
            xref_stream_file("/DecodeParms << /Predictor 2 /Columns 9223372036854775807 /Colors 4 >>"),
        ),
        ("zero_bits", xref_stream_file("/DecodeParms << /Predictor 12 /BitsPerComponent 0 >>")),
        ("huge_png_row", xref_stream_file("/DecodeParms << /Predictor 12 /Columns 1000000000000 >>")),
        ("negative_index", xref_stream_file("/Index [-1 6]")),
        ("overflowing_index", xref_stream_file("/Index [4294967295 6]")),
        ("overflowing_classic", overflowing_classic),
        ("deep_nesting", deep_nesting),
        ("startxref_past_end", b"%PDF-1.4\nstartxref\n999999\n%%EOF\n".to_vec()),
        ("truncated", good_bytes[..good_bytes.len() / 2].to_vec()),
        ("header_only", b"%PDF-".to_vec()),
    ];

    let mut paths: Vec<_> = fixtures
        .iter()
        .map(|(name, bytes)| write_file(dir.path(), &format!("{}.pdf", name), bytes))
        .collect();
    paths.push(write_file(dir.path(), "good.pdf", &good_bytes));

    for options in [ScrapeOptions::new(), strict_parsing()] {
        let report = scrape_files(&paths, &options);
        assert_eq!(report.files.len(), fixtures.len() + 1);
        for (file, path) in report.files.iter().zip(&paths) {
            assert_eq!(&file.path, path);
        }
        let good = report.files.last().unwrap().outcome.as_ref().unwrap();
        assert_eq!(good.fields, vec!["kept"]);
        assert!(serde_json::to_value(&report).is_ok());
    }

    let strict = scrape_files(&paths[..fixtures.len()], &strict_parsing());
    assert!(strict.files.iter().all(|file| file.outcome.is_err()));
}
