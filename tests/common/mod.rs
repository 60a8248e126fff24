//! Shared fixtures for integration tests.

#![allow(dead_code)]

use pdf_formkit::document::Document;
use pdf_formkit::object::{Dictionary, Object, ObjectRef};
use pdf_formkit::writer::DocumentWriter;
use std::path::{Path, PathBuf};

/// A text field dictionary named `name`.
pub fn text_field(name: &str) -> Dictionary {
    [("FT", Object::name("Tx")), ("T", Object::text(name))]
        .into_iter()
        .collect()
}

/// Build a dictionary from `(key, value)` pairs.
pub fn dict<const N: usize>(entries: [(&str, Object); N]) -> Dictionary {
    entries.into_iter().collect()
}

/// A document with a page tree, the given field objects and an inline AcroForm.
///
/// The fields are stored as objects 2.. in order; `Fields` references
/// them in the same order. `acroform` supplies the other form keys.
pub fn form_document(fields: Vec<Dictionary>, mut acroform: Dictionary) -> Document {
    let mut doc = Document::new();
    doc.insert_object(
        ObjectRef::new(1, 0),
        dict([
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ]),
    );
    let refs = fields
        .into_iter()
        .map(|field| Object::Reference(doc.add_object(field)))
        .collect();
    acroform.insert("Fields", Object::Array(refs));
    let catalog = dict([
        ("Type", Object::name("Catalog")),
        ("Pages", Object::Reference(ObjectRef::new(1, 0))),
        ("AcroForm", Object::Dictionary(acroform)),
    ]);
    let root = doc.add_object(catalog);
    doc.set_root(root);
    doc
}

/// A document with a page tree and no AcroForm.
pub fn formless_document() -> Document {
    let mut doc = Document::new();
    let pages = doc.add_object(dict([
        ("Type", Object::name("Pages")),
        ("Kids", Object::Array(vec![])),
        ("Count", Object::Integer(0)),
    ]));
    let root = doc.add_object(dict([
        ("Type", Object::name("Catalog")),
        ("Pages", Object::Reference(pages)),
    ]));
    doc.set_root(root);
    doc
}

/// The AcroForm dictionary of `doc`, following one indirection.
pub fn acroform_of(doc: &Document) -> Option<Dictionary> {
    let entry = doc.catalog().ok()?.get("AcroForm")?;
    doc.dereference(entry).ok()?.as_dict().cloned()
}

/// The object behind a `/Fields` entry.
pub fn field_at(doc: &Document, index: usize) -> Dictionary {
    let form = acroform_of(doc).expect("document has an AcroForm");
    let fields = form.array_entry("Fields").expect("AcroForm has /Fields");
    doc.dereference(&fields[index])
        .expect("field resolves")
        .as_dict()
        .expect("field is a dictionary")
        .clone()
}

/// Serialize `doc` to bytes.
pub fn to_bytes(doc: &Document) -> Vec<u8> {
    DocumentWriter::new(doc).to_bytes().expect("document serializes")
}

/// Write `bytes` to `dir/name`.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("fixture written");
    path
}

/// Assemble a classic-xref file from numbered object bodies.
///
/// `bodies[i]` becomes object `i + 1`; the trailer gets `/Root 1 0 R`.
pub fn classic_pdf(bodies: &[&str]) -> Vec<u8> {
    let mut pdf = b"%PDF-1.7\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", bodies.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            bodies.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}
