//! AcroForm merging.
//!
//! [`merge_forms`] folds a source document's AcroForm into a destination's.
//! When the destination has no usable form the source form replaces it
//! wholesale. Otherwise the field arrays are concatenated and the form
//! attributes are combined one by one:
//!
//! | Key               | Rule                                                      |
//! |-------------------|-----------------------------------------------------------|
//! | `NeedAppearances` | source `true` forces `true`; never cleared                |
//! | `SigFlags`        | copied when missing, else SignaturesExist/AppendOnly OR'd |
//! | `CO`              | copied when missing or empty, else appended               |
//! | `DR`              | copied when missing or empty, else left alone             |
//! | `DA`, `Q`         | copied when missing or unusable, else pushed down         |
//! | `XFA`             | removed                                                   |
//!
//! `XFA` is also stripped from a source form that replaces the destination's,
//! so it never survives a merge that changes anything.
//!
//! The merge is planned against shared borrows of both documents and only
//! written once every step has succeeded, so a failed merge leaves both
//! documents as they were.
//!
//! Copied values keep the source's object numbers. Use
//! [`crate::forms::combine_forms`] to also move the source objects into
//! the destination.
//!
//! See ISO 32000-1:2008, Section 12.7.2 - Interactive Form Dictionary.

use bitflags::bitflags;
use super::scraper::FieldType;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use serde::Serialize;

bitflags! {
    /// Document-level signature flags (ISO 32000-1:2008, Table 219).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SigFlags: i64 {
        /// Bit 1: the document contains at least one signature field
        const SIGNATURES_EXIST = 1 << 0;
        /// Bit 2: the document must only be saved by incremental update
        const APPEND_ONLY = 1 << 1;
    }
}

/// Why a merge had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// The source catalog has no `/AcroForm`
    NoSourceForm,
    /// The source AcroForm is null or an empty dictionary
    EmptySourceForm,
    /// The source AcroForm has no fields
    NoSourceFields,
}

/// Which path a merge took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Nothing was changed
    NoOp {
        /// Why
        reason: NoOpReason,
    },
    /// The destination form was replaced by the source form
    Replaced,
    /// Fields were appended and attributes combined
    Merged {
        /// Number of source fields appended
        fields_added: usize,
        /// Number of `DA`/`Q` entries pushed onto source fields
        pushed_down: usize,
    },
}

/// Where the destination's AcroForm dictionary lives.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// Inline in the catalog
    Catalog,
    /// An indirect object
    Object(ObjectRef),
}

/// Staged changes of one merge.
#[derive(Debug)]
struct MergePlan {
    acroform: Dictionary,
    target: Target,
    /// Entries to add to source field dictionaries
    push_downs: Vec<(ObjectRef, &'static str, Object)>,
    outcome: MergeOutcome,
}

/// Merge the AcroForm of `source` into `dest`.
///
/// `source` is only written when form defaults are pushed down onto its
/// text fields. On error neither document has been modified.
pub fn merge_forms(source: &mut Document, dest: &mut Document) -> Result<MergeOutcome> {
    let plan = match plan_merge(source, dest)? {
        Ok(plan) => plan,
        Err(reason) => {
            log::debug!("Merge of document {} into {}: nothing to do ({:?})", source.id(), dest.id(), reason);
            return Ok(MergeOutcome::NoOp { reason });
        },
    };
    let outcome = plan.outcome;

    match plan.target {
        Target::Catalog => {
            dest.catalog_mut()?.insert("AcroForm", Object::Dictionary(plan.acroform));
        },
        Target::Object(reference) => {
            dest.insert_object(reference, plan.acroform);
        },
    }
    for (reference, key, value) in plan.push_downs {
        if let Some(Object::Dictionary(field)) = source.find_entry_mut(reference) {
            field.insert(key, value);
        }
    }

    log::info!("Merged form of document {} into {}: {:?}", source.id(), dest.id(), outcome);
    Ok(outcome)
}

fn plan_merge(source: &Document, dest: &Document) -> Result<std::result::Result<MergePlan, NoOpReason>> {
    let src_catalog = source.catalog()?;
    let dest_catalog = dest.catalog()?;

    let src_form = match src_catalog.get("AcroForm") {
        Some(entry) => source.dereference(entry)?,
        None => return Ok(Err(NoOpReason::NoSourceForm)),
    };
    let src_form = match src_form {
        Object::Null => return Ok(Err(NoOpReason::EmptySourceForm)),
        Object::Dictionary(dict) if dict.is_empty() => return Ok(Err(NoOpReason::EmptySourceForm)),
        other => other.expect_dict()?,
    };
    let src_fields = match src_form.get("Fields") {
        Some(entry) => source.dereference(entry)?.expect_array()?,
        None => return Ok(Err(NoOpReason::NoSourceFields)),
    };
    if src_fields.is_empty() {
        return Ok(Err(NoOpReason::NoSourceFields));
    }

    let mut replacement = src_form.clone();
    replacement.remove("XFA");
    let replace = MergePlan {
        acroform: replacement,
        target: Target::Catalog,
        push_downs: Vec::new(),
        outcome: MergeOutcome::Replaced,
    };

    let dest_entry = match dest_catalog.get("AcroForm") {
        Some(entry) => entry,
        None => return Ok(Ok(replace)),
    };
    let target = match dest_entry {
        Object::Reference(r) => Target::Object(*r),
        _ => Target::Catalog,
    };
    let dest_form = match dest.dereference(dest_entry)? {
        Object::Null => return Ok(Ok(replace)),
        Object::Dictionary(dict) if dict.is_empty() => return Ok(Ok(replace)),
        other => other.expect_dict()?,
    };
    let dest_fields = match dest_form.get("Fields") {
        Some(entry) => dest.dereference(entry)?.expect_array()?,
        None => return Ok(Ok(replace)),
    };
    if dest_fields.is_empty() {
        return Ok(Ok(replace));
    }

    let mut fields = dest_fields.clone();
    fields.extend(src_fields.iter().cloned());
    let mut plan = MergePlan {
        acroform: dest_form.clone(),
        target,
        push_downs: Vec::new(),
        outcome: MergeOutcome::Replaced,
    };
    plan.acroform.insert("Fields", Object::Array(fields));

    merge_need_appearances(source, src_form, &mut plan.acroform)?;
    merge_sig_flags(source, dest, src_form, &mut plan.acroform)?;
    merge_calculation_order(source, dest, src_form, &mut plan.acroform)?;
    merge_default_resources(source, dest, src_form, &mut plan.acroform)?;

    let offset = dest_fields.len();
    let mut pushed_down = 0;
    for key in ["DA", "Q"] {
        if let Some(value) = form_default(source, src_form, key)? {
            pushed_down += merge_default(source, dest, &mut plan, src_fields, offset, key, value)?;
        }
    }
    plan.outcome = MergeOutcome::Merged {
        fields_added: src_fields.len(),
        pushed_down,
    };

    plan.acroform.remove("XFA");
    Ok(Ok(plan))
}

/// A `true` in the source forces `true` in the destination.
fn merge_need_appearances(source: &Document, src_form: &Dictionary, merged: &mut Dictionary) -> Result<()> {
    let value = match src_form.get("NeedAppearances") {
        Some(entry) => source.dereference(entry)?,
        None => return Ok(()),
    };
    match value {
        Object::Boolean(true) => {
            merged.insert("NeedAppearances", Object::Boolean(true));
        },
        Object::Boolean(false) | Object::Null => {},
        other => return Err(Error::wrong_type("Boolean", other.type_name())),
    }
    Ok(())
}

/// Only SignaturesExist and AppendOnly propagate, and only towards set.
fn merge_sig_flags(
    source: &Document,
    dest: &Document,
    src_form: &Dictionary,
    merged: &mut Dictionary,
) -> Result<()> {
    let src_flags = match src_form.get("SigFlags").map(|e| source.dereference(e)).transpose()? {
        Some(Object::Integer(flags)) => *flags,
        None | Some(Object::Null) => return Ok(()),
        Some(other) => return Err(Error::wrong_type("Integer", other.type_name())),
    };
    let dest_flags = match merged.get("SigFlags").map(|e| dest.dereference(e)).transpose()? {
        Some(Object::Integer(flags)) => *flags,
        None | Some(Object::Null) => {
            merged.insert("SigFlags", Object::Integer(src_flags));
            return Ok(());
        },
        Some(other) => return Err(Error::wrong_type("Integer", other.type_name())),
    };
    let combined = SigFlags::from_bits_retain(dest_flags) | SigFlags::from_bits_truncate(src_flags);
    merged.insert("SigFlags", Object::Integer(combined.bits()));
    Ok(())
}

/// Calculation order: destination entries first, then the source's.
fn merge_calculation_order(
    source: &Document,
    dest: &Document,
    src_form: &Dictionary,
    merged: &mut Dictionary,
) -> Result<()> {
    let src_order = match src_form.get("CO").map(|e| source.dereference(e)).transpose()? {
        None | Some(Object::Null) => return Ok(()),
        Some(other) => other.expect_array()?,
    };
    let combined = match merged.get("CO").map(|e| dest.dereference(e)).transpose()? {
        None | Some(Object::Null) => src_order.clone(),
        Some(other) => {
            let dest_order = other.expect_array()?;
            dest_order.iter().chain(src_order).cloned().collect()
        },
    };
    merged.insert("CO", Object::Array(combined));
    Ok(())
}

/// Default resources are adopted, never deep-merged.
fn merge_default_resources(
    source: &Document,
    dest: &Document,
    src_form: &Dictionary,
    merged: &mut Dictionary,
) -> Result<()> {
    let src_resources = match src_form.get("DR").map(|e| source.dereference(e)).transpose()? {
        None | Some(Object::Null) => return Ok(()),
        Some(other) => other.expect_dict()?,
    };
    if src_resources.is_empty() {
        return Ok(());
    }
    let adopt = match merged.get("DR").map(|e| dest.dereference(e)).transpose()? {
        None | Some(Object::Null) => true,
        Some(other) => other.expect_dict()?.is_empty(),
    };
    if adopt {
        merged.insert("DR", Object::Dictionary(src_resources.clone()));
    }
    Ok(())
}

/// A form's `DA` (non-empty string) or `Q` (integer), if usable.
fn form_default(doc: &Document, form: &Dictionary, key: &'static str) -> Result<Option<Object>> {
    let value = match form.get(key) {
        Some(entry) => doc.dereference(entry)?,
        None => return Ok(None),
    };
    Ok(match (key, value) {
        ("DA", Object::String(s)) if !s.is_empty() => Some(value.clone()),
        ("Q", Object::Integer(_)) => Some(value.clone()),
        _ => None,
    })
}

/// Adopt a form default, or push it onto source text fields that lack it.
///
/// A destination value of the wrong type counts as missing.
/// Returns the number of fields that received the value.
fn merge_default(
    source: &Document,
    dest: &Document,
    plan: &mut MergePlan,
    src_fields: &[Object],
    offset: usize,
    key: &'static str,
    value: Object,
) -> Result<usize> {
    if form_default(dest, &plan.acroform, key)?.is_none() {
        plan.acroform.insert(key, value);
        return Ok(0);
    }

    let mut pushed = 0;
    for (i, entry) in src_fields.iter().enumerate() {
        let field = source.dereference(entry)?.expect_dict()?;
        if FieldType::of(field) != Some(FieldType::Text) || field.contains_key(key) {
            continue;
        }
        match entry {
            Object::Reference(reference) => plan.push_downs.push((*reference, key, value.clone())),
            _ => {
                // Direct field dictionaries were copied into the merged array.
                if let Some(Object::Dictionary(copy)) = plan
                    .acroform
                    .get_mut("Fields")
                    .and_then(|fields| match fields {
                        Object::Array(items) => items.get_mut(offset + i),
                        _ => None,
                    })
                {
                    copy.insert(key, value.clone());
                }
            },
        }
        pushed += 1;
    }
    Ok(pushed)
}
