//! Folding several documents' forms into one.

use super::merger::{merge_forms, MergeOutcome};
use crate::document::Document;
use crate::error::Result;
use serde::Serialize;

/// Result of [`combine_forms`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombineOutcome {
    /// One entry per source, in input order
    pub merges: Vec<MergeOutcome>,
    /// Objects moved into the destination
    pub objects_absorbed: usize,
}

/// Merge the forms of `sources` into `dest`, left to right.
///
/// Each source is renumbered past the destination's highest object number,
/// merged, then absorbed into the destination's table, so every field
/// reference the merge copies stays resolvable. The source page trees come
/// along as unreferenced objects; pages are not merged.
///
/// Stops at the first failing source. Sources merged before it stay merged.
pub fn combine_forms<I>(dest: &mut Document, sources: I) -> Result<CombineOutcome>
where
    I: IntoIterator<Item = Document>,
{
    let mut outcome = CombineOutcome::default();
    for mut source in sources {
        source.renumber(dest.max_object_number())?;
        let merge = merge_forms(&mut source, dest)?;
        let count = source.object_count();
        dest.absorb(source)?;
        outcome.objects_absorbed += count;
        outcome.merges.push(merge);
    }
    log::info!(
        "Combined {} documents into {} ({} objects absorbed)",
        outcome.merges.len(),
        dest.id(),
        outcome.objects_absorbed
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::scrape_fields;
    use crate::object::{Dictionary, Object};

    fn form_document(names: &[&str]) -> Document {
        let mut doc = Document::new();
        let refs = names
            .iter()
            .map(|name| {
                let field: Dictionary = [("FT", Object::name("Tx")), ("T", Object::text(name))]
                    .into_iter()
                    .collect();
                Object::Reference(doc.add_object(field))
            })
            .collect();
        let acroform: Dictionary = [("Fields", Object::Array(refs))].into_iter().collect();
        let root = doc.add_object(Dictionary::from_iter([("AcroForm", Object::Dictionary(acroform))]));
        doc.set_root(root);
        doc
    }

    #[test]
    fn test_all_fields_resolve_after_combining() {
        let mut dest = form_document(&["a", "b"]);
        let sources = vec![form_document(&["c"]), form_document(&[]), form_document(&["d", "e"])];
        let before = dest.object_count();

        let outcome = combine_forms(&mut dest, sources).unwrap();
        assert_eq!(dest.object_count(), before + outcome.objects_absorbed);
        assert_eq!(outcome.merges.len(), 3);
        assert_eq!(outcome.merges[1], MergeOutcome::NoOp {
            reason: crate::forms::NoOpReason::NoSourceFields
        });
        assert_eq!(outcome.objects_absorbed, 2 + 1 + 3);

        let scraped = scrape_fields(&dest).unwrap();
        assert_eq!(scraped.names(), vec!["a", "b", "c", "d", "e"]);
        assert!(scraped.is_complete());
    }

    #[test]
    fn test_combine_into_formless_destination() {
        let mut dest = Document::new();
        let root = dest.add_object(Dictionary::new());
        dest.set_root(root);

        let outcome = combine_forms(&mut dest, vec![form_document(&["x"]), form_document(&["y"])]).unwrap();
        assert_eq!(outcome.merges[0], MergeOutcome::Replaced);
        assert!(matches!(outcome.merges[1], MergeOutcome::Merged { fields_added: 1, .. }));
        assert_eq!(scrape_fields(&dest).unwrap().names(), vec!["x", "y"]);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut dest = form_document(&["a"]);
        let broken = Document::new();
        let result = combine_forms(&mut dest, vec![form_document(&["b"]), broken, form_document(&["c"])]);
        assert!(result.is_err());
        assert_eq!(scrape_fields(&dest).unwrap().names(), vec!["a", "b"]);
    }
}
