use crate::fields::{Field, FieldIndex, SearchIndices};
use crate::index::DocId;
use crate::tokenizer::Tokenizer;
use std::collections::BTreeSet;

/// Candidate selection over the field indices.
pub struct DocumentFilter<'a> {
    indices: &'a SearchIndices,
    tokenizer: &'a Tokenizer,
}

impl<'a> DocumentFilter<'a> {
    pub fn new(indices: &'a SearchIndices, tokenizer: &'a Tokenizer) -> Self {
        Self { indices, tokenizer }
    }

    /// Documents matching at least one term. Terms the index does not know
    /// contribute nothing.
    pub fn partial_match<S: AsRef<str>>(&self, terms: &[S], field: Field) -> BTreeSet<DocId> {
        let index = self.indices.field(field);
        terms
            .iter()
            .flat_map(|t| index.doc_ids(t.as_ref()))
            .map(str::to_string)
            .collect()
    }

    /// Documents matching every non-stopword term; one unknown term empties
    /// the result. Origin values are phrases, so there every contiguous run
    /// of terms is tried as a key and the hits are unioned instead.
    pub fn total_match<S: AsRef<str>>(&self, terms: &[S], field: Field) -> BTreeSet<DocId> {
        let index = self.indices.field(field);
        if field == Field::Origin {
            return phrase_match(index, terms);
        }
        let mut matching: Option<BTreeSet<DocId>> = None;
        for term in terms.iter().map(|t| t.as_ref()) {
            if self.tokenizer.is_stopword(term) {
                continue;
            }
            if !index.contains_term(term) {
                return BTreeSet::new();
            }
            let docs: BTreeSet<DocId> =
                index.doc_ids(term).into_iter().map(str::to_string).collect();
            matching = Some(match matching {
                None => docs,
                Some(acc) => acc.intersection(&docs).cloned().collect(),
            });
        }
        matching.unwrap_or_default()
    }
}

fn phrase_match<S: AsRef<str>>(index: FieldIndex<'_>, terms: &[S]) -> BTreeSet<DocId> {
    let mut found = BTreeSet::new();
    for i in 0..terms.len() {
        for j in i + 1..=terms.len() {
            let phrase = terms[i..j].iter().map(|t| t.as_ref()).collect::<Vec<&str>>().join(" ");
            found.extend(index.doc_ids(&phrase).into_iter().map(str::to_string));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FeatureIndex, PositionalIndex};
    use std::collections::BTreeMap;

    fn feature(entries: &[(&str, &[&str])]) -> FeatureIndex {
        entries
            .iter()
            .map(|(k, docs)| (k.to_string(), docs.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    fn positional(entries: &[(&str, &[&str])]) -> PositionalIndex {
        entries
            .iter()
            .map(|(k, docs)| {
                let postings: BTreeMap<DocId, Vec<usize>> =
                    docs.iter().map(|d| (d.to_string(), vec![0])).collect();
                (k.to_string(), postings)
            })
            .collect()
    }

    fn indices() -> SearchIndices {
        SearchIndices {
            title: Some(positional(&[("dark", &["a", "b"]), ("chocolate", &["a", "c"])])),
            origin: Some(feature(&[("brazil", &["a"]), ("united states", &["b"])])),
            brand: Some(feature(&[("chocodelight", &["a", "c"])])),
            ..SearchIndices::default()
        }
    }

    #[test]
    fn partial_match_is_union() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        let got = f.partial_match(&["dark", "chocolate", "unknown"], Field::Title);
        assert_eq!(got, BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn total_match_is_intersection_and_ignores_stopwords() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        let got = f.total_match(&["dark", "the", "chocolate"], Field::Title);
        assert_eq!(got, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn total_match_short_circuits_on_unknown_term() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        assert!(f.total_match(&["dark", "vanilla"], Field::Title).is_empty());
        assert!(f.total_match::<&str>(&[], Field::Title).is_empty());
    }

    #[test]
    fn origin_total_match_tries_sub_phrases() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        assert_eq!(
            f.total_match(&["made", "in", "brazil"], Field::Origin),
            BTreeSet::from(["a".to_string()])
        );
        let both = f.total_match(&["brazil", "or", "united", "states"], Field::Origin);
        assert_eq!(both, BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn total_is_subset_of_partial() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        for terms in [vec!["dark", "chocolate"], vec!["chocolate"], vec!["dark", "nope"]] {
            for field in [Field::Title, Field::Brand, Field::Domain] {
                let total = f.total_match(&terms, field);
                let partial = f.partial_match(&terms, field);
                assert!(total.is_subset(&partial), "{terms:?} on {field}");
            }
        }
    }

    #[test]
    fn missing_index_yields_nothing() {
        let idx = indices();
        let tok = Tokenizer::default();
        let f = DocumentFilter::new(&idx, &tok);
        assert!(f.partial_match(&["dark"], Field::Domain).is_empty());
        assert!(f.total_match(&["dark"], Field::Domain).is_empty());
    }
}
