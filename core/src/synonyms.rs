//! Bidirectional synonym groups used to broaden query terms.
//!
//! A group is a canonical term plus its equivalents. Looking up either the
//! canonical term or any member yields the whole group. When a term is a
//! member of several groups the first group in table order wins.

use crate::error::Result;
use crate::persist::read_json;
use indexmap::IndexMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTable {
    groups: IndexMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn new(groups: IndexMap<String, Vec<String>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.into_iter().map(|s| s.to_lowercase()).collect()))
            .collect();
        Self { groups }
    }

    /// Loads a JSON object `{canonical: [synonym, ...]}`. Key order in the
    /// file is the table order.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let groups: IndexMap<String, Vec<String>> = read_json(path.as_ref())?;
        Ok(Self::new(groups))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The term and every equivalent of it, without duplicates. The term
    /// itself always comes first.
    pub fn expand(&self, term: &str) -> Vec<String> {
        let term = term.to_lowercase();
        let mut out = vec![term.clone()];
        if let Some(synonyms) = self.groups.get(&term) {
            push_unique(&mut out, synonyms.iter());
            return out;
        }
        let group = self.groups.iter().find(|(_, syns)| syns.contains(&term));
        if let Some((canonical, synonyms)) = group {
            push_unique(&mut out, synonyms.iter());
            push_unique(&mut out, std::iter::once(canonical));
        }
        out
    }

    /// Expands every token and concatenates the expansions. Duplicates
    /// across tokens are kept.
    pub fn expand_query<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        tokens.iter().flat_map(|t| self.expand(t.as_ref())).collect()
    }
}

fn push_unique<'a>(out: &mut Vec<String>, terms: impl Iterator<Item = &'a String>) {
    for t in terms {
        if !out.contains(t) {
            out.push(t.clone());
        }
    }
}
