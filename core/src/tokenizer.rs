use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]").expect("valid regex");
}

const DEFAULT_STOPWORDS: &str = include_str!("../data/stopwords-en.txt");

/// Splits text into terms: NFKC normalization, lowercase, ASCII punctuation
/// stripped, whitespace split, stopwords dropped.
///
/// The stopword set is owned by the tokenizer so every consumer (index build,
/// query expansion, total-match filtering) sees the same list.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::from_word_list(DEFAULT_STOPWORDS)
    }
}

impl Tokenizer {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { stopwords: stopwords.into_iter().map(Into::into).collect() }
    }

    /// One stopword per line; blank lines are ignored.
    pub fn from_word_list(list: &str) -> Self {
        Self::new(list.lines().map(str::trim).filter(|w| !w.is_empty()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let list = std::fs::read_to_string(path)?;
        Ok(Self::from_word_list(&list))
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    fn normalize(text: &str) -> String {
        let lowered = text.nfkc().collect::<String>().to_lowercase();
        PUNCT.replace_all(&lowered, "").into_owned()
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        Self::normalize(text)
            .split_whitespace()
            .filter(|t| !self.is_stopword(t))
            .map(str::to_string)
            .collect()
    }

    /// Like [`Tokenizer::tokenize`], but each term carries its offset in the
    /// unfiltered token stream. Stopwords still consume a position.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<(usize, String)> {
        Self::normalize(text)
            .split_whitespace()
            .enumerate()
            .filter(|(_, t)| !self.is_stopword(t))
            .map(|(pos, t)| (pos, t.to_string()))
            .collect()
    }

    /// Length of a field in surviving terms, the unit BM25 normalizes by.
    pub fn token_count(&self, text: &str) -> usize {
        Self::normalize(text)
            .split_whitespace()
            .filter(|t| !self.is_stopword(t))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_inside_words() {
        let t = Tokenizer::new(Vec::<String>::new());
        assert_eq!(t.tokenize("Choco-Delight's bar!"), vec!["chocodelights", "bar"]);
    }

    #[test]
    fn custom_stopwords_replace_default_list() {
        let t = Tokenizer::from_word_list("bar\n\n  baz \n");
        assert!(t.is_stopword("baz"));
        assert!(!t.is_stopword("the"));
        assert_eq!(t.tokenize("the bar baz"), vec!["the"]);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        let t = Tokenizer::default();
        assert!(t.tokenize("").is_empty());
        assert!(t.tokenize_with_positions("   ").is_empty());
        assert_eq!(t.token_count(""), 0);
    }
}
