use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]{2,}").expect("valid regex");
}

/// Closed class of non-discriminative short words seen in virtually every
/// ruling.
const STOP_WORDS: &[&str] = &["от", "на", "не", "рф", "ст"];

/// Turns normalized text into a sequence of stemmed terms using NFKC
/// normalization, lowercasing, stopword removal and Russian stemming.
///
/// Stems are memoized in a process-lifetime cache keyed by surface form; the
/// cache only ever grows (the stem vocabulary is bounded) and never changes
/// output, only latency. One `Tokenizer` value is shared by every model.
pub struct Tokenizer {
    stemmer: Stemmer,
    stop_words: HashSet<&'static str>,
    stem_cache: Mutex<HashMap<String, String>>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::Russian),
            stop_words: STOP_WORDS.iter().copied().collect(),
            stem_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Token order follows appearance order: bag-of-words counting does not
    /// care, but the embedding model is trained on sequences.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for mat in TOKEN_RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.stop_words.contains(token) {
                continue;
            }
            tokens.push(self.stem(token));
        }
        tokens
    }

    fn stem(&self, token: &str) -> String {
        let mut cache = self.stem_cache.lock();
        if let Some(stem) = cache.get(token) {
            return stem.clone();
        }
        let stem = self.stemmer.stem(token).to_string();
        cache.insert(token.to_string(), stem.clone());
        stem
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::new();
        let toks = t.tokenize("Взыскать задолженность по договорам");
        assert!(!toks.is_empty());
        assert!(toks.iter().all(|w| w.chars().count() >= 2));
    }
}
