use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;

/// Global term <-> id mapping with document-frequency statistics, shared
/// read-only by every model trained against one corpus snapshot. Ids are
/// assigned in first-seen order; the order is not meaningful, only stable
/// within one build. Immutable once pruned.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, TermId>,
    id2token: Vec<String>,
    doc_freqs: Vec<u32>,
    num_docs: u32,
}

impl Dictionary {
    pub fn build(docs: &[Vec<String>]) -> Dictionary {
        let mut dict = Dictionary::default();
        for tokens in docs {
            let mut seen: Vec<TermId> = Vec::new();
            for token in tokens {
                let id = match dict.token2id.get(token) {
                    Some(&id) => id,
                    None => {
                        let id = dict.id2token.len() as TermId;
                        dict.token2id.insert(token.clone(), id);
                        dict.id2token.push(token.clone());
                        dict.doc_freqs.push(0);
                        id
                    }
                };
                if !seen.contains(&id) {
                    dict.doc_freqs[id as usize] += 1;
                    seen.push(id);
                }
            }
            dict.num_docs += 1;
        }
        dict
    }

    /// Prunes terms with document frequency below `no_below` (absolute) or
    /// above `no_above` (fraction of the corpus), then reassigns compact ids.
    /// Removes both noise terms and near-universal terms with no
    /// discriminative power.
    pub fn filter_extremes(&mut self, no_below: u32, no_above: f32) {
        let max_df = (no_above * self.num_docs as f32).floor() as u32;
        let mut token2id = HashMap::new();
        let mut id2token = Vec::new();
        let mut doc_freqs = Vec::new();
        for (old_id, token) in self.id2token.iter().enumerate() {
            let df = self.doc_freqs[old_id];
            if df < no_below || df > max_df {
                continue;
            }
            token2id.insert(token.clone(), id2token.len() as TermId);
            id2token.push(token.clone());
            doc_freqs.push(df);
        }
        tracing::info!(
            kept = id2token.len(),
            dropped = self.id2token.len() - id2token.len(),
            no_below,
            no_above,
            "pruned dictionary"
        );
        self.token2id = token2id;
        self.id2token = id2token;
        self.doc_freqs = doc_freqs;
    }

    /// Sparse term-count vector against this vocabulary, sorted by id.
    /// Unknown terms are dropped.
    pub fn doc2bow(&self, tokens: &[String]) -> Vec<(TermId, u32)> {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: Vec<(TermId, u32)> = counts.into_iter().collect();
        bow.sort_by_key(|&(id, _)| id);
        bow
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn doc_freq(&self, id: TermId) -> u32 {
        self.doc_freqs.get(id as usize).copied().unwrap_or(0)
    }

    pub fn token(&self, id: TermId) -> Option<&str> {
        self.id2token.get(id as usize).map(|s| s.as_str())
    }

    pub fn id_of(&self, token: &str) -> Option<TermId> {
        self.token2id.get(token).copied()
    }

    /// Terms with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.id2token.iter().enumerate().map(|(id, t)| (id as TermId, t.as_str()))
    }
}
