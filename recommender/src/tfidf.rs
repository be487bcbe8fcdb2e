use crate::dictionary::{Dictionary, TermId};
use serde::{Deserialize, Serialize};

/// TF-IDF weighting against a fixed dictionary.
///
/// One symmetric "ntc" scheme for both the indexed corpus and incoming
/// queries: natural term frequency, idf = log2(N / df), cosine-normalized.
/// Using the same scheme on both sides keeps similarity scores comparable
/// between corpus documents and ad-hoc query text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdf {
    idf: Vec<f32>,
}

impl TfIdf {
    pub fn new(dictionary: &Dictionary) -> TfIdf {
        let n = dictionary.num_docs().max(1) as f32;
        let idf = (0..dictionary.len() as TermId)
            .map(|id| {
                let df = dictionary.doc_freq(id);
                if df == 0 {
                    0.0
                } else {
                    (n / df as f32).log2()
                }
            })
            .collect();
        TfIdf { idf }
    }

    pub fn num_terms(&self) -> usize {
        self.idf.len()
    }

    /// Sparse weighted vector with unit L2 norm. Terms whose idf is zero
    /// (present in every document) drop out; a query with no known terms
    /// yields an empty vector.
    pub fn transform(&self, bow: &[(TermId, u32)]) -> Vec<(TermId, f32)> {
        let mut weighted: Vec<(TermId, f32)> = bow
            .iter()
            .filter_map(|&(id, count)| {
                let idf = *self.idf.get(id as usize)?;
                let w = count as f32 * idf;
                (w != 0.0).then_some((id, w))
            })
            .collect();
        let norm: f32 = weighted.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in weighted.iter_mut() {
                *w /= norm;
            }
        }
        weighted
    }
}
