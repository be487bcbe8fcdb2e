use crate::dictionary::Dictionary;
use crate::models::{AnyModel, ModelKind, Query, SimilarityModel};
use crate::normalize::Normalizer;
use crate::tfidf::TfIdf;
use crate::tokenizer::Tokenizer;
use anyhow::{ensure, Context, Result};
use std::collections::HashMap;

/// One ranked recommendation with its external document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub doc_id: String,
    pub score: f32,
}

/// Serving facade over one fitted model: maps external document ids to corpus
/// positions, builds the model's query representation for free text, and maps
/// ranked positions back to ids.
///
/// Loaded once at process start and shared read-only; queries are synchronous
/// and CPU-bound.
pub struct Recommender {
    normalizer: Normalizer,
    tokenizer: Tokenizer,
    dictionary: Dictionary,
    tfidf: TfIdf,
    doc_ids: Vec<String>,
    positions: HashMap<String, usize>,
    model: AnyModel,
}

impl Recommender {
    /// Rejects a model fitted against a different number of documents than
    /// the doc-id list describes — the positional contract would be broken.
    pub fn new(dictionary: Dictionary, doc_ids: Vec<String>, model: AnyModel) -> Result<Recommender> {
        ensure!(
            doc_ids.len() == model.num_docs(),
            "doc-id list has {} documents but the model was fitted on {}",
            doc_ids.len(),
            model.num_docs()
        );
        let tfidf = TfIdf::new(&dictionary);
        let positions = doc_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Ok(Recommender {
            normalizer: Normalizer::default(),
            tokenizer: Tokenizer::new(),
            dictionary,
            tfidf,
            doc_ids,
            positions,
            model,
        })
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn num_docs(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn position_of(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }

    pub fn doc_id_at(&self, position: usize) -> Option<&str> {
        self.doc_ids.get(position).map(|s| s.as_str())
    }

    /// Documents most similar to a corpus member, the member itself excluded.
    pub fn similar_for_document(&self, doc_id: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let position = self
            .position_of(doc_id)
            .with_context(|| format!("unknown document id {doc_id}"))?;
        let hits = self.model.get_similar_to_doc(position, top_n)?;
        Ok(self.resolve(hits))
    }

    /// Documents most similar to arbitrary raw text (for example an uploaded
    /// ruling). Text sharing no vocabulary with the corpus yields an empty
    /// list, not an error.
    pub fn similar_for_text(&self, raw_text: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let normalized = self.normalizer.normalize(raw_text);
        let tokens = self.tokenizer.tokenize(&normalized);
        let query = match self.model.kind() {
            ModelKind::Embedding => Query::Tokens(tokens),
            _ => {
                let bow = self.dictionary.doc2bow(&tokens);
                Query::Vector(self.tfidf.transform(&bow))
            }
        };
        let hits = self.model.get_similar(&query, top_n)?;
        Ok(self.resolve(hits))
    }

    fn resolve(&self, hits: Vec<crate::index::Hit>) -> Vec<Recommendation> {
        hits.into_iter()
            .filter_map(|h| {
                self.doc_ids
                    .get(h.doc)
                    .map(|id| Recommendation { doc_id: id.clone(), score: h.score })
            })
            .collect()
    }
}
