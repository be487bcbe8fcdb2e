use crate::index::{Hit, MatrixSimilarity};
use crate::models::{expect_tokens, ModelKind, Query, SimilarityModel};
use anyhow::{anyhow, ensure, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

const NEG_TABLE_SIZE: usize = 100_000;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Vector dimensionality (the embedding analogue of a topic count).
    pub dim: usize,
    pub epochs: usize,
    /// Negative samples per positive pair.
    pub negative: usize,
    /// Words seen in fewer than this many positions are dropped from the
    /// embedding vocabulary.
    pub min_count: u32,
    pub initial_lr: f32,
    pub seed: u64,
}

impl EmbeddingConfig {
    pub fn new(dim: usize) -> Self {
        Self { dim, epochs: 20, negative: 5, min_count: 2, initial_lr: 0.025, seed: 42 }
    }
}

/// Paragraph-vector model (distributed bag of words): one learned vector per
/// document, trained to predict the document's own words against negative
/// samples. Trains directly on token sequences — no dictionary or TF-IDF
/// involved. A novel query is answered by inferring a vector with the word
/// matrix frozen.
#[derive(Serialize, Deserialize)]
pub struct EmbeddingModel {
    dim: usize,
    negative: usize,
    epochs: usize,
    initial_lr: f32,
    seed: u64,
    vocab: HashMap<String, u32>,
    /// Occurrence counts per vocab id; the negative-sampling table is
    /// rebuilt from these on reattach.
    counts: Vec<u32>,
    /// docs x dim.
    doc_vectors: Array2<f32>,
    /// vocab x dim output matrix.
    out_vectors: Array2<f32>,
    #[serde(skip)]
    neg_table: Vec<u32>,
    #[serde(skip)]
    index: Option<MatrixSimilarity>,
}

impl EmbeddingModel {
    pub fn fit(token_docs: &[Vec<String>], config: &EmbeddingConfig) -> Result<EmbeddingModel> {
        ensure!(!token_docs.is_empty(), "cannot fit on an empty corpus");
        ensure!(config.dim >= 1, "dim must be at least 1");
        let t0 = Instant::now();

        let mut raw_counts: HashMap<&str, u32> = HashMap::new();
        for doc in token_docs {
            for token in doc {
                *raw_counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }
        let mut kept: Vec<(&str, u32)> = raw_counts
            .into_iter()
            .filter(|&(_, c)| c >= config.min_count)
            .collect();
        kept.sort();
        ensure!(!kept.is_empty(), "no token occurs at least min_count times");

        let mut vocab = HashMap::new();
        let mut counts = Vec::new();
        for (token, count) in kept {
            vocab.insert(token.to_string(), counts.len() as u32);
            counts.push(count);
        }
        let neg_table = build_neg_table(&counts);

        let docs: Vec<Vec<u32>> = token_docs
            .iter()
            .map(|doc| doc.iter().filter_map(|t| vocab.get(t).copied()).collect())
            .collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut doc_vectors = Array2::<f32>::zeros((docs.len(), config.dim));
        for x in doc_vectors.iter_mut() {
            *x = (rng.gen::<f32>() - 0.5) / config.dim as f32;
        }
        let mut out_vectors = Array2::<f32>::zeros((vocab.len(), config.dim));

        let mut grad = vec![0.0f32; config.dim];
        for epoch in 0..config.epochs {
            let lr = decayed_lr(config.initial_lr, epoch, config.epochs);
            for (d, words) in docs.iter().enumerate() {
                for &word in words {
                    train_pair(
                        doc_vectors.row_mut(d).into_slice().expect("contiguous row"),
                        &mut out_vectors,
                        word,
                        config.negative,
                        &neg_table,
                        lr,
                        &mut grad,
                        &mut rng,
                    );
                }
            }
        }

        let index = MatrixSimilarity::build(doc_vectors.clone(), None);
        tracing::info!(
            num_docs = docs.len(),
            vocab = counts.len(),
            dim = config.dim,
            epochs = config.epochs,
            elapsed_s = t0.elapsed().as_secs_f64(),
            "fitted embedding model"
        );

        Ok(EmbeddingModel {
            dim: config.dim,
            negative: config.negative,
            epochs: config.epochs,
            initial_lr: config.initial_lr,
            seed: config.seed,
            vocab,
            counts,
            doc_vectors,
            out_vectors,
            neg_table,
            index: Some(index),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn reattach(&mut self) {
        self.neg_table = build_neg_table(&self.counts);
        self.index = Some(MatrixSimilarity::build(self.doc_vectors.clone(), None));
    }

    /// Infers a vector for unseen text against the frozen word matrix. Seeded
    /// from the model so repeated inference of the same text agrees.
    pub fn infer_vector(&self, tokens: &[String]) -> Vec<f32> {
        let words: Vec<u32> = tokens.iter().filter_map(|t| self.vocab.get(t).copied()).collect();
        if words.is_empty() {
            return Vec::new();
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut vec: Vec<f32> =
            (0..self.dim).map(|_| (rng.gen::<f32>() - 0.5) / self.dim as f32).collect();
        // Inference only updates the new document vector; the word matrix
        // stays frozen.
        let mut grad = vec![0.0f32; self.dim];
        for epoch in 0..self.epochs {
            let lr = decayed_lr(self.initial_lr, epoch, self.epochs);
            for &word in &words {
                infer_pair(
                    &mut vec,
                    &self.out_vectors,
                    word,
                    self.negative,
                    &self.neg_table,
                    lr,
                    &mut grad,
                    &mut rng,
                );
            }
        }
        vec
    }

    fn index(&self) -> Result<&MatrixSimilarity> {
        self.index.as_ref().ok_or_else(|| anyhow!("similarity index not attached"))
    }
}

impl SimilarityModel for EmbeddingModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Embedding
    }

    fn num_docs(&self) -> usize {
        self.doc_vectors.nrows()
    }

    fn get_similar(&self, query: &Query, top_n: usize) -> Result<Vec<Hit>> {
        let tokens = expect_tokens(self.kind(), query)?;
        let index = self.index()?;
        let vec = self.infer_vector(tokens);
        if vec.is_empty() {
            return Ok(Vec::new());
        }
        Ok(index.query(&vec, top_n))
    }

    fn get_similar_to_doc(&self, idx: usize, top_n: usize) -> Result<Vec<Hit>> {
        ensure!(idx < self.num_docs(), "document index {idx} out of range");
        Ok(self.index()?.query_doc(idx, top_n))
    }
}

/// Unigram distribution raised to 3/4, the standard negative-sampling shape.
fn build_neg_table(counts: &[u32]) -> Vec<u32> {
    let total: f64 = counts.iter().map(|&c| (c as f64).powf(0.75)).sum();
    let mut table = Vec::with_capacity(NEG_TABLE_SIZE);
    let mut word = 0usize;
    let mut cumulative = (counts[0] as f64).powf(0.75) / total;
    for i in 0..NEG_TABLE_SIZE {
        table.push(word as u32);
        if (i + 1) as f64 / NEG_TABLE_SIZE as f64 > cumulative && word + 1 < counts.len() {
            word += 1;
            cumulative += (counts[word] as f64).powf(0.75) / total;
        }
    }
    table
}

fn decayed_lr(initial: f32, epoch: usize, epochs: usize) -> f32 {
    let progress = epoch as f32 / epochs.max(1) as f32;
    (initial * (1.0 - progress)).max(initial * 0.01)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-8.0, 8.0)).exp())
}

#[allow(clippy::too_many_arguments)]
fn train_pair(
    doc_vec: &mut [f32],
    out_vectors: &mut Array2<f32>,
    word: u32,
    negative: usize,
    neg_table: &[u32],
    lr: f32,
    grad: &mut [f32],
    rng: &mut StdRng,
) {
    grad.fill(0.0);
    for sample in 0..=negative {
        let (target, label) = if sample == 0 {
            (word, 1.0f32)
        } else {
            let cand = neg_table[rng.gen_range(0..neg_table.len())];
            if cand == word {
                continue;
            }
            (cand, 0.0f32)
        };
        let mut out_row = out_vectors.row_mut(target as usize);
        let out = out_row.as_slice_mut().expect("contiguous row");
        let dot: f32 = doc_vec.iter().zip(out.iter()).map(|(a, b)| a * b).sum();
        let g = (label - sigmoid(dot)) * lr;
        for j in 0..doc_vec.len() {
            grad[j] += g * out[j];
            out[j] += g * doc_vec[j];
        }
    }
    for (x, &g) in doc_vec.iter_mut().zip(grad.iter()) {
        *x += g;
    }
}

#[allow(clippy::too_many_arguments)]
fn infer_pair(
    doc_vec: &mut [f32],
    out_vectors: &Array2<f32>,
    word: u32,
    negative: usize,
    neg_table: &[u32],
    lr: f32,
    grad: &mut [f32],
    rng: &mut StdRng,
) {
    grad.fill(0.0);
    for sample in 0..=negative {
        let (target, label) = if sample == 0 {
            (word, 1.0f32)
        } else {
            let cand = neg_table[rng.gen_range(0..neg_table.len())];
            if cand == word {
                continue;
            }
            (cand, 0.0f32)
        };
        let out = out_vectors.row(target as usize);
        let dot: f32 = doc_vec.iter().zip(out.iter()).map(|(a, b)| a * b).sum();
        let g = (label - sigmoid(dot)) * lr;
        for (j, o) in out.iter().enumerate() {
            grad[j] += g * o;
        }
    }
    for (x, &g) in doc_vec.iter_mut().zip(grad.iter()) {
        *x += g;
    }
}
