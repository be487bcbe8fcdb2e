use crate::dictionary::TermId;
use crate::index::{Hit, MatrixSimilarity};
use crate::models::{expect_vector, ModelKind, Query, SimilarityModel};
use anyhow::{anyhow, ensure, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct LdaConfig {
    pub n_topics: usize,
    pub iterations: usize,
    /// Document-topic smoothing; `None` uses the common 50 / n_topics.
    pub alpha: Option<f32>,
    /// Topic-word smoothing.
    pub beta: f32,
    pub seed: u64,
}

impl LdaConfig {
    pub fn new(n_topics: usize) -> Self {
        Self { n_topics, iterations: 50, alpha: None, beta: 0.01, seed: 42 }
    }
}

/// Probabilistic topic mixture: each document becomes a distribution over
/// `n_topics` latent topics, fit by collapsed Gibbs sampling over raw
/// bag-of-words counts. Similarity is cosine between topic distributions.
/// The sampler is randomized; runs are repeatable only under a fixed seed.
#[derive(Serialize, Deserialize)]
pub struct LdaModel {
    n_topics: usize,
    alpha: f32,
    beta: f32,
    seed: u64,
    /// topics x terms occupancy counts frozen at the end of sampling; a
    /// query folds in against these.
    topic_word: Array2<f32>,
    topic_totals: Vec<f32>,
    /// docs x topics simplex rows.
    doc_topics: Array2<f32>,
    #[serde(skip)]
    index: Option<MatrixSimilarity>,
}

impl LdaModel {
    pub fn fit(
        corpus: &[Vec<(TermId, u32)>],
        num_terms: usize,
        config: &LdaConfig,
    ) -> Result<LdaModel> {
        ensure!(!corpus.is_empty(), "cannot fit on an empty corpus");
        ensure!(num_terms > 0, "cannot fit with an empty vocabulary");
        ensure!(config.n_topics >= 1, "n_topics must be at least 1");
        let t0 = Instant::now();

        let k = config.n_topics;
        let alpha = config.alpha.unwrap_or(50.0 / k as f32);
        let beta = config.beta;
        let mut rng = StdRng::seed_from_u64(config.seed);

        // Word instances per document, with their current topic assignment.
        let docs: Vec<Vec<u32>> = corpus
            .iter()
            .map(|bow| {
                let mut words = Vec::new();
                for &(term, count) in bow {
                    for _ in 0..count {
                        words.push(term);
                    }
                }
                words
            })
            .collect();

        let mut n_dk = Array2::<f32>::zeros((docs.len(), k));
        let mut n_kw = Array2::<f32>::zeros((k, num_terms));
        let mut n_k = vec![0.0f32; k];
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(docs.len());
        for (d, words) in docs.iter().enumerate() {
            let mut z = Vec::with_capacity(words.len());
            for &w in words {
                let topic = rng.gen_range(0..k);
                n_dk[[d, topic]] += 1.0;
                n_kw[[topic, w as usize]] += 1.0;
                n_k[topic] += 1.0;
                z.push(topic);
            }
            assignments.push(z);
        }

        let v_beta = num_terms as f32 * beta;
        let mut weights = vec![0.0f32; k];
        for _iter in 0..config.iterations {
            for (d, words) in docs.iter().enumerate() {
                for (i, &w) in words.iter().enumerate() {
                    let w = w as usize;
                    let old = assignments[d][i];
                    n_dk[[d, old]] -= 1.0;
                    n_kw[[old, w]] -= 1.0;
                    n_k[old] -= 1.0;

                    let mut total = 0.0;
                    for (t, weight) in weights.iter_mut().enumerate() {
                        *weight = (n_dk[[d, t]] + alpha) * (n_kw[[t, w]] + beta)
                            / (n_k[t] + v_beta);
                        total += *weight;
                    }
                    let new = sample_discrete(&weights, total, &mut rng);

                    n_dk[[d, new]] += 1.0;
                    n_kw[[new, w]] += 1.0;
                    n_k[new] += 1.0;
                    assignments[d][i] = new;
                }
            }
        }

        let mut doc_topics = Array2::<f32>::zeros((docs.len(), k));
        for (d, words) in docs.iter().enumerate() {
            let denom = words.len() as f32 + k as f32 * alpha;
            for t in 0..k {
                doc_topics[[d, t]] = (n_dk[[d, t]] + alpha) / denom;
            }
        }

        let index = MatrixSimilarity::build(doc_topics.clone(), None);
        tracing::info!(
            num_docs = docs.len(),
            num_terms,
            n_topics = k,
            iterations = config.iterations,
            elapsed_s = t0.elapsed().as_secs_f64(),
            "fitted lda model"
        );

        Ok(LdaModel {
            n_topics: k,
            alpha,
            beta,
            seed: config.seed,
            topic_word: n_kw,
            topic_totals: n_k,
            doc_topics,
            index: Some(index),
        })
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    pub fn reattach(&mut self) {
        self.index = Some(MatrixSimilarity::build(self.doc_topics.clone(), None));
    }

    /// Folds a query into the frozen topic-word counts: a short Gibbs run
    /// over the query's own instances, sampling against fixed corpus
    /// statistics. Seeded from the model so repeated queries agree.
    fn infer(&self, vector: &[(TermId, f32)]) -> Vec<f32> {
        let k = self.n_topics;
        let num_terms = self.topic_word.ncols();
        let v_beta = num_terms as f32 * self.beta;
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Weighted terms are quantized back to instance counts; TF-IDF
        // weights below one occurrence still contribute a single instance.
        let mut words = Vec::new();
        for &(term, weight) in vector {
            let term = term as usize;
            if term >= num_terms || weight <= 0.0 {
                continue;
            }
            let copies = (weight.round() as usize).max(1);
            for _ in 0..copies {
                words.push(term);
            }
        }
        if words.is_empty() {
            return vec![0.0; k];
        }

        let mut n_qk = vec![0.0f32; k];
        let mut z = Vec::with_capacity(words.len());
        for _ in &words {
            let topic = rng.gen_range(0..k);
            n_qk[topic] += 1.0;
            z.push(topic);
        }
        let mut weights = vec![0.0f32; k];
        for _iter in 0..20 {
            for (i, &w) in words.iter().enumerate() {
                let old = z[i];
                n_qk[old] -= 1.0;
                let mut total = 0.0;
                for (t, weight) in weights.iter_mut().enumerate() {
                    *weight = (n_qk[t] + self.alpha) * (self.topic_word[[t, w]] + self.beta)
                        / (self.topic_totals[t] + v_beta);
                    total += *weight;
                }
                let new = sample_discrete(&weights, total, &mut rng);
                n_qk[new] += 1.0;
                z[i] = new;
            }
        }

        let denom = words.len() as f32 + k as f32 * self.alpha;
        n_qk.iter().map(|&n| (n + self.alpha) / denom).collect()
    }

    fn index(&self) -> Result<&MatrixSimilarity> {
        self.index.as_ref().ok_or_else(|| anyhow!("similarity index not attached"))
    }
}

impl SimilarityModel for LdaModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Lda
    }

    fn num_docs(&self) -> usize {
        self.doc_topics.nrows()
    }

    fn get_similar(&self, query: &Query, top_n: usize) -> Result<Vec<Hit>> {
        let vector = expect_vector(self.kind(), query)?;
        if vector.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.index()?.query(&self.infer(vector), top_n))
    }

    fn get_similar_to_doc(&self, idx: usize, top_n: usize) -> Result<Vec<Hit>> {
        ensure!(idx < self.num_docs(), "document index {idx} out of range");
        Ok(self.index()?.query_doc(idx, top_n))
    }
}

fn sample_discrete(weights: &[f32], total: f32, rng: &mut StdRng) -> usize {
    let mut u = rng.gen::<f32>() * total;
    for (i, &w) in weights.iter().enumerate() {
        u -= w;
        if u <= 0.0 {
            return i;
        }
    }
    weights.len() - 1
}
