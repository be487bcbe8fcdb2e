use crate::dictionary::{Dictionary, TermId};
use crate::index::{Hit, MatrixSimilarity};
use crate::models::{expect_vector, ModelKind, Query, SimilarityModel};
use anyhow::{anyhow, ensure, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ArtmConfig {
    pub n_topics: usize,
    pub iterations: usize,
    /// Sparsity regularizer on the term x topic factor: counts below tau are
    /// clamped to zero before renormalization.
    pub tau_phi: f32,
    /// Sparsity regularizer on the document-topic factor.
    pub tau_theta: f32,
    pub seed: u64,
}

impl ArtmConfig {
    pub fn new(n_topics: usize) -> Self {
        Self { n_topics, iterations: 30, tau_phi: 0.1, tau_theta: 0.1, seed: 42 }
    }
}

/// Regularized factorization of the document-term matrix into nonnegative
/// document-topic and term-topic factors (EM with additive sparsity
/// regularizers, clamp at zero, renormalize).
///
/// The factorization runs over its own term ordering; the learned term x
/// topic matrix is re-indexed to the global vocabulary by term string, never
/// by position. Queries project through that matrix with a single
/// multiplication — no iterative inference at query time.
#[derive(Serialize, Deserialize)]
pub struct ArtmModel {
    n_topics: usize,
    /// Internal term ordering the factors were fit under.
    terms: Vec<String>,
    /// internal terms x topics, p(w|t) columns.
    phi: Array2<f32>,
    /// global vocabulary x topics, rows aligned to global term ids.
    phi_global: Array2<f32>,
    /// docs x topics.
    doc_topics: Array2<f32>,
    #[serde(skip)]
    index: Option<MatrixSimilarity>,
}

impl ArtmModel {
    pub fn fit(
        corpus: &[Vec<(TermId, u32)>],
        dictionary: &Dictionary,
        config: &ArtmConfig,
    ) -> Result<ArtmModel> {
        ensure!(!corpus.is_empty(), "cannot fit on an empty corpus");
        ensure!(!dictionary.is_empty(), "cannot fit with an empty vocabulary");
        ensure!(config.n_topics >= 1, "n_topics must be at least 1");
        let t0 = Instant::now();

        let k = config.n_topics;

        // The internal vocabulary is sorted lexicographically; it deliberately
        // differs from the global first-seen id order.
        let mut terms: Vec<String> = dictionary.iter().map(|(_, t)| t.to_string()).collect();
        terms.sort();
        let internal: HashMap<&str, usize> =
            terms.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        let n_terms = terms.len();

        let docs: Vec<Vec<(usize, f32)>> = corpus
            .iter()
            .map(|bow| {
                bow.iter()
                    .filter_map(|&(gid, count)| {
                        let term = dictionary.token(gid)?;
                        Some((internal[term], count as f32))
                    })
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut phi = random_stochastic_columns(n_terms, k, &mut rng);
        let mut theta = random_stochastic_rows(docs.len(), k, &mut rng);

        for _iter in 0..config.iterations {
            let (n_wt, theta_rows) = docs
                .par_iter()
                .enumerate()
                .fold(
                    || (Array2::<f32>::zeros((n_terms, k)), Vec::new()),
                    |(mut n_wt, mut rows), (d, doc)| {
                        let mut n_td = vec![0.0f32; k];
                        for &(w, count) in doc {
                            let mut denom = 0.0;
                            for t in 0..k {
                                denom += phi[[w, t]] * theta[[d, t]];
                            }
                            if denom <= f32::MIN_POSITIVE {
                                continue;
                            }
                            for t in 0..k {
                                let delta = count * phi[[w, t]] * theta[[d, t]] / denom;
                                n_wt[[w, t]] += delta;
                                n_td[t] += delta;
                            }
                        }
                        // Regularized theta update for this document.
                        let mut sum = 0.0;
                        for x in n_td.iter_mut() {
                            *x = (*x - config.tau_theta).max(0.0);
                            sum += *x;
                        }
                        if sum > 0.0 {
                            for x in n_td.iter_mut() {
                                *x /= sum;
                            }
                        } else {
                            n_td.fill(1.0 / k as f32);
                        }
                        rows.push((d, n_td));
                        (n_wt, rows)
                    },
                )
                .reduce(
                    || (Array2::<f32>::zeros((n_terms, k)), Vec::new()),
                    |(a_wt, mut a_rows), (b_wt, b_rows)| {
                        a_rows.extend(b_rows);
                        (a_wt + b_wt, a_rows)
                    },
                );

            for (d, row) in theta_rows {
                for t in 0..k {
                    theta[[d, t]] = row[t];
                }
            }
            // Regularized phi update, one topic column at a time.
            for t in 0..k {
                let mut sum = 0.0;
                for w in 0..n_terms {
                    let x = (n_wt[[w, t]] - config.tau_phi).max(0.0);
                    phi[[w, t]] = x;
                    sum += x;
                }
                if sum > 0.0 {
                    for w in 0..n_terms {
                        phi[[w, t]] /= sum;
                    }
                } else {
                    for w in 0..n_terms {
                        phi[[w, t]] = 1.0 / n_terms as f32;
                    }
                }
            }
        }

        // Re-index phi rows to global term ids by string lookup.
        let mut phi_global = Array2::<f32>::zeros((dictionary.len(), k));
        for (gid, term) in dictionary.iter() {
            let row = phi.row(internal[term]);
            phi_global.row_mut(gid as usize).assign(&row);
        }

        let index = MatrixSimilarity::build(theta.clone(), None);
        tracing::info!(
            num_docs = docs.len(),
            num_terms = n_terms,
            n_topics = k,
            iterations = config.iterations,
            elapsed_s = t0.elapsed().as_secs_f64(),
            "fitted artm model"
        );

        Ok(ArtmModel { n_topics: k, terms, phi, phi_global, doc_topics: theta, index: Some(index) })
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// The learned term x topic matrix in global vocabulary order.
    pub fn phi_global(&self) -> &Array2<f32> {
        &self.phi_global
    }

    pub fn reattach(&mut self) {
        self.index = Some(MatrixSimilarity::build(self.doc_topics.clone(), None));
    }

    fn project(&self, vector: &[(TermId, f32)]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.n_topics];
        for &(term, weight) in vector {
            let term = term as usize;
            if term >= self.phi_global.nrows() {
                continue;
            }
            let row = self.phi_global.row(term);
            for (t, x) in out.iter_mut().enumerate() {
                *x += weight * row[t];
            }
        }
        out
    }

    fn index(&self) -> Result<&MatrixSimilarity> {
        self.index.as_ref().ok_or_else(|| anyhow!("similarity index not attached"))
    }
}

impl SimilarityModel for ArtmModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Artm
    }

    fn num_docs(&self) -> usize {
        self.doc_topics.nrows()
    }

    fn get_similar(&self, query: &Query, top_n: usize) -> Result<Vec<Hit>> {
        let vector = expect_vector(self.kind(), query)?;
        Ok(self.index()?.query(&self.project(vector), top_n))
    }

    fn get_similar_to_doc(&self, idx: usize, top_n: usize) -> Result<Vec<Hit>> {
        ensure!(idx < self.num_docs(), "document index {idx} out of range");
        Ok(self.index()?.query_doc(idx, top_n))
    }
}

fn random_stochastic_columns(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let mut m = Array2::<f32>::zeros((rows, cols));
    for x in m.iter_mut() {
        *x = rng.gen::<f32>() + 1e-3;
    }
    for t in 0..cols {
        let sum: f32 = m.column(t).sum();
        m.column_mut(t).mapv_inplace(|x| x / sum);
    }
    m
}

fn random_stochastic_rows(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let mut m = Array2::<f32>::zeros((rows, cols));
    for x in m.iter_mut() {
        *x = rng.gen::<f32>() + 1e-3;
    }
    for d in 0..rows {
        let sum: f32 = m.row(d).sum();
        m.row_mut(d).mapv_inplace(|x| x / sum);
    }
    m
}
