use crate::dictionary::TermId;
use crate::index::{Hit, MatrixSimilarity};
use crate::models::{expect_vector, ModelKind, Query, SimilarityModel};
use anyhow::{anyhow, ensure, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct LsiConfig {
    pub n_topics: usize,
    /// Power iterations sharpen the captured subspace when singular values
    /// decay slowly, at one corpus pass each.
    pub power_iters: usize,
    /// Extra random probe columns beyond `n_topics`.
    pub oversample: usize,
    pub seed: u64,
}

impl LsiConfig {
    pub fn new(n_topics: usize) -> Self {
        Self { n_topics, power_iters: 2, oversample: 10, seed: 42 }
    }
}

/// Dense-subspace model: projects TF-IDF vectors onto the rank-`n_topics`
/// orthogonal subspace retaining the most corpus variance (truncated SVD via
/// a randomized range finder), then compares documents by cosine in the
/// reduced space. Deterministic for a fixed corpus and seed.
#[derive(Serialize, Deserialize)]
pub struct LsiModel {
    n_topics: usize,
    /// terms x topics; a query projects through this matrix.
    projection: Array2<f32>,
    /// docs x topics, row order = document index order.
    corpus_topics: Array2<f32>,
    #[serde(skip)]
    index: Option<MatrixSimilarity>,
}

impl LsiModel {
    pub fn fit(
        corpus: &[Vec<(TermId, f32)>],
        num_terms: usize,
        config: &LsiConfig,
    ) -> Result<LsiModel> {
        ensure!(!corpus.is_empty(), "cannot fit on an empty corpus");
        ensure!(num_terms > 0, "cannot fit with an empty vocabulary");
        ensure!(config.n_topics >= 1, "n_topics must be at least 1");
        let t0 = Instant::now();

        let k = config.n_topics;
        let rank = (k + config.oversample).min(num_terms).min(corpus.len());
        let mut rng = StdRng::seed_from_u64(config.seed);

        // Randomized range finder: probe the row space with a Gaussian block,
        // then tighten it with a few power iterations.
        let omega = gaussian_matrix(num_terms, rank, &mut rng);
        let mut y = mul_corpus(corpus, &omega);
        orthonormalize_columns(&mut y);
        for _ in 0..config.power_iters {
            let mut z = mul_corpus_t(corpus, &y, num_terms);
            orthonormalize_columns(&mut z);
            y = mul_corpus(corpus, &z);
            orthonormalize_columns(&mut y);
        }

        // B = Y^T A is small (rank x terms); its Gram matrix gives the
        // singular structure of A restricted to the captured subspace.
        let b = mul_corpus_t(corpus, &y, num_terms).reversed_axes();
        let gram = b.dot(&b.t());
        let (eigvals, eigvecs) = jacobi_eigh(gram);

        let mut order: Vec<usize> = (0..eigvals.len()).collect();
        order.sort_by(|&i, &j| {
            eigvals[j].partial_cmp(&eigvals[i]).unwrap_or(std::cmp::Ordering::Equal)
        });

        let kept = k.min(order.len());
        let mut w = Array2::<f32>::zeros((rank, kept));
        for (col, &src) in order.iter().take(kept).enumerate() {
            w.column_mut(col).assign(&eigvecs.column(src));
        }
        // Right singular vectors, scaled to unit length: V = B^T W / sigma.
        let mut projection = b.t().dot(&w);
        for (col, &src) in order.iter().take(kept).enumerate() {
            let sigma = eigvals[src].max(0.0).sqrt();
            if sigma > 1e-6 {
                projection.column_mut(col).mapv_inplace(|x| x / sigma);
            } else {
                projection.column_mut(col).fill(0.0);
            }
        }

        let corpus_topics = mul_corpus(corpus, &projection);
        let index = MatrixSimilarity::build(corpus_topics.clone(), None);
        tracing::info!(
            num_docs = corpus.len(),
            num_terms,
            n_topics = kept,
            elapsed_s = t0.elapsed().as_secs_f64(),
            "fitted lsi model"
        );

        Ok(LsiModel { n_topics: kept, projection, corpus_topics, index: Some(index) })
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// Rebuilds the similarity index after deserialization.
    pub fn reattach(&mut self) {
        self.index = Some(MatrixSimilarity::build(self.corpus_topics.clone(), None));
    }

    fn project(&self, vector: &[(TermId, f32)]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.n_topics];
        for &(term, weight) in vector {
            let term = term as usize;
            if term >= self.projection.nrows() {
                continue;
            }
            let row = self.projection.row(term);
            for (j, x) in out.iter_mut().enumerate() {
                *x += weight * row[j];
            }
        }
        out
    }

    fn index(&self) -> Result<&MatrixSimilarity> {
        self.index.as_ref().ok_or_else(|| anyhow!("similarity index not attached"))
    }
}

impl SimilarityModel for LsiModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Lsi
    }

    fn num_docs(&self) -> usize {
        self.corpus_topics.nrows()
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

/// A * M for a sparse row corpus and a dense terms x r matrix.
fn mul_corpus(corpus: &[Vec<(TermId, f32)>], m: &Array2<f32>) -> Array2<f32> {
    let r = m.ncols();
    let rows: Vec<Vec<f32>> = corpus
        .par_iter()
        .map(|doc| {
            let mut row = vec![0.0f32; r];
            for &(term, weight) in doc {
                let term = term as usize;
                if term >= m.nrows() {
                    continue;
                }
                let mrow = m.row(term);
                for (j, x) in row.iter_mut().enumerate() {
                    *x += weight * mrow[j];
                }
            }
            row
        })
        .collect();
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((corpus.len(), r), flat).expect("row-major corpus product")
}

/// A^T * Y for a sparse row corpus and a dense docs x r matrix.
fn mul_corpus_t(corpus: &[Vec<(TermId, f32)>], y: &Array2<f32>, num_terms: usize) -> Array2<f32> {
    let r = y.ncols();
    let mut out = Array2::<f32>::zeros((num_terms, r));
    for (d, doc) in corpus.iter().enumerate() {
        let yrow = y.row(d);
        for &(term, weight) in doc {
            let term = term as usize;
            if term >= num_terms {
                continue;
            }
            let mut orow = out.row_mut(term);
            for (j, x) in orow.iter_mut().enumerate() {
                *x += weight * yrow[j];
            }
        }
    }
    out
}

fn gaussian_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let mut m = Array2::<f32>::zeros((rows, cols));
    for x in m.iter_mut() {
        // Box-Muller from two uniforms.
        let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = rng.gen();
        *x = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    }
    m
}

/// Modified Gram-Schmidt; numerically rank-deficient columns become zero.
fn orthonormalize_columns(a: &mut Array2<f32>) {
    let cols = a.ncols();
    for j in 0..cols {
        for i in 0..j {
            let basis = a.column(i).to_owned();
            let proj = basis.dot(&a.column(j));
            let mut col = a.column_mut(j);
            col.zip_mut_with(&basis, |x, &b| *x -= proj * b);
        }
        let norm = a.column(j).dot(&a.column(j)).sqrt();
        let mut col = a.column_mut(j);
        if norm > 1e-9 {
            col.mapv_inplace(|x| x / norm);
        } else {
            col.fill(0.0);
        }
    }
}

/// Cyclic Jacobi eigendecomposition of a small symmetric matrix. Returns
/// (eigenvalues, eigenvector columns), unsorted.
fn jacobi_eigh(mut a: Array2<f32>) -> (Vec<f32>, Array2<f32>) {
    let n = a.nrows();
    let mut v = Array2::<f32>::eye(n);
    for _sweep in 0..50 {
        let mut off = 0.0f32;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off < 1e-12 {
            break;
        }
        for p in 0..n.saturating_sub(1) {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-12 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for i in 0..n {
                    let aip = a[[i, p]];
                    let aiq = a[[i, q]];
                    a[[i, p]] = c * aip - s * aiq;
                    a[[i, q]] = s * aip + c * aiq;
                }
                for i in 0..n {
                    let api = a[[p, i]];
                    let aqi = a[[q, i]];
                    a[[p, i]] = c * api - s * aqi;
                    a[[q, i]] = s * api + c * aqi;
                }
                for i in 0..n {
                    let vip = v[[i, p]];
                    let viq = v[[i, q]];
                    v[[i, p]] = c * vip - s * viq;
                    v[[i, q]] = s * vip + c * viq;
                }
            }
        }
    }
    let eigvals = (0..n).map(|i| a[[i, i]]).collect();
    (eigvals, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn jacobi_recovers_diagonal() {
        let m = array![[2.0, 0.0], [0.0, 3.0]];
        let (vals, _) = jacobi_eigh(m);
        let mut vals = vals;
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((vals[0] - 2.0).abs() < 1e-5);
        assert!((vals[1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn orthonormalization_yields_unit_columns() {
        let mut m = array![[3.0, 1.0], [0.0, 2.0], [4.0, 0.5]];
        orthonormalize_columns(&mut m);
        for j in 0..2 {
            let norm = m.column(j).dot(&m.column(j));
            assert!((norm - 1.0).abs() < 1e-4);
        }
        assert!(m.column(0).dot(&m.column(1)).abs() < 1e-4);
    }
}
