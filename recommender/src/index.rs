use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// One ranked result: corpus position and cosine score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc: usize,
    pub score: f32,
}

/// Exact cosine-similarity index over a model-space corpus matrix.
///
/// Row i is document i's vector — row order equals document index order, the
/// same order as the snapshot's doc-id list. Rows are L2-normalized at build
/// time so a query is a single matrix-vector product. Corpora in scope are
/// tens of thousands of rows, small enough that no approximate structure is
/// needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSimilarity {
    matrix: Array2<f32>,
    num_best: Option<usize>,
}

impl MatrixSimilarity {
    /// `num_best` caps every query's result length; `None` leaves the cap to
    /// the caller's `top_n` alone.
    pub fn build(mut rows: Array2<f32>, num_best: Option<usize>) -> MatrixSimilarity {
        for mut row in rows.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }
        MatrixSimilarity { matrix: rows, num_best }
    }

    pub fn num_docs(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.matrix.ncols()
    }

    /// The result-length bound configured at build time, if any.
    pub fn num_best(&self) -> Option<usize> {
        self.num_best
    }

    /// Ranks the whole corpus against `vector`, most similar first, truncated
    /// to `top_n` (and `num_best` if configured). A zero vector has no
    /// meaningful neighbors and yields an empty ranking.
    pub fn query(&self, vector: &[f32], top_n: usize) -> Vec<Hit> {
        self.ranked(vector, top_n, None)
    }

    /// Ranks the corpus against the stored vector of document `idx`,
    /// excluding `idx` itself from the result.
    pub fn query_doc(&self, idx: usize, top_n: usize) -> Vec<Hit> {
        if idx >= self.matrix.nrows() {
            return Vec::new();
        }
        let row = self.matrix.row(idx).to_vec();
        self.ranked(&row, top_n, Some(idx))
    }

    fn ranked(&self, vector: &[f32], top_n: usize, exclude: Option<usize>) -> Vec<Hit> {
        if vector.len() != self.matrix.ncols() {
            return Vec::new();
        }
        let mut q = Array1::from_vec(vector.to_vec());
        let norm = q.dot(&q).sqrt();
        if norm == 0.0 {
            return Vec::new();
        }
        q /= norm;

        let scores = self.matrix.dot(&q);
        let mut hits: Vec<Hit> = scores
            .iter()
            .enumerate()
            .filter(|&(i, _)| Some(i) != exclude)
            .map(|(i, &score)| Hit { doc: i, score })
            .collect();
        // Stable ranking: ties broken by lower document index.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc.cmp(&b.doc))
        });
        let cap = self.num_best.unwrap_or(usize::MAX).min(top_n);
        hits.truncate(cap);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn ranks_by_cosine() {
        let rows = array![[1.0, 0.0], [0.7, 0.7], [0.0, 1.0]];
        let index = MatrixSimilarity::build(rows, None);
        let hits = index.query(&[1.0, 0.1], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].doc, 0);
        assert_eq!(hits[1].doc, 1);
    }

    #[test]
    fn zero_query_is_empty() {
        let rows = array![[1.0, 0.0], [0.0, 1.0]];
        let index = MatrixSimilarity::build(rows, None);
        assert!(index.query(&[0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn query_doc_excludes_self() {
        let rows = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0]];
        let index = MatrixSimilarity::build(rows, None);
        let hits = index.query_doc(0, 3);
        assert!(hits.iter().all(|h| h.doc != 0));
        assert_eq!(hits[0].doc, 1);
    }

    #[test]
    fn num_best_bounds_results() {
        let rows = array![[1.0, 0.0], [0.9, 0.1], [0.8, 0.2]];
        let index = MatrixSimilarity::build(rows, Some(1));
        assert_eq!(index.num_best(), Some(1));
        assert_eq!(index.query(&[1.0, 0.0], 3).len(), 1);
    }
}
