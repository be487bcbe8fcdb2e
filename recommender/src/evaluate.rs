use crate::models::SimilarityModel;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One user judgment: while reading `doc`, the recommendation `recommendation`
/// was rated `value` (positive = relevant, zero = explicitly not relevant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub doc: usize,
    pub recommendation: usize,
    pub value: i32,
    pub reporter: String,
}

/// Ranking-quality scores over the judged corpus. The `known` variants score
/// only candidates with recorded judgments, isolating ranking quality among
/// items with evidence from the effect of unjudged items.
#[derive(Debug, Clone, Serialize)]
pub struct Scores {
    pub map: f64,
    pub map_known: f64,
    pub mean_p_at_k: f64,
    pub mean_p_at_k_known: f64,
    pub mean_dcg: f64,
    pub mean_dcg_known: f64,
}

/// Offline evaluation of a fitted model against held-out user ratings.
///
/// Relevance is treated as symmetric: a judgment (A, B, s) also registers
/// (B, A, s) unless that direction was judged explicitly. Documents with
/// fewer than `cut_off` judged candidates are too sparse to score reliably
/// and are dropped.
pub struct Evaluator {
    test_data: BTreeMap<usize, HashMap<usize, i32>>,
    top_n: usize,
}

impl Evaluator {
    pub fn new(ratings: &[Rating]) -> Evaluator {
        Self::with_params(ratings, 20, 20)
    }

    pub fn with_params(ratings: &[Rating], cut_off: usize, top_n: usize) -> Evaluator {
        let mut test_data: BTreeMap<usize, HashMap<usize, i32>> = BTreeMap::new();
        for r in ratings {
            test_data.entry(r.doc).or_default().insert(r.recommendation, r.value);
            test_data
                .entry(r.recommendation)
                .or_default()
                .entry(r.doc)
                .or_insert(r.value);
        }
        test_data.retain(|_, judged| judged.len() >= cut_off);
        Evaluator { test_data, top_n }
    }

    pub fn num_judged_docs(&self) -> usize {
        self.test_data.len()
    }

    /// Scores the model on every judged document. A document whose metric is
    /// undefined (no relevant items reachable) is excluded from that metric's
    /// mean rather than counted as zero.
    pub fn evaluate(&self, model: &dyn SimilarityModel) -> Result<Scores> {
        let mut ap = Vec::new();
        let mut ap_known = Vec::new();
        let mut p_at_k = Vec::new();
        let mut p_at_k_known = Vec::new();
        let mut dcg_all = Vec::new();
        let mut dcg_known = Vec::new();

        for (&doc, judged) in &self.test_data {
            if doc >= model.num_docs() {
                continue;
            }
            let recs: Vec<usize> = model
                .get_similar_to_doc(doc, self.top_n)?
                .into_iter()
                .map(|h| h.doc)
                .collect();
            ap.push(average_precision(&recs, judged, false));
            ap_known.push(average_precision(&recs, judged, true));
            p_at_k.push(precision(&recs, judged, false));
            p_at_k_known.push(precision(&recs, judged, true));
            dcg_all.push(dcg(&recs, judged, false));
            dcg_known.push(dcg(&recs, judged, true));
        }

        Ok(Scores {
            map: nan_mean(&ap),
            map_known: nan_mean(&ap_known),
            mean_p_at_k: nan_mean(&p_at_k),
            mean_p_at_k_known: nan_mean(&p_at_k_known),
            mean_dcg: nan_mean(&dcg_all),
            mean_dcg_known: nan_mean(&dcg_known),
        })
    }
}

fn score_of(judged: &HashMap<usize, i32>, rec: usize) -> i32 {
    judged.get(&rec).copied().unwrap_or(0)
}

/// Fraction of recommendations with a positive judgment. Unjudged items count
/// as non-relevant unless `known_only` removes them first.
pub fn precision(recs: &[usize], judged: &HashMap<usize, i32>, known_only: bool) -> f64 {
    let kept: Vec<usize> = if known_only {
        recs.iter().copied().filter(|&r| score_of(judged, r) != 0).collect()
    } else {
        recs.to_vec()
    };
    if kept.is_empty() {
        return f64::NAN;
    }
    let relevant = kept.iter().filter(|&&r| score_of(judged, r) > 0).count();
    relevant as f64 / kept.len() as f64
}

/// Standard average precision: precision@k averaged over the positions k
/// where the k-th item is relevant.
pub fn average_precision(recs: &[usize], judged: &HashMap<usize, i32>, known_only: bool) -> f64 {
    let k_values: Vec<usize> = (1..recs.len())
        .filter(|&k| !known_only || score_of(judged, recs[k - 1]) != 0)
        .collect();
    if k_values.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = k_values
        .iter()
        .map(|&k| {
            let rel = score_of(judged, recs[k - 1]) > 0;
            if rel {
                precision(&recs[..k], judged, false)
            } else {
                0.0
            }
        })
        .sum();
    sum / k_values.len() as f64
}

/// Discounted cumulative gain with a binary relevance indicator.
pub fn dcg(recs: &[usize], judged: &HashMap<usize, i32>, known_only: bool) -> f64 {
    let kept: Vec<usize> = if known_only {
        recs.iter().copied().filter(|&r| score_of(judged, r) != 0).collect()
    } else {
        recs.to_vec()
    };
    kept.iter()
        .enumerate()
        .map(|(i, &r)| {
            let rel = if score_of(judged, r) > 0 { 1.0 } else { 0.0 };
            rel / ((i + 2) as f64).log2()
        })
        .sum()
}

fn nan_mean(values: &[f64]) -> f64 {
    let kept: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if kept.is_empty() {
        return f64::NAN;
    }
    kept.iter().sum::<f64>() / kept.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judged(pairs: &[(usize, i32)]) -> HashMap<usize, i32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn precision_counts_positive_scores() {
        let j = judged(&[(2, 5), (3, 0), (4, 2)]);
        assert_eq!(precision(&[2, 3, 4], &j, false), 2.0 / 3.0);
        // known-only drops the unjudged id 9 before scoring
        assert_eq!(precision(&[2, 9, 4], &j, true), 1.0);
    }

    #[test]
    fn dcg_discounts_by_position() {
        let j = judged(&[(1, 1), (2, 1)]);
        let d = dcg(&[1, 2], &j, false);
        assert!((d - (1.0 + 1.0 / 3f64.log2())).abs() < 1e-9);
    }

    #[test]
    fn nan_values_are_excluded_from_means() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 0.5]), 0.75);
        assert!(nan_mean(&[f64::NAN]).is_nan());
    }
}
