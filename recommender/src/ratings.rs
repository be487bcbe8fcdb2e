use crate::evaluate::Rating;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct StoredRating {
    value: i32,
    reporter: String,
}

/// Append-only user-feedback store. At most one rating per
/// (document, recommendation) pair: the pair is the key, and a second
/// `record` for the same pair is refused rather than overwritten.
pub struct RatingStore {
    db: sled::Db,
}

impl RatingStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RatingStore> {
        let db = sled::open(path.as_ref())
            .with_context(|| format!("opening rating store {}", path.as_ref().display()))?;
        Ok(RatingStore { db })
    }

    /// Records one rating. Returns false when the pair was already rated.
    pub fn record(&self, doc: usize, recommendation: usize, value: i32, reporter: &str) -> Result<bool> {
        let key = Self::key(doc, recommendation);
        let stored = StoredRating { value, reporter: reporter.to_string() };
        let bytes = bincode::serialize(&stored)?;
        let inserted = self
            .db
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?
            .is_ok();
        if inserted {
            self.db.flush()?;
        }
        Ok(inserted)
    }

    pub fn all(&self) -> Result<Vec<Rating>> {
        let mut ratings = Vec::new();
        for entry in self.db.iter() {
            let (key, value) = entry?;
            let key = std::str::from_utf8(&key).context("rating key is not utf-8")?;
            let (doc, recommendation) = key
                .split_once(':')
                .context("rating key is not doc:recommendation")?;
            let stored: StoredRating = bincode::deserialize(&value)?;
            ratings.push(Rating {
                doc: doc.parse()?,
                recommendation: recommendation.parse()?,
                value: stored.value,
                reporter: stored.reporter,
            });
        }
        Ok(ratings)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn key(doc: usize, recommendation: usize) -> Vec<u8> {
        format!("{doc:010}:{recommendation:010}").into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_pair_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = RatingStore::open(dir.path().join("ratings")).unwrap();
        assert!(store.record(1, 2, 5, "10.0.0.1").unwrap());
        assert!(!store.record(1, 2, 3, "10.0.0.2").unwrap());
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, 5);
    }
}
