use crate::normalize::{has_operative_marker, is_closed_session, Normalizer};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk cache of normalized ruling text, one file per document at
/// `<root>/<shard>/<doc_id>.txt` where the shard is the lowercased first two
/// characters of the id. Normalization runs once per document; afterwards the
/// text is immutable (drop the file to invalidate).
///
/// Population is a single offline pass; at serving time the cache is
/// read-only. Concurrent writers to the same entry are not supported.
pub struct TextCache {
    root: PathBuf,
    normalizer: Normalizer,
}

impl TextCache {
    pub fn new<P: AsRef<Path>>(root: P, normalizer: Normalizer) -> Self {
        Self { root: root.as_ref().to_path_buf(), normalizer }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, doc_id: &str) -> PathBuf {
        let shard: String = doc_id.chars().take(2).collect::<String>().to_lowercase();
        self.root.join(shard).join(format!("{doc_id}.txt"))
    }

    /// Cached text for a document, `None` if never computed (or excluded).
    pub fn get(&self, doc_id: &str) -> Result<Option<String>> {
        let path = self.path_for(doc_id);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading cached text {}", path.display()))?;
        Ok(Some(text))
    }

    /// Returns the cached normalized text, running `extract` (the raw HTML/PDF
    /// text extraction) and the normalizer on a miss.
    ///
    /// `None` means the document is excluded from the corpus: extraction
    /// failed, the text has no operative-part heading, or the ruling was
    /// issued in closed session. Exclusions are logged and never abort a
    /// batch; nothing is written for them, so a later pass re-screens.
    pub fn get_or_compute<F>(&self, doc_id: &str, extract: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(text) = self.get(doc_id)? {
            return Ok(Some(text));
        }

        let raw = match extract() {
            Ok(raw) => raw,
            Err(err) => {
                tracing::info!(doc_id, error = %err, "extraction failed, document excluded");
                return Ok(None);
            }
        };
        if !has_operative_marker(&raw) {
            tracing::info!(doc_id, "no operative part, document excluded");
            return Ok(None);
        }
        if is_closed_session(&raw) {
            tracing::info!(doc_id, "closed session, document excluded");
            return Ok(None);
        }

        let text = self.normalizer.normalize(&raw);
        let path = self.path_for(doc_id);
        let dir = path.parent().expect("sharded path has a parent");
        fs::create_dir_all(dir).with_context(|| format!("creating shard dir {}", dir.display()))?;
        fs::write(&path, &text)
            .with_context(|| format!("writing cached text {}", path.display()))?;
        Ok(Some(text))
    }

    /// Streams cache entries in sorted shard/file order, so repeated
    /// enumerations see the same positional order. Texts are read lazily;
    /// `take(n)` bounds the corpus to a prefix without touching the rest.
    pub fn iter(&self) -> Result<CacheIter> {
        let mut paths = Vec::new();
        if self.root.is_dir() {
            let mut shards: Vec<PathBuf> = fs::read_dir(&self.root)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            shards.sort();
            for shard in shards {
                let mut files: Vec<PathBuf> = fs::read_dir(&shard)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
                    .collect();
                files.sort();
                paths.extend(files);
            }
        }
        Ok(CacheIter { paths: paths.into_iter() })
    }
}

pub struct CacheIter {
    paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for CacheIter {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(
            fs::read_to_string(&path)
                .with_context(|| format!("reading cached text {}", path.display()))
                .map(|text| (doc_id, text)),
        )
    }
}

/// Fully materialized corpus. Position in `doc_ids` is the document's index
/// everywhere downstream: the dictionary, the vectorized corpus, every fitted
/// model and the similarity index all use this exact order.
pub struct Corpus {
    pub doc_ids: Vec<String>,
    pub texts: Vec<String>,
}

impl Corpus {
    /// Loads up to `limit` documents from the cache in enumeration order.
    pub fn load(cache: &TextCache, limit: Option<usize>) -> Result<Corpus> {
        let mut doc_ids = Vec::new();
        let mut texts = Vec::new();
        let limit = limit.unwrap_or(usize::MAX);
        for entry in cache.iter()?.take(limit) {
            let (doc_id, text) = entry?;
            doc_ids.push(doc_id);
            texts.push(text);
        }
        Ok(Corpus { doc_ids, texts })
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.texts.get(idx).map(|s| s.as_str())
    }
}
