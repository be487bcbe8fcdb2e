use crate::dictionary::{Dictionary, TermId};
use crate::models::{AnyModel, ModelKind, SimilarityModel};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

/// Path layout of a corpus snapshot directory and its model blobs.
pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn doc_ids(&self) -> PathBuf {
        self.root.join("doc_ids.bin")
    }

    fn dictionary(&self) -> PathBuf {
        self.root.join("dictionary.bin")
    }

    fn corpus(&self) -> PathBuf {
        self.root.join("corpus.bin")
    }

    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn model(&self, kind: ModelKind) -> PathBuf {
        self.root.join(format!("{}.model", kind.as_str()))
    }
}

/// The persisted (document-id list, vocabulary, vectorized corpus) triple.
/// The doc-id list's order defines the positional index contract: position i
/// here is document i in every fitted model and in the similarity index.
pub struct Snapshot {
    pub doc_ids: Vec<String>,
    pub dictionary: Dictionary,
    pub corpus: Vec<Vec<(TermId, u32)>>,
}

pub fn save_snapshot(paths: &SnapshotPaths, snapshot: &Snapshot, created_at: &str) -> Result<()> {
    ensure!(
        snapshot.doc_ids.len() == snapshot.corpus.len(),
        "doc-id list and vectorized corpus differ in length ({} vs {})",
        snapshot.doc_ids.len(),
        snapshot.corpus.len()
    );
    create_dir_all(&paths.root)?;
    write_bin(&paths.doc_ids(), &snapshot.doc_ids)?;
    write_bin(&paths.dictionary(), &snapshot.dictionary)?;
    write_bin(&paths.corpus(), &snapshot.corpus)?;
    let meta = MetaFile {
        num_docs: snapshot.doc_ids.len() as u32,
        created_at: created_at.to_string(),
        version: 1,
    };
    let f = File::create(paths.meta())?;
    serde_json::to_writer_pretty(BufWriter::new(f), &meta)?;
    Ok(())
}

/// Loads a snapshot, rejecting one whose parts disagree on document count.
pub fn load_snapshot(paths: &SnapshotPaths) -> Result<Snapshot> {
    let doc_ids: Vec<String> = read_bin(&paths.doc_ids())?;
    let dictionary: Dictionary = read_bin(&paths.dictionary())?;
    let corpus: Vec<Vec<(TermId, u32)>> = read_bin(&paths.corpus())?;
    let meta: MetaFile = {
        let f = File::open(paths.meta())
            .with_context(|| format!("opening {}", paths.meta().display()))?;
        serde_json::from_reader(BufReader::new(f))?
    };
    ensure!(
        doc_ids.len() == corpus.len() && doc_ids.len() == meta.num_docs as usize,
        "snapshot parts disagree on document count ({} ids, {} vectors, meta {})",
        doc_ids.len(),
        corpus.len(),
        meta.num_docs
    );
    Ok(Snapshot { doc_ids, dictionary, corpus })
}

/// Writes a fitted model as a parameters blob. The similarity index is not
/// part of the blob; loading reattaches it.
pub fn save_model(paths: &SnapshotPaths, model: &AnyModel) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(&paths.model(model.kind()), model)
}

/// Loads a model blob and reattaches its similarity index. Idempotent and
/// side-effect-free beyond allocation; safe to do once at startup and share
/// read-only afterwards.
pub fn load_model(paths: &SnapshotPaths, kind: ModelKind) -> Result<AnyModel> {
    let mut model: AnyModel = read_bin(&paths.model(kind))?;
    ensure!(
        model.kind() == kind,
        "model blob {} holds a {} model",
        paths.model(kind).display(),
        model.kind().as_str()
    );
    model.reattach();
    Ok(model)
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    bincode::serialize_into(BufWriter::new(f), value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = bincode::deserialize_from(BufReader::new(f))
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(value)
}
