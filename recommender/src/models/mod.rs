pub mod artm;
pub mod embedding;
pub mod lda;
pub mod lsi;

pub use artm::{ArtmConfig, ArtmModel};
pub use embedding::{EmbeddingConfig, EmbeddingModel};
pub use lda::{LdaConfig, LdaModel};
pub use lsi::{LsiConfig, LsiModel};

use crate::dictionary::TermId;
use crate::index::Hit;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The four interchangeable model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Dense-subspace projection of TF-IDF vectors (truncated SVD).
    Lsi,
    /// Probabilistic topic mixture fit by collapsed Gibbs sampling.
    Lda,
    /// Regularized matrix factorization with a term x topic matrix.
    Artm,
    /// Paragraph-vector embeddings trained on raw token sequences.
    Embedding,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Lsi => "lsi",
            ModelKind::Lda => "lda",
            ModelKind::Artm => "artm",
            ModelKind::Embedding => "d2v",
        }
    }
}

/// A query in the representation a model understands: TF-IDF weighted terms
/// for the vector-space variants, raw stemmed tokens for the embedding
/// variant. Passing the wrong flavor is a caller bug and errors out.
#[derive(Debug, Clone)]
pub enum Query {
    Vector(Vec<(TermId, f32)>),
    Tokens(Vec<String>),
}

/// Common contract over all model variants: fit once over a vectorized
/// corpus, then answer ranked nearest-neighbor queries.
///
/// `get_similar_to_doc` is the one place self-exclusion happens: the result
/// never contains `idx` itself. Free-text queries have no self to exclude. A
/// query that shares no terms with the vocabulary degrades to an empty
/// ranking — "no similar documents" is an answer, not an error.
pub trait SimilarityModel {
    fn kind(&self) -> ModelKind;

    /// Documents in the corpus this model was fitted on.
    fn num_docs(&self) -> usize;

    fn get_similar(&self, query: &Query, top_n: usize) -> Result<Vec<Hit>>;

    fn get_similar_to_doc(&self, idx: usize, top_n: usize) -> Result<Vec<Hit>>;
}

/// Serializable sum of the variants, so the trainer and server can persist
/// and load any of them uniformly. The similarity index inside each variant
/// is not part of the blob; `reattach` rebuilds it from the stored
/// corpus-space matrix after deserialization.
#[derive(Serialize, Deserialize)]
pub enum AnyModel {
    Lsi(LsiModel),
    Lda(LdaModel),
    Artm(ArtmModel),
    Embedding(EmbeddingModel),
}

impl AnyModel {
    pub fn reattach(&mut self) {
        match self {
            AnyModel::Lsi(m) => m.reattach(),
            AnyModel::Lda(m) => m.reattach(),
            AnyModel::Artm(m) => m.reattach(),
            AnyModel::Embedding(m) => m.reattach(),
        }
    }

    fn inner(&self) -> &dyn SimilarityModel {
        match self {
            AnyModel::Lsi(m) => m,
            AnyModel::Lda(m) => m,
            AnyModel::Artm(m) => m,
            AnyModel::Embedding(m) => m,
        }
    }
}

impl SimilarityModel for AnyModel {
    fn kind(&self) -> ModelKind {
        self.inner().kind()
    }

    fn num_docs(&self) -> usize {
        self.inner().num_docs()
    }

    fn get_similar(&self, query: &Query, top_n: usize) -> Result<Vec<Hit>> {
        self.inner().get_similar(query, top_n)
    }

    fn get_similar_to_doc(&self, idx: usize, top_n: usize) -> Result<Vec<Hit>> {
        self.inner().get_similar_to_doc(idx, top_n)
    }
}

pub(crate) fn expect_vector<'q>(kind: ModelKind, query: &'q Query) -> Result<&'q [(TermId, f32)]> {
    match query {
        Query::Vector(v) => Ok(v),
        Query::Tokens(_) => bail!("{} model takes a weighted term vector, not tokens", kind.as_str()),
    }
}

pub(crate) fn expect_tokens<'q>(kind: ModelKind, query: &'q Query) -> Result<&'q [String]> {
    match query {
        Query::Tokens(t) => Ok(t),
        Query::Vector(_) => bail!("{} model takes raw tokens, not a term vector", kind.as_str()),
    }
}
