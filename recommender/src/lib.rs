pub mod cache;
pub mod dictionary;
pub mod evaluate;
pub mod index;
pub mod models;
pub mod normalize;
pub mod persist;
pub mod ratings;
pub mod recommend;
pub mod tfidf;
pub mod tokenizer;

pub use cache::{Corpus, TextCache};
pub use dictionary::Dictionary;
pub use evaluate::{Evaluator, Rating, Scores};
pub use index::{Hit, MatrixSimilarity};
pub use models::{AnyModel, ModelKind, Query, SimilarityModel};
pub use normalize::{NormalizePolicy, Normalizer};
pub use ratings::RatingStore;
pub use recommend::Recommender;
pub use tfidf::TfIdf;
pub use tokenizer::Tokenizer;
