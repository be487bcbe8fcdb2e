use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use recommender::models::{
    ArtmConfig, ArtmModel, EmbeddingConfig, EmbeddingModel, LdaConfig, LdaModel, LsiConfig,
    LsiModel,
};
use recommender::persist::{
    load_model, load_snapshot, save_model, save_snapshot, Snapshot, SnapshotPaths,
};
use recommender::{
    AnyModel, Corpus, Dictionary, Evaluator, ModelKind, Normalizer, RatingStore, TextCache, TfIdf,
    Tokenizer,
};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Prepare the corpus snapshot, fit similarity models, evaluate them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the (doc ids, dictionary, vectorized corpus) snapshot from the
    /// normalized-text cache
    Prepare {
        /// Normalized-text cache directory
        #[arg(long)]
        cache: String,
        /// Output snapshot directory
        #[arg(long)]
        output: String,
        /// Bound the corpus to the first N cached documents
        #[arg(long)]
        n_samples: Option<usize>,
        /// Drop terms appearing in fewer than this many documents
        #[arg(long, default_value_t = 10)]
        min_df: u32,
        /// Drop terms appearing in more than this fraction of documents
        #[arg(long, default_value_t = 0.66)]
        max_df: f32,
    },
    /// Fit the selected model variants and write one blob per variant
    Train {
        /// Snapshot directory produced by `prepare`
        #[arg(long)]
        snapshot: String,
        /// Where to write model blobs (defaults to the snapshot directory)
        #[arg(long)]
        output: Option<String>,
        /// Normalized-text cache, required for --d2v (it trains on tokens,
        /// not on the vectorized corpus)
        #[arg(long)]
        cache: Option<String>,
        #[arg(long, default_value_t = false)]
        lsi: bool,
        #[arg(long, default_value_t = false)]
        lda: bool,
        #[arg(long, default_value_t = false)]
        artm: bool,
        #[arg(long, default_value_t = false)]
        d2v: bool,
        #[arg(long, default_value_t = 800)]
        n_topics: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Score fitted models against recorded user ratings
    Evaluate {
        /// Directory holding the model blobs
        #[arg(long)]
        snapshot: String,
        /// Rating store path
        #[arg(long)]
        ratings: String,
        #[arg(long, default_value_t = false)]
        lsi: bool,
        #[arg(long, default_value_t = false)]
        lda: bool,
        #[arg(long, default_value_t = false)]
        artm: bool,
        #[arg(long, default_value_t = false)]
        d2v: bool,
        /// Skip documents with fewer judged candidates than this
        #[arg(long, default_value_t = 20)]
        cut_off: usize,
        /// Recommendations requested per judged document
        #[arg(long, default_value_t = 20)]
        top_n: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare { cache, output, n_samples, min_df, max_df } => {
            prepare(&cache, &output, n_samples, min_df, max_df)
        }
        Commands::Train { snapshot, output, cache, lsi, lda, artm, d2v, n_topics, seed } => {
            train(&snapshot, output.as_deref(), cache.as_deref(), lsi, lda, artm, d2v, n_topics, seed)
        }
        Commands::Evaluate { snapshot, ratings, lsi, lda, artm, d2v, cut_off, top_n } => {
            evaluate(&snapshot, &ratings, lsi, lda, artm, d2v, cut_off, top_n)
        }
    }
}

fn prepare(
    cache_dir: &str,
    output: &str,
    n_samples: Option<usize>,
    min_df: u32,
    max_df: f32,
) -> Result<()> {
    let cache = TextCache::new(cache_dir, Normalizer::default());

    let t0 = Instant::now();
    let corpus = Corpus::load(&cache, n_samples)?;
    if corpus.is_empty() {
        bail!("no cached documents under {cache_dir}");
    }
    tracing::info!(
        num_docs = corpus.len(),
        elapsed_s = t0.elapsed().as_secs_f64(),
        "loaded corpus"
    );

    let t0 = Instant::now();
    let tokenizer = Tokenizer::new();
    let tokenized: Vec<Vec<String>> =
        corpus.texts.iter().map(|text| tokenizer.tokenize(text)).collect();
    let mut dictionary = Dictionary::build(&tokenized);
    dictionary.filter_extremes(min_df, max_df);
    let bows = tokenized.iter().map(|tokens| dictionary.doc2bow(tokens)).collect();
    tracing::info!(
        num_terms = dictionary.len(),
        elapsed_s = t0.elapsed().as_secs_f64(),
        "vectorized corpus"
    );

    let snapshot = Snapshot { doc_ids: corpus.doc_ids, dictionary, corpus: bows };
    let paths = SnapshotPaths::new(output);
    save_snapshot(&paths, &snapshot, &now_rfc3339())?;
    tracing::info!(output, "snapshot written");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn train(
    snapshot_dir: &str,
    output: Option<&str>,
    cache_dir: Option<&str>,
    lsi: bool,
    lda: bool,
    artm: bool,
    d2v: bool,
    n_topics: usize,
    seed: u64,
) -> Result<()> {
    if !(lsi || lda || artm || d2v) {
        bail!("select at least one of --lsi --lda --artm --d2v");
    }

    let paths = SnapshotPaths::new(snapshot_dir);
    let snapshot = load_snapshot(&paths)?;
    let out_paths = SnapshotPaths::new(output.unwrap_or(snapshot_dir));
    tracing::info!(
        num_docs = snapshot.doc_ids.len(),
        num_terms = snapshot.dictionary.len(),
        n_topics,
        "snapshot loaded"
    );

    if lsi {
        let tfidf = TfIdf::new(&snapshot.dictionary);
        let corpus_tfidf: Vec<_> =
            snapshot.corpus.iter().map(|bow| tfidf.transform(bow)).collect();
        let config = LsiConfig { seed, ..LsiConfig::new(n_topics) };
        let model = LsiModel::fit(&corpus_tfidf, snapshot.dictionary.len(), &config)?;
        save_model(&out_paths, &AnyModel::Lsi(model))?;
    }
    if lda {
        let config = LdaConfig { seed, ..LdaConfig::new(n_topics) };
        let model = LdaModel::fit(&snapshot.corpus, snapshot.dictionary.len(), &config)?;
        save_model(&out_paths, &AnyModel::Lda(model))?;
    }
    if artm {
        let config = ArtmConfig { seed, ..ArtmConfig::new(n_topics) };
        let model = ArtmModel::fit(&snapshot.corpus, &snapshot.dictionary, &config)?;
        save_model(&out_paths, &AnyModel::Artm(model))?;
    }
    if d2v {
        let cache_dir = cache_dir.context("--d2v needs --cache to re-read document tokens")?;
        let cache = TextCache::new(cache_dir, Normalizer::default());
        let tokenizer = Tokenizer::new();
        let mut token_docs = Vec::with_capacity(snapshot.doc_ids.len());
        for doc_id in &snapshot.doc_ids {
            let text = cache
                .get(doc_id)?
                .with_context(|| format!("document {doc_id} missing from cache {cache_dir}"))?;
            token_docs.push(tokenizer.tokenize(&text));
        }
        let config = EmbeddingConfig { seed, ..EmbeddingConfig::new(n_topics) };
        let model = EmbeddingModel::fit(&token_docs, &config)?;
        save_model(&out_paths, &AnyModel::Embedding(model))?;
    }

    tracing::info!("training complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    snapshot_dir: &str,
    ratings_path: &str,
    lsi: bool,
    lda: bool,
    artm: bool,
    d2v: bool,
    cut_off: usize,
    top_n: usize,
) -> Result<()> {
    let selected: Vec<ModelKind> = [
        (lsi, ModelKind::Lsi),
        (lda, ModelKind::Lda),
        (artm, ModelKind::Artm),
        (d2v, ModelKind::Embedding),
    ]
    .into_iter()
    .filter_map(|(on, kind)| on.then_some(kind))
    .collect();
    if selected.is_empty() {
        bail!("select at least one of --lsi --lda --artm --d2v");
    }

    let store = RatingStore::open(ratings_path)?;
    let ratings = store.all()?;
    let evaluator = Evaluator::with_params(&ratings, cut_off, top_n);
    tracing::info!(
        num_ratings = ratings.len(),
        judged_docs = evaluator.num_judged_docs(),
        "loaded ground truth"
    );

    let paths = SnapshotPaths::new(snapshot_dir);
    let mut scores = serde_json::Map::new();
    for kind in selected {
        let model = load_model(&paths, kind)?;
        let result = evaluator.evaluate(&model)?;
        scores.insert(kind.as_str().to_string(), serde_json::to_value(&result)?);
    }
    println!("{}", serde_json::to_string_pretty(&serde_json::Value::Object(scores))?);
    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
