use anyhow::anyhow;
use recommender::{Corpus, Normalizer, TextCache};
use std::cell::Cell;

fn cache(dir: &std::path::Path) -> TextCache {
    TextCache::new(dir, Normalizer::default())
}

const GOOD_RAW: &str = "Арбитражный суд, рассмотрев в открытом судебном заседании дело,\nустановил:\nвзыскать с ООО задолженность 100000 руб.\nсуд решил:\nвыдать исполнительный лист";

#[test]
fn normalization_runs_once_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    let calls = Cell::new(0u32);

    let extract = || {
        calls.set(calls.get() + 1);
        Ok(GOOD_RAW.to_string())
    };
    let first = cache.get_or_compute("doc-1", extract).unwrap().unwrap();
    assert!(first.contains("SUM"));
    assert!(!first.contains("установил"));

    let second = cache
        .get_or_compute("doc-1", || {
            calls.set(calls.get() + 1);
            Ok(GOOD_RAW.to_string())
        })
        .unwrap()
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);
}

#[test]
fn document_without_operative_part_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    let result = cache
        .get_or_compute("doc-2", || Ok("определение о возврате без резолютивной части".to_string()))
        .unwrap();
    assert!(result.is_none());
    assert!(!cache.path_for("doc-2").exists());
}

#[test]
fn closed_session_document_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    let raw = "суд, рассмотрев в закрытом судебном заседании дело,\nустановил:\nсекретные сведения";
    let result = cache.get_or_compute("doc-3", || Ok(raw.to_string())).unwrap();
    assert!(result.is_none());
    assert!(!cache.path_for("doc-3").exists());
}

#[test]
fn extraction_failure_excludes_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    let result = cache
        .get_or_compute("doc-4", || Err(anyhow!("tika is down")))
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn paths_are_sharded_by_id_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    let path = cache.path_for("ABCdef-42");
    assert!(path.ends_with("ab/ABCdef-42.txt"));
}

#[test]
fn enumeration_is_sorted_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(dir.path());
    for id in ["bb-2", "aa-1", "aa-2"] {
        cache.get_or_compute(id, || Ok(GOOD_RAW.to_string())).unwrap().unwrap();
    }

    let ids: Vec<String> = cache.iter().unwrap().map(|e| e.unwrap().0).collect();
    assert_eq!(ids, vec!["aa-1", "aa-2", "bb-2"]);

    let corpus = Corpus::load(&cache, Some(2)).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.doc_ids, vec!["aa-1", "aa-2"]);
    assert!(corpus.get(0).is_some());
    assert!(corpus.get(5).is_none());
}
