use recommender::Tokenizer;

#[test]
fn it_stems_and_lowercases() {
    let t = Tokenizer::new();
    let upper = t.tokenize("ВЗЫСКАТЬ ЗАДОЛЖЕННОСТЬ");
    let lower = t.tokenize("взыскать задолженность");
    assert_eq!(upper, lower);
    assert!(!upper.is_empty());
}

#[test]
fn it_filters_stopwords() {
    let t = Tokenizer::new();
    let toks = t.tokenize("решение от 2020 года на основании ст 110 АПК РФ");
    assert!(!toks.contains(&"от".to_string()));
    assert!(!toks.contains(&"на".to_string()));
    assert!(!toks.contains(&"ст".to_string()));
    assert!(!toks.contains(&"рф".to_string()));
    // numeric tokens survive, they often are statute references
    assert!(toks.contains(&"110".to_string()));
}

#[test]
fn output_is_identical_for_cold_and_warm_cache() {
    let text = "суд взыскал задолженность и проценты по договору аренды помещения";
    let warm = Tokenizer::new();
    let first = warm.tokenize(text);
    let second = warm.tokenize(text);
    assert_eq!(first, second);

    let cold = Tokenizer::new();
    assert_eq!(cold.tokenize(text), first);
}

#[test]
fn token_order_follows_appearance_order() {
    let t = Tokenizer::new();
    let toks = t.tokenize("договор аренды договор");
    assert_eq!(toks.len(), 3);
    assert_eq!(toks[0], toks[2]);
    assert_ne!(toks[0], toks[1]);
}

#[test]
fn empty_input_yields_empty_sequence() {
    let t = Tokenizer::new();
    assert!(t.tokenize("").is_empty());
    assert!(t.tokenize("   \n\t ").is_empty());
}
