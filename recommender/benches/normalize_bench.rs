use criterion::{criterion_group, criterion_main, Criterion};
use recommender::{Normalizer, Tokenizer};

fn ruling_text() -> String {
    let paragraph = "Арбитражный суд города Москвы, рассмотрев в открытом судебном заседании \
дело по иску общества с ограниченной ответственностью «Ромашка» о взыскании 1 250 000 руб. 50 коп. \
задолженности по договору аренды нежилого помещения, руководствуясь статьей 110 Арбитражного \
процессуального кодекса,\n";
    let mut text = String::from("А40-123456/2019\n");
    text.push_str("установил:\n");
    for _ in 0..50 {
        text.push_str(paragraph);
    }
    text.push_str("суд решил:\nвзыскать.\n");
    text
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::default();
    let text = ruling_text();
    c.bench_function("normalize_ruling", |b| b.iter(|| normalizer.normalize(&text)));
}

fn bench_tokenize(c: &mut Criterion) {
    let normalizer = Normalizer::default();
    let tokenizer = Tokenizer::new();
    let text = normalizer.normalize(&ruling_text());
    c.bench_function("tokenize_ruling", |b| b.iter(|| tokenizer.tokenize(&text)));
}

criterion_group!(benches, bench_normalize, bench_tokenize);
criterion_main!(benches);
