use criterion::{black_box, criterion_group, criterion_main, Criterion};

use eg_core::{compile, markup, HighlightEngine};

fn sample_page() -> String {
    let mut page = String::new();
    for i in 0..500 {
        page.push_str(&format!(
            "<div class=\"row\"><h2>Section {i}</h2><p>The quick brown fox {i} jumps over the lazy dog. \
             Contact <a href=\"mailto:user{i}@example.com\">user{i}@example.com</a> for details.</p></div>"
        ));
    }
    page
}

fn bench_search(c: &mut Criterion) {
    let page = sample_page();
    let pattern = compile(r"\b[a-z0-9]+@example\.com\b").unwrap().unwrap();

    c.bench_function("search_and_clear_500_rows", |b| {
        b.iter(|| {
            let mut doc = markup::parse(&page);
            let mut engine = HighlightEngine::default();
            let count = engine.search(&mut doc, black_box(&pattern));
            engine.clear(&mut doc);
            count
        })
    });

    c.bench_function("focus_next_cycle", |b| {
        let mut doc = markup::parse(&page);
        let mut engine = HighlightEngine::default();
        engine.search(&mut doc, &pattern);
        b.iter(|| engine.focus_next(&mut doc))
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
