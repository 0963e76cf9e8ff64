use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shotvault::prefs::parse_cookie_header;
use shotvault::validate::{normalize_url, validate, validate_email};

fn bench_validate(c: &mut Criterion) {
    c.bench_function("validate_email", |b| {
        b.iter(|| validate_email(black_box("jan.r@mail.example.org")))
    });

    c.bench_function("normalize_url/absolute", |b| {
        b.iter(|| normalize_url(black_box("https://www.wsj.com/market-data/currencies/exchangerates")))
    });

    // Scheme-less input takes the retry path
    c.bench_function("normalize_url/scheme_less", |b| {
        b.iter(|| normalize_url(black_box("www.wsj.com/market-data/currencies/exchangerates")))
    });

    c.bench_function("validate", |b| {
        b.iter(|| validate(black_box("a@b.com"), black_box("example.com")))
    });
}

fn bench_cookies(c: &mut Criterion) {
    let header = "session=abc123; lastEmail=a%40b.com; theme=dark; lastUrl=https%3A%2F%2Fexample.com%2F";
    c.bench_function("parse_cookie_header", |b| {
        b.iter(|| parse_cookie_header(black_box(header)))
    });
}

criterion_group!(benches, bench_validate, bench_cookies);
criterion_main!(benches);
