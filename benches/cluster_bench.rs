use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metric_dbscan::{cluster_items, cluster_items_with, ClusterConfig};

fn next(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state >> 33
}

fn line_points(n: usize, span: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| (next(&mut state) as f64) / (u32::MAX as f64) * span)
        .collect()
}

fn random_word(state: &mut u64, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[next(state) as usize % alphabet.len()] as char)
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn bench_line(c: &mut Criterion) {
    let items = line_points(1000, 200.0, 42);
    let metric = |a: &f64, b: &f64| (a - b).abs();

    c.bench_function("dbscan_line_1000", |b| {
        b.iter(|| black_box(cluster_items(black_box(&items), &metric, 3, 0.5).unwrap()));
    });

    c.bench_function("dbscan_line_1000_bucket16", |b| {
        b.iter(|| {
            let config = ClusterConfig {
                bucket_size: 16,
                ..Default::default()
            };
            black_box(cluster_items_with(black_box(&items), &metric, 3, 0.5, config).unwrap())
        });
    });
}

fn bench_strings(c: &mut Criterion) {
    // Four loose groups of random words over partially overlapping
    // alphabets, the workload the crate was built for.
    let mut state = 7u64;
    let mut items: Vec<String> = Vec::new();
    for alphabet in [b"abcdeAB", b"fghijAB", b"klmnoAB", b"pqrstAB"] {
        for _ in 0..100 {
            items.push(random_word(&mut state, alphabet, 20));
        }
    }
    let metric = |a: &String, b: &String| levenshtein(a, b) as f64;

    c.bench_function("dbscan_levenshtein_400x20", |b| {
        b.iter(|| black_box(cluster_items(black_box(&items), &metric, 5, 12.0).unwrap()));
    });
}

criterion_group!(benches, bench_line, bench_strings);
criterion_main!(benches);
