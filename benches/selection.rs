use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modelsieve::candidates::{
    CandidateKind, DecisionTreeConfig, GaussianNbConfig, KnnConfig, LogisticRegressionConfig,
    ModelCandidate,
};
use modelsieve::dataset::FeatureTable;
use modelsieve::featurize::TfidfVectorizer;
use modelsieve::selection::{ModelSelector, SelectionConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;

fn create_rating_table(n_rows: usize, n_features: usize) -> FeatureTable {
    let mut rng = rand::thread_rng();

    let labels: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(1..=5) as f64).collect();
    // Features loosely track the rating so every candidate has signal.
    let features = Array2::from_shape_fn((n_rows, n_features), |(r, _)| {
        labels[r] + rng.gen::<f64>() - 0.5
    });
    let names: Vec<String> = (0..n_features).map(|i| format!("term_{}", i)).collect();

    FeatureTable::new(names, features, "rating", Array1::from_vec(labels)).unwrap()
}

fn fast_roster() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new(
            "LogisticRegression",
            CandidateKind::LogisticRegression(LogisticRegressionConfig::default()),
        ),
        ModelCandidate::new(
            "KNeighbors",
            CandidateKind::KNearestNeighbors(KnnConfig::default()),
        ),
        ModelCandidate::new(
            "DecisionTree",
            CandidateKind::DecisionTree(DecisionTreeConfig::default()),
        ),
        ModelCandidate::new(
            "GaussianNB",
            CandidateKind::GaussianNaiveBayes(GaussianNbConfig::default()),
        ),
    ]
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10); // Fewer samples, each run trains four models

    for n_rows in [200, 1000].iter() {
        let table = create_rating_table(*n_rows, 20);

        group.bench_with_input(BenchmarkId::new("run", n_rows), &table, |b, table| {
            b.iter(|| {
                let selector =
                    ModelSelector::new(SelectionConfig::new().with_roster(fast_roster()));
                selector.run(black_box(table)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize");

    let phrases = [
        "great laptop with a bright screen",
        "battery life is disappointing",
        "fast quiet keyboard feels solid",
        "terrible build quality would not recommend",
        "excellent value for the price",
    ];

    for n_docs in [100, 1000].iter() {
        let corpus: Vec<String> = (0..*n_docs)
            .map(|i| format!("{} review {}", phrases[i % phrases.len()], i))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("fit_transform", n_docs),
            &corpus,
            |b, corpus| {
                b.iter(|| {
                    let mut vectorizer = TfidfVectorizer::default();
                    vectorizer.fit_transform(black_box(corpus)).unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_sweep, bench_vectorize);
criterion_main!(benches);
