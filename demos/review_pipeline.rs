//! Review Pipeline Example
//!
//! The full text experiment: vectorize a laptop review corpus with
//! tf-idf, compress it with truncated SVD under a cumulative variance
//! target, derive exact / positive / negative label variants, and run
//! the candidate sweep on every combination.

use modelsieve::prelude::*;
use ndarray::{s, Array1};

fn corpus() -> (Vec<String>, Array1<f64>) {
    let reviews = [
        ("great laptop fast and light with a gorgeous screen", 5.0),
        ("excellent battery life and a bright sharp display", 5.0),
        ("fast quiet and the keyboard feels wonderful", 5.0),
        ("love this machine great value for the money", 5.0),
        ("solid build quality and very decent speed", 4.0),
        ("good screen although the speakers are weak", 4.0),
        ("nice keyboard but the trackpad is only okay", 4.0),
        ("decent laptop for everyday browsing and email", 4.0),
        ("mediocre performance for the price", 3.0),
        ("average machine nothing special about it", 3.0),
        ("acceptable but the fan gets loud under load", 3.0),
        ("battery drains faster than advertised", 2.0),
        ("disappointed by the flimsy hinge and dim screen", 2.0),
        ("sluggish with more than a few tabs open", 2.0),
        ("terrible laptop slow and heavy", 1.0),
        ("battery died after a week very disappointed", 1.0),
        ("awful screen and a loud rattling fan", 1.0),
        ("broken on arrival would not recommend", 1.0),
        ("worst purchase ever complete waste of money", 1.0),
        ("keeps crashing and support was useless", 1.0),
        ("surprisingly good screen for a budget machine", 4.0),
        ("quiet fan and a comfortable keyboard", 5.0),
        ("the charger stopped working within days", 1.0),
        ("runs cool and handles photo editing fine", 4.0),
    ];
    let ratings = Array1::from_vec(reviews.iter().map(|(_, r)| *r).collect());
    let texts = reviews.iter().map(|(t, _)| t.to_string()).collect();
    (texts, ratings)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelsieve=info".into()),
        )
        .init();

    let (reviews, ratings) = corpus();

    let mut vectorizer = TfidfVectorizer::default();
    let weights = vectorizer.fit_transform(&reviews)?;
    println!(
        "Vectorized {} reviews into {} terms",
        reviews.len(),
        weights.ncols()
    );

    let mut svd = TruncatedSvd::new(SvdConfig::new(8));
    let scores = svd.fit_transform(&weights)?;
    let keep = components_for_variance(svd.explained_variance_ratio(), 0.85).max(1);
    let compressed = scores.slice(s![.., ..keep]).to_owned();
    println!(
        "Kept {} of {} SVD components under the 0.85 variance target\n",
        keep,
        svd.n_components()
    );

    let word_table = to_table(
        weights,
        vectorizer.feature_names().to_vec(),
        ratings.clone(),
        "rating",
    )?;
    let svd_table = component_table(&compressed, &ratings, "rating")?;

    let positive_words = word_table.with_labels(binarize_positive(word_table.labels()))?;
    let negative_words = word_table.with_labels(binarize_negative(word_table.labels()))?;
    let positive_svd = svd_table.with_labels(binarize_positive(svd_table.labels()))?;
    let negative_svd = svd_table.with_labels(binarize_negative(svd_table.labels()))?;

    let experiments = [
        ("exact ratings / word features", &word_table),
        ("exact ratings / svd features", &svd_table),
        ("positive reviews / word features", &positive_words),
        ("positive reviews / svd features", &positive_svd),
        ("negative reviews / word features", &negative_words),
        ("negative reviews / svd features", &negative_svd),
    ];

    println!(
        "{:<36} {:<20} {:>8} {:>10}",
        "Experiment", "Selected", "RMSE", "Accuracy"
    );
    println!("{}", "-".repeat(78));

    let mut last = None;
    for (title, table) in experiments {
        let outcome = ModelSelector::new(SelectionConfig::default()).run(table)?;
        let best = outcome.best();
        println!(
            "{:<36} {:<20} {:>8.4} {:>10.4}",
            title, best.name, best.metrics.rmse, best.metrics.accuracy
        );
        last = Some(outcome);
    }

    if let Some(outcome) = last {
        println!("\n{}", render_report(&outcome));
    }

    Ok(())
}
