//! Plain-text rendering of a finished selection run.

use crate::selection::selector::SelectionOutcome;

/// Render a selection outcome as a human-readable report.
///
/// The selected model's accuracy leads the summary block; RMSE, the
/// score that actually decided the sweep, follows it. Binary runs get
/// a confusion matrix with actual classes on rows and predicted
/// classes on columns, plus precision and recall with a note wherever
/// a zero denominator forced the score to 0.
pub fn render_report(outcome: &SelectionOutcome) -> String {
    let mut report = String::new();
    let best = outcome.best();

    report.push_str("=== Model Selection Report ===\n\n");
    report.push_str(&format!(
        "Candidates evaluated: {}\n",
        outcome.evaluations.len()
    ));
    report.push_str(&format!(
        "Split: {} train / {} test rows\n\n",
        outcome.n_train, outcome.n_test
    ));

    report.push_str("--- Selected Model ---\n");
    report.push_str(&format!("Model:    {}\n", best.name));
    report.push_str(&format!("Accuracy: {:.4}\n", best.metrics.accuracy));
    report.push_str(&format!("RMSE:     {:.4}\n\n", best.metrics.rmse));

    report.push_str("--- Candidate Comparison ---\n");
    report.push_str(&format!(
        "  {:<20} {:>8} {:>8} {:>8} {:>10}\n",
        "Model", "RMSE", "MAE", "Accuracy", "Time (s)"
    ));
    for (i, eval) in outcome.evaluations.iter().enumerate() {
        let marker = if i == outcome.best_index { "*" } else { " " };
        report.push_str(&format!(
            "{} {:<20} {:>8.4} {:>8.4} {:>8.4} {:>10.4}\n",
            marker,
            eval.name,
            eval.metrics.rmse,
            eval.metrics.mae,
            eval.metrics.accuracy,
            eval.training_time_secs
        ));
    }
    report.push('\n');

    if let Some(confusion) = &best.metrics.confusion {
        report.push_str("--- Confusion Matrix (rows actual, columns predicted) ---\n");
        report.push_str(&format!(
            "  {:<14} {:>12} {:>12}\n",
            "",
            format!("pred {}", confusion.classes[0]),
            format!("pred {}", confusion.classes[1])
        ));
        for (row, class) in confusion.classes.iter().enumerate() {
            report.push_str(&format!(
                "  {:<14} {:>12} {:>12}\n",
                format!("actual {}", class),
                confusion.counts[row][0],
                confusion.counts[row][1]
            ));
        }
        report.push('\n');
    }

    if let (Some(precision), Some(recall)) = (best.metrics.precision, best.metrics.recall) {
        let precision_note = if best.metrics.precision_degenerate {
            "  (no positive predictions)"
        } else {
            ""
        };
        let recall_note = if best.metrics.recall_degenerate {
            "  (no actual positives)"
        } else {
            ""
        };
        report.push_str(&format!("Precision: {:.4}{}\n", precision, precision_note));
        report.push_str(&format!("Recall:    {:.4}{}\n", recall, recall_note));
    }

    report
}
