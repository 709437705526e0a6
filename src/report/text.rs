use std::fmt::Write;

use crate::report::Summary;

pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "samples: {} classified, {} failed ({} total)",
        summary.n_classified, summary.n_failed, summary.n_samples
    );
    for (label, count) in &summary.label_counts {
        let _ = writeln!(out, "  {label}: {count}");
    }
    out
}
