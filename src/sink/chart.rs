use std::fmt::Write;

use crate::types::Aggregate;

const BAR_WIDTH: usize = 50;

/// Render an aggregate as a plain-text horizontal bar chart.
///
/// Username averages are listed by category, email domains by descending count (labels
/// capitalised, with share and count), birth years in ascending order.
pub fn render_chart(aggregate: &Aggregate) -> String {
    let title = aggregate.statistic().title();
    let rows: Vec<(String, f64, String)> = match aggregate {
        Aggregate::UsernameLengths(m) => m
            .iter()
            .map(|(k, v)| (k.clone(), *v, format!("{v:.2}")))
            .collect(),
        Aggregate::EmailDomains(m) => {
            let total: u64 = m.values().sum();
            let mut entries: Vec<_> = m.iter().collect();
            entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            entries
                .into_iter()
                .map(|(k, v)| {
                    let pct = if total == 0 {
                        0.0
                    } else {
                        *v as f64 * 100.0 / total as f64
                    };
                    (capitalize(k), *v as f64, format!("{pct:.1}% ({v})"))
                })
                .collect()
        }
        Aggregate::BirthYears(m) => m
            .iter()
            .map(|(k, v)| (k.to_string(), *v as f64, v.to_string()))
            .collect(),
    };

    let label_width = rows.iter().map(|r| r.0.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|r| r.1).fold(0.0_f64, f64::max);

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    for (label, value, annotation) in rows {
        let bar = "#".repeat(bar_len(value, max));
        let _ = writeln!(out, "{label:>label_width$} | {bar} {annotation}");
    }
    out
}

fn bar_len(value: f64, max: f64) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * BAR_WIDTH as f64).round().max(1.0) as usize
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
