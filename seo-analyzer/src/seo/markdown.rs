// Markdown export of a finished report.

use chrono::{DateTime, Utc};

use super::report::{score_band, score_text, ReportResult};

/// Results of the auxiliary flows, shown alongside the main report.
#[derive(Debug, Clone, Default)]
pub struct MarkdownExtras {
    pub recalculated_score: Option<f64>,
    pub performance_summary: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

pub fn render_markdown(url: &str, result: &ReportResult, extras: &MarkdownExtras) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str(&format!("# SEO Report: {url}\n\n"));
    if let Some(ts) = extras.generated_at {
        md.push_str(&format!("_Generated {}_\n\n", ts.format("%Y-%m-%d %H:%M UTC")));
    }

    md.push_str("| Metric | Score | Rating |\n|---|---|---|\n");
    push_score_row(&mut md, "SEO score", result.score);
    push_score_row(&mut md, "Performance score", result.performance_score);
    if let Some(score) = extras.recalculated_score {
        push_score_row(&mut md, "Recalculated SEO score", score);
    }
    md.push('\n');

    md.push_str("## SEO Report\n\n");
    md.push_str(result.report.trim());
    md.push_str("\n\n## Performance\n\n");
    md.push_str(result.performance_report.trim());
    md.push_str("\n\n");

    if let Some(summary) = &extras.performance_summary {
        md.push_str("### Performance Summary\n\n");
        md.push_str(summary.trim());
        md.push_str("\n\n");
    }

    for section in result.sections() {
        md.push_str(&format!("## {}\n\n| Item | Value |\n|---|---|\n", section.title()));
        for row in &section.rows {
            md.push_str(&format!("| {} | {} |\n", escape_cell(&row.label), escape_cell(&row.value)));
        }
        md.push('\n');
    }

    md
}

fn push_score_row(md: &mut String, label: &str, score: f64) {
    md.push_str(&format!(
        "| {label} | {}/100 | {} |\n",
        score_text(score),
        score_band(score).label()
    ));
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
