//! Summary command - one-shot aggregation

use std::fmt::Write as _;

use colored::Colorize;

use crate::analytics::{Aggregator, AnalyticsSummary, GroupCount, SummarySource};
use crate::interfaces::cli::CliError;
use crate::storage::StorageFactory;

/// 每个分组在文本报告中最多显示的条数
const TOP_N: usize = 10;

pub async fn print_summary(json: bool) -> Result<(), CliError> {
    let config = crate::config::get_config();
    let store = StorageFactory::create().await?;
    let aggregator = Aggregator::new(store, config.analytics.recent_events_limit);
    let summary = aggregator.compute_summary().await?;

    if json {
        let out = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::CommandError(format!("Failed to encode summary: {}", e)))?;
        println!("{}", out);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

fn render_group(out: &mut String, title: &str, groups: &[GroupCount]) {
    let _ = writeln!(out, "{}", title.bold().cyan());
    if groups.is_empty() {
        let _ = writeln!(out, "  {}", "(no data)".dimmed());
        return;
    }
    for group in groups.iter().take(TOP_N) {
        let _ = writeln!(out, "  {:<32} {}", group.key, group.count);
    }
    if groups.len() > TOP_N {
        let _ = writeln!(out, "  {}", format!("... {} more", groups.len() - TOP_N).dimmed());
    }
}

/// 文本报告
pub fn render_summary(summary: &AnalyticsSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Analytics Summary".bold().green());
    let _ = writeln!(
        out,
        "  {}: {}   {}: {}",
        "Visits today".cyan(),
        summary.today_total_visits,
        "Clicks today".cyan(),
        summary.today_total_clicks
    );
    let _ = writeln!(
        out,
        "  {}: {}   {}: {}",
        "Visits overall".cyan(),
        summary.overall_total_visits,
        "Clicks overall".cyan(),
        summary.overall_total_clicks
    );
    let _ = writeln!(
        out,
        "  {}: {}   {}: {}",
        "Countries".cyan(),
        summary.country_count(),
        "Referrers".cyan(),
        summary.referrer_count()
    );
    out.push('\n');

    render_group(&mut out, "Top links", &summary.top_links);
    render_group(&mut out, "Countries", &summary.by_country);
    render_group(&mut out, "Devices", &summary.by_device);
    render_group(&mut out, "Referrers", &summary.by_referrer);
    render_group(&mut out, "Browsers", &summary.by_browser);

    let _ = writeln!(out, "{}", "Recent activity".bold().cyan());
    for event in &summary.recent {
        let kind = if event.is_page_visit() {
            "visit".blue()
        } else {
            "click".yellow()
        };
        let target = if event.is_page_visit() {
            event.url.as_str()
        } else {
            event.slug.as_str()
        };
        let _ = writeln!(
            out,
            "  {} {} {} {} / {} / {}",
            event
                .created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            kind,
            target,
            event.country,
            event.device,
            event.browser
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_summary() {
        colored::control::set_override(false);
        let text = render_summary(&AnalyticsSummary::default());
        assert!(text.contains("Visits today: 0"));
        assert!(text.contains("(no data)"));
    }

    #[test]
    fn test_render_truncates_long_groups() {
        colored::control::set_override(false);
        let summary = AnalyticsSummary {
            by_referrer: (0..15)
                .map(|i| GroupCount {
                    key: format!("https://ref{}.example", i),
                    count: 15 - i,
                })
                .collect(),
            ..Default::default()
        };
        let text = render_summary(&summary);
        assert!(text.contains("https://ref9.example"));
        assert!(!text.contains("https://ref10.example"));
        assert!(text.contains("... 5 more"));
    }
}
