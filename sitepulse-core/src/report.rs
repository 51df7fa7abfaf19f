// Report generation for categorized audit results

use crate::pagespeed::ScoreSet;
use crate::session::PageSpeedEvent;
use chrono::Local;
use colored::Colorize;
use sitepulse_crawler::CategorizedPages;

/// Generate a text report of the categorized pages.
pub fn generate_audit_report(pages: &CategorizedPages, base_url: &str) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Site: {}\n", base_url));
    report.push_str(&format!(
        "  Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("  Pages found: {}\n", pages.page_count()));
    report.push_str(&format!("  Categories: {}\n", pages.category_count()));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for (category, entries) in pages.categories() {
        report.push_str(&format!("## {}\n", category));
        report.push_str(&format!("  {} pages\n\n", entries.len()));

        for entry in entries {
            let title = entry.title.as_deref().unwrap_or("(nested sitemap)");
            let mut line = format!("  {} {}", title, entry.url);
            if let Some(ref lastmod) = entry.last_modified {
                line.push_str(&format!(" (modified {})", lastmod));
            }
            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

/// Serialize the categorized result as pretty JSON, matching the shape the
/// audit API returns: category name -> page entries.
pub fn generate_json_report(pages: &CategorizedPages) -> String {
    serde_json::to_string_pretty(pages).unwrap_or_else(|_| "{}".to_string())
}

/// One streamed line per completed PageSpeed result.
pub fn format_score_line(event: &PageSpeedEvent) -> String {
    format!(
        "{} desktop [{}] mobile [{}]",
        event.url.bright_white(),
        format_scores(&event.page_speed_data.desktop),
        format_scores(&event.page_speed_data.mobile),
    )
}

fn format_scores(scores: &ScoreSet) -> String {
    format!(
        "perf {} a11y {} bp {} seo {}",
        format_score(scores.performance),
        format_score(scores.accessibility),
        format_score(scores.best_practices),
        format_score(scores.seo),
    )
}

/// Scores render as 0-100; color cutoffs follow the PageSpeed UI bands.
fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => {
            let rounded = (score * 100.0).round() as i64;
            let text = format!("{}", rounded);
            if score >= 0.9 {
                text.green().to_string()
            } else if score >= 0.5 {
                text.yellow().to_string()
            } else {
                text.red().to_string()
            }
        }
        None => "-".dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagespeed::PageSpeedResult;
    use sitepulse_crawler::PageEntry;

    fn sample_pages() -> CategorizedPages {
        let mut pages = CategorizedPages::new();
        pages.push(PageEntry {
            url: "https://x.com/events/a".to_string(),
            title: Some("Launch".to_string()),
            last_modified: Some("2024-01-01".to_string()),
            category: "events".to_string(),
        });
        pages.push(PageEntry {
            url: "https://x.com/nested.xml".to_string(),
            title: None,
            last_modified: None,
            category: "others".to_string(),
        });
        pages
    }

    #[test]
    fn test_text_report_lists_categories_and_entries() {
        let report = generate_audit_report(&sample_pages(), "https://x.com");

        assert!(report.contains("Site: https://x.com"));
        assert!(report.contains("Pages found: 2"));
        assert!(report.contains("## events"));
        assert!(report.contains("Launch https://x.com/events/a (modified 2024-01-01)"));
        assert!(report.contains("(nested sitemap) https://x.com/nested.xml"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let json = generate_json_report(&sample_pages());
        let parsed: CategorizedPages = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_pages());
    }

    #[test]
    fn test_score_line_shows_missing_scores_as_dash() {
        colored::control::set_override(false);

        let event = PageSpeedEvent {
            url: "https://x.com/a".to_string(),
            page_speed_data: PageSpeedResult {
                site_url: "https://x.com/a".to_string(),
                desktop: ScoreSet {
                    performance: Some(0.91),
                    ..ScoreSet::default()
                },
                mobile: ScoreSet::default(),
                analysis_url: String::new(),
            },
        };

        let line = format_score_line(&event);
        assert!(line.contains("desktop [perf 91"));
        assert!(line.contains("mobile [perf -"));
    }
}
