use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::RankedArticle;

pub const DATE_PLACEHOLDER: &str = "Date not available";

/// One article as it appears in the digest
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub source: String,
    pub title: String,
    pub url: String,
    pub published: String,
    pub summary: String,
    pub primary: String,
    pub secondary: String,
    pub score: u8,
}

impl DigestEntry {
    fn from_ranked(ranked: &RankedArticle) -> Self {
        let article = &ranked.article.article;
        let classification = &ranked.article.classification;
        Self {
            source: article.source.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            published: format_published(article.published.as_deref()),
            summary: article.summary.clone(),
            primary: classification.primary.clone(),
            secondary: classification.secondary.clone(),
            score: classification.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DigestUnit {
    /// Several sources covering one event, best-scored first
    Coverage {
        group_id: String,
        headline: String,
        entries: Vec<DigestEntry>,
    },
    Single(DigestEntry),
}

impl DigestUnit {
    pub fn entries(&self) -> &[DigestEntry] {
        match self {
            DigestUnit::Coverage { entries, .. } => entries,
            DigestUnit::Single(entry) => std::slice::from_ref(entry),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub export_url: String,
    pub units: Vec<DigestUnit>,
}

impl Digest {
    pub fn grouped_article_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u, DigestUnit::Coverage { .. }))
            .map(|u| u.entries().len())
            .sum()
    }

    pub fn single_article_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u, DigestUnit::Single(_)))
            .count()
    }

    pub fn article_count(&self) -> usize {
        self.units.iter().map(|u| u.entries().len()).sum()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: Arial, sans-serif; background-color: #f9f9f9; padding: 20px; color: #333; }\n");
        html.push_str("    .newsletter { max-width: 700px; margin: auto; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 0 10px rgba(0,0,0,0.1); }\n");
        html.push_str("    .article-group { margin-bottom: 40px; border-bottom: 2px solid #E97451; padding-bottom: 20px; }\n");
        html.push_str("    .single-article { margin-bottom: 30px; border-bottom: 1px solid #eee; padding-bottom: 15px; }\n");
        html.push_str("    .group-header { font-size: 18px; font-weight: bold; color: #E97451; margin-bottom: 15px; padding: 10px; background-color: #fff5f3; border-left: 4px solid #E97451; }\n");
        html.push_str("    .single-title { font-size: 16px; font-weight: bold; color: #E97451; margin-bottom: 10px; }\n");
        html.push_str("    .coverage { margin-bottom: 15px; font-size: 14px; line-height: 1.6; background-color: #f8f9fa; padding: 12px; border-radius: 6px; border-left: 3px solid #dee2e6; }\n");
        html.push_str("    .source-info { font-weight: bold; color: #495057; margin-bottom: 8px; }\n");
        html.push_str("    .summary { margin: 8px 0; line-height: 1.5; }\n");
        html.push_str("    .tags { font-size: 12px; color: #6c757d; background-color: #e9ecef; padding: 5px 8px; border-radius: 4px; margin-top: 8px; }\n");
        html.push_str("    .score { font-weight: bold; color: #E97451; }\n");
        html.push_str("    a { color: #0073e6; text-decoration: none; }\n");
        html.push_str("    .group-count { font-size: 12px; color: #6c757d; font-weight: normal; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");
        html.push_str("  <div class=\"newsletter\">\n");
        html.push_str("    <h2>📰 Daily Highlights – Top Stories</h2>\n");
        html.push_str(&format!(
            "    <p>📄 <a href=\"{}\" download=\"newsletter_data.csv\">Click here to download the full list as CSV</a></p>\n",
            escape_html(&self.export_url)
        ));

        for unit in &self.units {
            match unit {
                DigestUnit::Coverage {
                    headline, entries, ..
                } => {
                    html.push_str("    <div class=\"article-group\">\n");
                    html.push_str(&format!(
                        "      <div class=\"group-header\">\n        {}\n        <span class=\"group-count\">({} sources)</span>\n      </div>\n",
                        escape_html(headline),
                        entries.len()
                    ));
                    for entry in entries {
                        push_coverage(&mut html, entry, "      ");
                    }
                    html.push_str("    </div>\n");
                }
                DigestUnit::Single(entry) => {
                    html.push_str("    <div class=\"single-article\">\n");
                    html.push_str(&format!(
                        "      <div class=\"single-title\">{}</div>\n",
                        escape_html(&entry.title)
                    ));
                    push_coverage(&mut html, entry, "      ");
                    html.push_str("    </div>\n");
                }
            }
        }

        html.push_str("  </div>\n</body>\n</html>\n");
        html
    }
}

pub struct DigestRenderer;

impl DigestRenderer {
    /// Lay out an already ranked sequence.
    ///
    /// A coverage unit is emitted where its group first appears; every
    /// ungrouped article becomes a single unit in place.
    pub fn render(ranked: &[RankedArticle], export_url: &str) -> Digest {
        let mut seen_groups = HashSet::new();
        let mut units = Vec::new();

        for item in ranked {
            if !item.is_grouped() {
                units.push(DigestUnit::Single(DigestEntry::from_ranked(item)));
                continue;
            }

            let group_id = item.group_id();
            if !seen_groups.insert(group_id.clone()) {
                continue;
            }

            let mut members: Vec<&RankedArticle> = ranked
                .iter()
                .filter(|r| r.is_grouped() && r.group_id() == group_id)
                .collect();
            // Stable: equal scores keep their order in the ranked sequence
            members.sort_by(|a, b| b.score().cmp(&a.score()));

            let entries: Vec<DigestEntry> =
                members.into_iter().map(DigestEntry::from_ranked).collect();
            let headline = entries.first().map(|e| e.title.clone()).unwrap_or_default();

            units.push(DigestUnit::Coverage {
                group_id,
                headline,
                entries,
            });
        }

        Digest {
            export_url: export_url.to_string(),
            units,
        }
    }
}

/// Format a feed timestamp as e.g. "March 05, 2025", or the placeholder.
pub fn format_published(published: Option<&str>) -> String {
    let Some(raw) = published.map(str::trim).filter(|s| !s.is_empty()) else {
        return DATE_PLACEHOLDER.to_string();
    };

    parse_published(raw)
        .map(|date| date.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| DATE_PLACEHOLDER.to_string())
}

fn parse_published(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn push_coverage(html: &mut String, entry: &DigestEntry, indent: &str) {
    html.push_str(&format!("{}<div class=\"coverage\">\n", indent));
    html.push_str(&format!(
        "{}  <div class=\"source-info\">{} (<a href=\"{}\">link</a>) - {}</div>\n",
        indent,
        escape_html(&entry.source),
        escape_html(&entry.url),
        escape_html(&entry.published)
    ));
    html.push_str(&format!(
        "{}  <div class=\"summary\">{}</div>\n",
        indent,
        escape_html(&entry.summary)
    ));
    html.push_str(&format!(
        "{}  <div class=\"tags\"><strong>Primary:</strong> {} | <strong>Secondary:</strong> {} | <span class=\"score\">Score: {}</span></div>\n",
        indent,
        escape_html(&entry.primary),
        escape_html(&entry.secondary),
        entry.score
    ));
    html.push_str(&format!("{}</div>\n", indent));
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Classification, Placement, ScoredArticle};

    fn ranked(source: &str, title: &str, score: u8, placement: Placement) -> RankedArticle {
        RankedArticle {
            article: ScoredArticle::new(
                Article::new(source, title, format!("https://example.com/{}", title), "A summary")
                    .with_published("2025-03-05T08:30:00"),
                Classification {
                    score,
                    ..Classification::default()
                },
            ),
            placement,
        }
    }

    fn g(rank: usize, size: usize) -> Placement {
        Placement::Grouped { rank, size }
    }

    // ==================== Date Formatting Tests ====================

    #[test]
    fn test_format_naive_iso() {
        assert_eq!(format_published(Some("2025-03-05T08:30:00")), "March 05, 2025");
    }

    #[test]
    fn test_format_rfc3339_and_rfc2822() {
        assert_eq!(format_published(Some("2025-12-31T23:00:00Z")), "December 31, 2025");
        assert_eq!(
            format_published(Some("Tue, 01 Jul 2025 10:00:00 +0000")),
            "July 01, 2025"
        );
    }

    #[test]
    fn test_format_date_only() {
        assert_eq!(format_published(Some("2024-02-29")), "February 29, 2024");
    }

    #[test]
    fn test_format_never_fails() {
        for input in [
            "",
            "   ",
            "not a date",
            "2025-13-45",
            "2025-02-30T00:00:00",
            "🙂",
            "Tue, 99 Foo",
        ] {
            assert_eq!(format_published(Some(input)), DATE_PLACEHOLDER, "input {:?}", input);
        }
        assert_eq!(format_published(None), DATE_PLACEHOLDER);
    }

    // ==================== Layout Tests ====================

    #[test]
    fn test_coverage_unit_emitted_once_with_best_headline() {
        let items = vec![
            ranked("X", "low", 3, g(1, 2)),
            ranked("Y", "high", 8, g(1, 2)),
            ranked("Z", "alone", 6, Placement::Ungrouped),
        ];

        let digest = DigestRenderer::render(&items, "https://csv");
        assert_eq!(digest.units.len(), 2);

        match &digest.units[0] {
            DigestUnit::Coverage {
                group_id,
                headline,
                entries,
            } => {
                assert_eq!(group_id, "group_1");
                assert_eq!(headline, "high");
                let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
                assert_eq!(titles, vec!["high", "low"]);
            }
            other => panic!("expected coverage unit, got {:?}", other),
        }
        assert!(matches!(&digest.units[1], DigestUnit::Single(e) if e.title == "alone"));
    }

    #[test]
    fn test_headline_tie_uses_sequence_order() {
        let items = vec![
            ranked("X", "first", 7, g(1, 2)),
            ranked("Y", "second", 7, g(1, 2)),
        ];
        let digest = DigestRenderer::render(&items, "");
        match &digest.units[0] {
            DigestUnit::Coverage { headline, .. } => assert_eq!(headline, "first"),
            other => panic!("expected coverage unit, got {:?}", other),
        }
    }

    #[test]
    fn test_every_article_in_exactly_one_unit() {
        let items = vec![
            ranked("X", "a", 9, g(1, 2)),
            ranked("Y", "b", 4, g(1, 2)),
            ranked("X", "c", 8, g(2, 3)),
            ranked("Y", "d", 7, g(2, 3)),
            ranked("Z", "e", 2, g(2, 3)),
            ranked("Z", "f", 6, Placement::Ungrouped),
            ranked("X", "g", 1, Placement::Ungrouped),
        ];

        let digest = DigestRenderer::render(&items, "https://csv");

        let mut rendered: Vec<String> = digest
            .units
            .iter()
            .flat_map(|u| u.entries().iter().map(|e| e.title.clone()))
            .collect();
        rendered.sort();
        assert_eq!(rendered, vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(digest.article_count(), 7);
        assert_eq!(digest.grouped_article_count(), 5);
        assert_eq!(digest.single_article_count(), 2);
        assert_eq!(digest.units.len(), 4);
    }

    // ==================== HTML Generation Tests ====================

    #[test]
    fn test_html_contains_units_and_export_link() {
        let items = vec![
            ranked("WWD", "Merger announced", 9, g(1, 2)),
            ranked("Glossy", "Brands merge", 7, g(1, 2)),
            ranked("BoF", "Solo story", 5, Placement::Ungrouped),
        ];
        let html =
            DigestRenderer::render(&items, "https://github.com/o/r/raw/main/x.csv").to_html();

        assert!(html.contains("href=\"https://github.com/o/r/raw/main/x.csv\""));
        assert!(html.contains(
            "Merger announced\n        <span class=\"group-count\">(2 sources)</span>"
        ));
        assert!(html.contains("<div class=\"single-title\">Solo story</div>"));
        assert!(html.contains(
            "Glossy (<a href=\"https://example.com/Brands merge\">link</a>) - March 05, 2025"
        ));
        assert!(html.contains("<span class=\"score\">Score: 9</span>"));
        assert_eq!(html.matches("class=\"article-group\"").count(), 1);
        assert_eq!(html.matches("class=\"single-article\"").count(), 1);
    }

    #[test]
    fn test_html_escapes_text() {
        let mut item = ranked("A&B", "Cats <3 dogs", 5, Placement::Ungrouped);
        item.article.article.summary = "\"quoted\" & 'single'".to_string();
        let html = DigestRenderer::render(&[item], "").to_html();

        assert!(html.contains("Cats &lt;3 dogs"));
        assert!(html.contains("A&amp;B"));
        assert!(html.contains("&quot;quoted&quot; &amp; &#39;single&#39;"));
    }

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            escape_html("<a href=\"test\">Click & Go</a>"),
            "&lt;a href=&quot;test&quot;&gt;Click &amp; Go&lt;/a&gt;"
        );
    }
}
