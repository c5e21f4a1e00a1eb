// Flow input/output contracts.
//
// These types double as the JSON schemas handed to the model: the
// `JsonSchema` derive is what the model is asked to fill, and `validate`
// enforces the numeric bounds that deserialization alone does not.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sections::*;
use super::traffic::TrafficData;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("field `{field}` {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

fn check_score(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError {
            field: field.to_string(),
            message: format!("must be between 0 and 100, got {value}"),
        });
    }
    Ok(())
}

fn check_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Score bands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    NeedsWork,
    Poor,
}

impl ScoreBand {
    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Good => "Good",
            ScoreBand::NeedsWork => "Needs work",
            ScoreBand::Poor => "Poor",
        }
    }
}

/// A score as displayed: rounded to a whole number.
pub fn score_text(score: f64) -> String {
    format!("{}", score.round())
}

/// Classify a 0-100 score: 80 and up is good, 50-79 needs work.
///
/// Scores are shown as whole numbers, so the rounded value is classified.
pub fn score_band(score: f64) -> ScoreBand {
    let score = score.round();
    if score >= 80.0 {
        ScoreBand::Good
    } else if score >= 50.0 {
        ScoreBand::NeedsWork
    } else {
        ScoreBand::Poor
    }
}

// ---------------------------------------------------------------------------
// Report generation output
// ---------------------------------------------------------------------------

/// Full SEO analysis of one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    /// Narrative SEO report covering strengths, problems and fixes.
    pub report: String,
    /// Overall SEO score from 0 (worst) to 100 (best).
    #[schemars(range(min = 0, max = 100))]
    pub score: f64,
    /// Narrative performance report (speed, page weight, Core Web Vitals).
    pub performance_report: String,
    /// Performance score from 0 (worst) to 100 (best).
    #[schemars(range(min = 0, max = 100))]
    pub performance_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_page: Option<OnPageDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headings: Option<HeadingStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<KeywordAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing: Option<IndexingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialPresence>,
    /// Figures returned by the get_traffic_data tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileFriendliness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_web_vitals: Option<CoreWebVitals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_resources: Option<PageResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_structure: Option<UrlStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization: Option<Localization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Accessibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlinks: Option<BacklinkProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<Competitor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsSetup>,
    /// Prioritized action items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
}

/// Identifies a report sub-section. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Recommendations,
    OnPage,
    Headings,
    Content,
    Keywords,
    Links,
    Images,
    Indexing,
    Security,
    Social,
    Traffic,
    Domain,
    Mobile,
    StructuredData,
    CoreWebVitals,
    PageResources,
    Server,
    UrlStructure,
    Localization,
    Accessibility,
    Backlinks,
    Competitors,
    Analytics,
}

impl SectionKind {
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Recommendations => "Recommendations",
            SectionKind::OnPage => "On-Page Details",
            SectionKind::Headings => "Headings",
            SectionKind::Content => "Content Quality",
            SectionKind::Keywords => "Keywords",
            SectionKind::Links => "Links",
            SectionKind::Images => "Images",
            SectionKind::Indexing => "Indexing",
            SectionKind::Security => "Security",
            SectionKind::Social => "Social",
            SectionKind::Traffic => "Traffic",
            SectionKind::Domain => "Domain",
            SectionKind::Mobile => "Mobile",
            SectionKind::StructuredData => "Structured Data",
            SectionKind::CoreWebVitals => "Core Web Vitals",
            SectionKind::PageResources => "Page Resources",
            SectionKind::Server => "Server",
            SectionKind::UrlStructure => "URL Structure",
            SectionKind::Localization => "Localization",
            SectionKind::Accessibility => "Accessibility",
            SectionKind::Backlinks => "Backlinks",
            SectionKind::Competitors => "Competitors",
            SectionKind::Analytics => "Analytics",
        }
    }
}

/// A present section, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSection {
    pub kind: SectionKind,
    pub rows: Vec<SectionRow>,
}

impl RenderedSection {
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }
}

impl ReportResult {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("report", &self.report)?;
        check_score("score", self.score)?;
        check_non_empty("performanceReport", &self.performance_report)?;
        check_score("performanceScore", self.performance_score)?;
        Ok(())
    }

    /// Present sections in display order. A section the model returned with
    /// no usable fields is skipped like a missing one.
    pub fn sections(&self) -> Vec<RenderedSection> {
        let candidates: Vec<(SectionKind, Option<Vec<SectionRow>>)> = vec![
            (SectionKind::Recommendations, self.recommendations.as_ref().map(|s| s.rows())),
            (SectionKind::OnPage, self.on_page.as_ref().map(|s| s.rows())),
            (SectionKind::Headings, self.headings.as_ref().map(|s| s.rows())),
            (SectionKind::Content, self.content.as_ref().map(|s| s.rows())),
            (SectionKind::Keywords, self.keywords.as_ref().map(|s| s.rows())),
            (SectionKind::Links, self.links.as_ref().map(|s| s.rows())),
            (SectionKind::Images, self.images.as_ref().map(|s| s.rows())),
            (SectionKind::Indexing, self.indexing.as_ref().map(|s| s.rows())),
            (SectionKind::Security, self.security.as_ref().map(|s| s.rows())),
            (SectionKind::Social, self.social.as_ref().map(|s| s.rows())),
            (SectionKind::Traffic, self.traffic.as_ref().map(|s| s.rows())),
            (SectionKind::Domain, self.domain.as_ref().map(|s| s.rows())),
            (SectionKind::Mobile, self.mobile.as_ref().map(|s| s.rows())),
            (SectionKind::StructuredData, self.structured_data.as_ref().map(|s| s.rows())),
            (SectionKind::CoreWebVitals, self.core_web_vitals.as_ref().map(|s| s.rows())),
            (SectionKind::PageResources, self.page_resources.as_ref().map(|s| s.rows())),
            (SectionKind::Server, self.server.as_ref().map(|s| s.rows())),
            (SectionKind::UrlStructure, self.url_structure.as_ref().map(|s| s.rows())),
            (SectionKind::Localization, self.localization.as_ref().map(|s| s.rows())),
            (SectionKind::Accessibility, self.accessibility.as_ref().map(|s| s.rows())),
            (SectionKind::Backlinks, self.backlinks.as_ref().map(|s| s.rows())),
            (SectionKind::Competitors, self.competitors.as_ref().map(|s| s.rows())),
            (SectionKind::Analytics, self.analytics.as_ref().map(|s| s.rows())),
        ];

        candidates
            .into_iter()
            .filter_map(|(kind, rows)| match rows {
                Some(rows) if !rows.is_empty() => Some(RenderedSection { kind, rows }),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Score calculation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeoScoreInput {
    /// SEO report text to score.
    pub report: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeoScore {
    /// SEO score from 0 (worst) to 100 (best).
    #[schemars(range(min = 0, max = 100))]
    pub score: f64,
}

impl SeoScore {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_score("score", self.score)
    }
}

// ---------------------------------------------------------------------------
// Performance summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummaryInput {
    /// Performance report text to summarize.
    pub performance_report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    /// A short plain-language summary of the performance report.
    pub summary: String,
}

impl PerformanceSummary {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("summary", &self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> ReportResult {
        ReportResult {
            report: "Solid basics, weak meta tags.".into(),
            score: 72.0,
            performance_report: "LCP is slow on mobile.".into(),
            performance_score: 55.0,
            ..Default::default()
        }
    }

    #[test]
    fn minimal_json_deserializes() {
        let json = json!({
            "report": "ok",
            "score": 90,
            "performanceReport": "fast",
            "performanceScore": 88.5
        });
        let result: ReportResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.score, 90.0);
        assert_eq!(result.performance_score, 88.5);
        assert!(result.on_page.is_none());
        assert!(result.sections().is_empty());
        result.validate().unwrap();
    }

    #[test]
    fn missing_required_field_fails() {
        let json = json!({ "report": "ok", "score": 90, "performanceReport": "fast" });
        assert!(serde_json::from_value::<ReportResult>(json).is_err());
    }

    #[test]
    fn serialization_omits_absent_sections() {
        let value = serde_json::to_value(minimal()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(obj.contains_key("performanceReport"));
    }

    #[test]
    fn validate_rejects_out_of_range_scores() {
        let mut r = minimal();
        r.score = 101.0;
        assert_eq!(r.validate().unwrap_err().field, "score");

        let mut r = minimal();
        r.performance_score = -1.0;
        assert_eq!(r.validate().unwrap_err().field, "performanceScore");

        let mut r = minimal();
        r.score = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_narratives() {
        let mut r = minimal();
        r.report = "  ".into();
        assert_eq!(r.validate().unwrap_err().field, "report");
    }

    #[test]
    fn validate_accepts_bounds() {
        let mut r = minimal();
        r.score = 0.0;
        r.performance_score = 100.0;
        r.validate().unwrap();
    }

    #[test]
    fn sections_follow_display_order_and_skip_empty() {
        let json = json!({
            "report": "r", "score": 50, "performanceReport": "p", "performanceScore": 50,
            "security": { "https": true },
            "onPage": { "title": "Home" },
            "headings": {},
            "recommendations": [ { "priority": "high", "text": "Add meta description" } ]
        });
        let result: ReportResult = serde_json::from_value(json).unwrap();
        let kinds: Vec<SectionKind> = result.sections().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SectionKind::Recommendations, SectionKind::OnPage, SectionKind::Security]
        );
        assert_eq!(result.sections()[1].title(), "On-Page Details");
    }

    #[test]
    fn score_bands() {
        assert_eq!(score_band(100.0), ScoreBand::Good);
        assert_eq!(score_band(80.0), ScoreBand::Good);
        assert_eq!(score_band(79.4), ScoreBand::NeedsWork);
        assert_eq!(score_band(79.6), ScoreBand::Good);
        assert_eq!(score_band(49.5), ScoreBand::NeedsWork);
        assert_eq!(score_band(50.0), ScoreBand::NeedsWork);
        assert_eq!(score_band(49.0), ScoreBand::Poor);
        assert_eq!(score_band(0.0), ScoreBand::Poor);
    }

    #[test]
    fn displayed_score_matches_its_band() {
        assert_eq!(score_text(79.6), "80");
        assert_eq!(score_band(79.6).label(), "Good");
        assert_eq!(score_text(79.5), "80");
        assert_eq!(score_band(79.5).label(), "Good");
        assert_eq!(score_text(49.4), "49");
        assert_eq!(score_band(49.4).label(), "Poor");
        assert_eq!(score_text(100.0), "100");
    }

    #[test]
    fn report_schema_lists_required_fields_only() {
        let schema = serde_json::to_value(schemars::schema_for!(ReportResult)).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in ["report", "score", "performanceReport", "performanceScore"] {
            assert!(required.contains(&field), "{field} should be required");
        }
        assert!(!required.contains(&"onPage"));
        assert!(schema["properties"]["coreWebVitals"].is_object());
    }

    #[test]
    fn seo_score_and_summary_validation() {
        SeoScore { score: 42.0 }.validate().unwrap();
        assert!(SeoScore { score: 420.0 }.validate().is_err());
        assert!(PerformanceSummary { summary: String::new() }.validate().is_err());
    }
}
