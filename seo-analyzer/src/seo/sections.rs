// Optional structured sub-sections of an SEO report.
//
// Every field is optional: the model fills whatever it can infer and the
// view layer renders only what is present. Each section knows how to turn
// itself into label/value rows; nothing downstream inspects fields directly.

use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::traffic::TrafficData;

// ---------------------------------------------------------------------------
// Row rendering
// ---------------------------------------------------------------------------

/// A single label/value line of a rendered section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub label: String,
    pub value: String,
}

impl SectionRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        SectionRow {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Types that render as a list of rows.
pub trait SectionRows {
    fn rows(&self) -> Vec<SectionRow>;
}

fn push_opt<T: Display>(rows: &mut Vec<SectionRow>, label: &str, value: &Option<T>) {
    if let Some(v) = value {
        rows.push(SectionRow::new(label, v.to_string()));
    }
}

fn push_flag(rows: &mut Vec<SectionRow>, label: &str, value: Option<bool>) {
    if let Some(v) = value {
        rows.push(SectionRow::new(label, yes_no(v)));
    }
}

fn push_num(rows: &mut Vec<SectionRow>, label: &str, value: Option<f64>, suffix: &str) {
    if let Some(v) = value {
        rows.push(SectionRow::new(label, format!("{}{suffix}", format_number(v))));
    }
}

fn push_list(rows: &mut Vec<SectionRow>, label: &str, values: &[String]) {
    if !values.is_empty() {
        rows.push(SectionRow::new(label, values.join(", ")));
    }
}

pub(crate) fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

/// Integers print without a fractional part; everything else with two
/// decimals at most.
pub(crate) fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// ---------------------------------------------------------------------------
// Section types
// ---------------------------------------------------------------------------

/// Title, meta tags and other on-page basics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OnPageDetails {
    /// Contents of the <title> tag.
    pub title: Option<String>,
    pub title_length: Option<u32>,
    /// Contents of the meta description tag.
    pub meta_description: Option<String>,
    pub meta_description_length: Option<u32>,
    pub canonical_url: Option<String>,
    pub language: Option<String>,
    pub charset: Option<String>,
    pub favicon_present: Option<bool>,
    pub word_count: Option<u32>,
}

impl SectionRows for OnPageDetails {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Title", &self.title);
        push_opt(&mut rows, "Title length", &self.title_length);
        push_opt(&mut rows, "Meta description", &self.meta_description);
        push_opt(&mut rows, "Meta description length", &self.meta_description_length);
        push_opt(&mut rows, "Canonical URL", &self.canonical_url);
        push_opt(&mut rows, "Language", &self.language);
        push_opt(&mut rows, "Charset", &self.charset);
        push_flag(&mut rows, "Favicon", self.favicon_present);
        push_opt(&mut rows, "Word count", &self.word_count);
        rows
    }
}

/// Heading structure (H1-H6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadingStructure {
    pub h1_count: Option<u32>,
    pub h2_count: Option<u32>,
    pub h3_count: Option<u32>,
    pub h4_count: Option<u32>,
    pub h5_count: Option<u32>,
    pub h6_count: Option<u32>,
    /// Text of each H1 heading.
    pub h1_texts: Vec<String>,
    pub issues: Vec<String>,
}

impl SectionRows for HeadingStructure {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        let counts = [
            ("H1", self.h1_count),
            ("H2", self.h2_count),
            ("H3", self.h3_count),
            ("H4", self.h4_count),
            ("H5", self.h5_count),
            ("H6", self.h6_count),
        ];
        for (label, count) in counts {
            push_opt(&mut rows, label, &count);
        }
        push_list(&mut rows, "H1 text", &self.h1_texts);
        push_list(&mut rows, "Issues", &self.issues);
        rows
    }
}

/// Content quality signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentQuality {
    /// Flesch-style readability estimate, 0-100.
    pub readability_score: Option<f64>,
    pub average_sentence_length: Option<f64>,
    pub duplicate_content: Option<bool>,
    pub thin_content: Option<bool>,
    pub notes: Vec<String>,
}

impl SectionRows for ContentQuality {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_num(&mut rows, "Readability", self.readability_score, "");
        push_num(&mut rows, "Avg sentence length", self.average_sentence_length, " words");
        push_flag(&mut rows, "Duplicate content", self.duplicate_content);
        push_flag(&mut rows, "Thin content", self.thin_content);
        push_list(&mut rows, "Notes", &self.notes);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordStat {
    pub keyword: String,
    pub count: Option<u32>,
    /// Percentage of total words.
    pub density: Option<f64>,
}

/// Keyword usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordAnalysis {
    pub primary_keyword: Option<String>,
    pub keywords: Vec<KeywordStat>,
}

impl SectionRows for KeywordAnalysis {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Primary keyword", &self.primary_keyword);
        for k in &self.keywords {
            let mut detail = Vec::new();
            if let Some(c) = k.count {
                detail.push(format!("{c}x"));
            }
            if let Some(d) = k.density {
                detail.push(format!("{}%", format_number(d)));
            }
            let value = if detail.is_empty() {
                "-".to_string()
            } else {
                detail.join(", ")
            };
            rows.push(SectionRow::new(k.keyword.clone(), value));
        }
        rows
    }
}

/// Internal/external link profile of the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkAnalysis {
    pub internal_count: Option<u32>,
    pub external_count: Option<u32>,
    pub broken_count: Option<u32>,
    pub nofollow_count: Option<u32>,
    pub anchor_text_issues: Vec<String>,
}

impl SectionRows for LinkAnalysis {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Internal links", &self.internal_count);
        push_opt(&mut rows, "External links", &self.external_count);
        push_opt(&mut rows, "Broken links", &self.broken_count);
        push_opt(&mut rows, "Nofollow links", &self.nofollow_count);
        push_list(&mut rows, "Anchor text issues", &self.anchor_text_issues);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAnalysis {
    pub total: Option<u32>,
    pub missing_alt: Option<u32>,
    pub oversized: Option<u32>,
    /// Whether WebP/AVIF formats are used.
    pub modern_formats: Option<bool>,
}

impl SectionRows for ImageAnalysis {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Images", &self.total);
        push_opt(&mut rows, "Missing alt text", &self.missing_alt);
        push_opt(&mut rows, "Oversized", &self.oversized);
        push_flag(&mut rows, "Modern formats", self.modern_formats);
        rows
    }
}

/// Crawlability and indexing directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexingStatus {
    pub robots_txt_present: Option<bool>,
    pub sitemap_present: Option<bool>,
    pub sitemap_url: Option<String>,
    pub noindex: Option<bool>,
    pub canonicalized: Option<bool>,
    pub indexed_pages_estimate: Option<u64>,
}

impl SectionRows for IndexingStatus {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_flag(&mut rows, "robots.txt", self.robots_txt_present);
        push_flag(&mut rows, "Sitemap", self.sitemap_present);
        push_opt(&mut rows, "Sitemap URL", &self.sitemap_url);
        push_flag(&mut rows, "noindex", self.noindex);
        push_flag(&mut rows, "Canonicalized", self.canonicalized);
        push_opt(&mut rows, "Indexed pages (est.)", &self.indexed_pages_estimate);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityCheck {
    pub https: Option<bool>,
    pub ssl_valid: Option<bool>,
    pub hsts: Option<bool>,
    pub mixed_content: Option<bool>,
    /// Security headers detected (e.g. Content-Security-Policy).
    pub security_headers: Vec<String>,
}

impl SectionRows for SecurityCheck {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_flag(&mut rows, "HTTPS", self.https);
        push_flag(&mut rows, "Valid SSL certificate", self.ssl_valid);
        push_flag(&mut rows, "HSTS", self.hsts);
        push_flag(&mut rows, "Mixed content", self.mixed_content);
        push_list(&mut rows, "Security headers", &self.security_headers);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialPresence {
    pub open_graph: Option<bool>,
    pub twitter_card: Option<bool>,
    pub og_title: Option<String>,
    pub og_image: Option<String>,
    pub social_profiles: Vec<String>,
}

impl SectionRows for SocialPresence {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_flag(&mut rows, "Open Graph", self.open_graph);
        push_flag(&mut rows, "Twitter card", self.twitter_card);
        push_opt(&mut rows, "og:title", &self.og_title);
        push_opt(&mut rows, "og:image", &self.og_image);
        push_list(&mut rows, "Profiles", &self.social_profiles);
        rows
    }
}

/// Domain registration and authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainInfo {
    pub domain_age_years: Option<f64>,
    /// Authority estimate, 0-100.
    pub authority: Option<f64>,
    pub registrar: Option<String>,
    pub expires_on: Option<String>,
}

impl SectionRows for DomainInfo {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_num(&mut rows, "Domain age", self.domain_age_years, " years");
        push_num(&mut rows, "Authority", self.authority, "/100");
        push_opt(&mut rows, "Registrar", &self.registrar);
        push_opt(&mut rows, "Expires", &self.expires_on);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileFriendliness {
    pub viewport_meta: Option<bool>,
    pub mobile_friendly: Option<bool>,
    pub tap_targets_ok: Option<bool>,
    pub font_size_ok: Option<bool>,
}

impl SectionRows for MobileFriendliness {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_flag(&mut rows, "Viewport meta", self.viewport_meta);
        push_flag(&mut rows, "Mobile friendly", self.mobile_friendly);
        push_flag(&mut rows, "Tap targets", self.tap_targets_ok);
        push_flag(&mut rows, "Legible font sizes", self.font_size_ok);
        rows
    }
}

/// Schema.org / JSON-LD markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredData {
    pub types: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SectionRows for StructuredData {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_list(&mut rows, "Types", &self.types);
        push_list(&mut rows, "Errors", &self.errors);
        push_list(&mut rows, "Warnings", &self.warnings);
        rows
    }
}

/// Estimated Core Web Vitals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreWebVitals {
    /// Largest Contentful Paint, milliseconds.
    pub lcp_ms: Option<f64>,
    /// Interaction to Next Paint, milliseconds.
    pub inp_ms: Option<f64>,
    /// Cumulative Layout Shift (unitless).
    pub cls: Option<f64>,
    pub fcp_ms: Option<f64>,
    pub ttfb_ms: Option<f64>,
}

impl SectionRows for CoreWebVitals {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_num(&mut rows, "LCP", self.lcp_ms, " ms");
        push_num(&mut rows, "INP", self.inp_ms, " ms");
        push_num(&mut rows, "CLS", self.cls, "");
        push_num(&mut rows, "FCP", self.fcp_ms, " ms");
        push_num(&mut rows, "TTFB", self.ttfb_ms, " ms");
        rows
    }
}

/// Page weight broken down by resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResources {
    pub total_requests: Option<u32>,
    pub page_size_kb: Option<f64>,
    pub script_kb: Option<f64>,
    pub stylesheet_kb: Option<f64>,
    pub image_kb: Option<f64>,
    pub font_kb: Option<f64>,
}

impl SectionRows for PageResources {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Requests", &self.total_requests);
        push_num(&mut rows, "Page size", self.page_size_kb, " KB");
        push_num(&mut rows, "Scripts", self.script_kb, " KB");
        push_num(&mut rows, "Stylesheets", self.stylesheet_kb, " KB");
        push_num(&mut rows, "Images", self.image_kb, " KB");
        push_num(&mut rows, "Fonts", self.font_kb, " KB");
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub http_version: Option<String>,
    /// Compression scheme, e.g. "gzip" or "br".
    pub compression: Option<String>,
    pub cache_control: Option<String>,
    pub server_software: Option<String>,
    pub response_time_ms: Option<f64>,
}

impl SectionRows for ServerConfig {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "HTTP version", &self.http_version);
        push_opt(&mut rows, "Compression", &self.compression);
        push_opt(&mut rows, "Cache-Control", &self.cache_control);
        push_opt(&mut rows, "Server", &self.server_software);
        push_num(&mut rows, "Response time", self.response_time_ms, " ms");
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlStructure {
    pub length: Option<u32>,
    pub seo_friendly: Option<bool>,
    pub has_parameters: Option<bool>,
    /// Number of path segments.
    pub depth: Option<u32>,
    pub issues: Vec<String>,
}

impl SectionRows for UrlStructure {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Length", &self.length);
        push_flag(&mut rows, "SEO friendly", self.seo_friendly);
        push_flag(&mut rows, "Query parameters", self.has_parameters);
        push_opt(&mut rows, "Path depth", &self.depth);
        push_list(&mut rows, "Issues", &self.issues);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Localization {
    pub html_lang: Option<String>,
    /// hreflang values declared by the page.
    pub hreflang_tags: Vec<String>,
    pub issues: Vec<String>,
}

impl SectionRows for Localization {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "html lang", &self.html_lang);
        push_list(&mut rows, "hreflang", &self.hreflang_tags);
        push_list(&mut rows, "Issues", &self.issues);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    /// Accessibility estimate, 0-100.
    pub score: Option<f64>,
    pub issues: Vec<String>,
}

impl SectionRows for Accessibility {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_num(&mut rows, "Score", self.score, "/100");
        push_list(&mut rows, "Issues", &self.issues);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BacklinkProfile {
    pub total: Option<u64>,
    pub referring_domains: Option<u64>,
    /// Share of dofollow backlinks, 0-1.
    pub dofollow_ratio: Option<f64>,
    pub top_referrers: Vec<String>,
}

impl SectionRows for BacklinkProfile {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_opt(&mut rows, "Backlinks", &self.total);
        push_opt(&mut rows, "Referring domains", &self.referring_domains);
        if let Some(r) = self.dofollow_ratio {
            rows.push(SectionRow::new("Dofollow", format!("{}%", format_number(r * 100.0))));
        }
        push_list(&mut rows, "Top referrers", &self.top_referrers);
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Competitor {
    pub domain: String,
    /// Estimated keyword overlap, percent.
    pub keyword_overlap: Option<f64>,
    pub notes: Option<String>,
}

impl SectionRows for Vec<Competitor> {
    fn rows(&self) -> Vec<SectionRow> {
        self.iter()
            .map(|c| {
                let mut parts = Vec::new();
                if let Some(o) = c.keyword_overlap {
                    parts.push(format!("{}% overlap", format_number(o)));
                }
                if let Some(n) = &c.notes {
                    parts.push(n.clone());
                }
                let value = if parts.is_empty() {
                    "-".to_string()
                } else {
                    parts.join("; ")
                };
                SectionRow::new(c.domain.clone(), value)
            })
            .collect()
    }
}

/// Analytics and tracking setup detected on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSetup {
    pub tools: Vec<String>,
    pub tag_manager: Option<bool>,
    pub consent_banner: Option<bool>,
}

impl SectionRows for AnalyticsSetup {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = Vec::new();
        push_list(&mut rows, "Tools", &self.tools);
        push_flag(&mut rows, "Tag manager", self.tag_manager);
        push_flag(&mut rows, "Consent banner", self.consent_banner);
        rows
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: Option<String>,
    pub text: String,
}

impl SectionRows for Vec<Recommendation> {
    fn rows(&self) -> Vec<SectionRow> {
        let mut sorted: Vec<&Recommendation> = self.iter().collect();
        // High first; stable so the model's order is kept within a priority.
        sorted.sort_by_key(|r| match r.priority {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        });
        sorted
            .into_iter()
            .map(|r| {
                let label = match &r.category {
                    Some(c) => format!("[{}] {}", r.priority.label(), c),
                    None => format!("[{}]", r.priority.label()),
                };
                SectionRow::new(label, r.text.clone())
            })
            .collect()
    }
}

impl SectionRows for TrafficData {
    fn rows(&self) -> Vec<SectionRow> {
        let mut rows = vec![
            SectionRow::new("Monthly visits", self.monthly_visits.to_string()),
            SectionRow::new("Bounce rate", format!("{}%", format_number(self.bounce_rate))),
            SectionRow::new(
                "Avg. session",
                format!("{}s", format_number(self.avg_session_duration_secs)),
            ),
            SectionRow::new("Pages / session", format_number(self.pages_per_session)),
        ];
        for source in &self.top_sources {
            rows.push(SectionRow::new(
                format!("Source: {}", source.source),
                format!("{}%", format_number(source.share)),
            ));
        }
        rows
    }
}
