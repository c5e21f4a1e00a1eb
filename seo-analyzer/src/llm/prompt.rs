// Prompt templates for report generation, score calculation and performance
// summaries.
//
// Each flow has one fixed template. The output shape itself is carried by the
// `respond` tool schema, so the templates describe what to put in the fields
// rather than the JSON layout.

use crate::seo::request::ReportRequest;
use crate::seo::traffic::TRAFFIC_TOOL_NAME;

/// Name of the tool through which every flow returns its structured output.
pub const RESPOND_TOOL_NAME: &str = "respond";

/// Optional report sections, as `(wire field, what to cover)`.
const REPORT_SECTIONS: &[(&str, &str)] = &[
    ("onPage", "title, meta description, canonical URL, robots meta, language"),
    ("headings", "H1-H3 counts, the H1 text, hierarchy problems"),
    ("content", "word count, readability, duplicate or thin content"),
    ("keywords", "primary keyword, top keywords with density"),
    ("links", "internal, external and broken link counts"),
    ("images", "image count, missing alt text, oversized images"),
    ("indexing", "indexability, sitemap, robots.txt"),
    ("security", "HTTPS, HSTS, mixed content"),
    ("social", "Open Graph and Twitter card tags, social profiles"),
    ("traffic", "the figures returned by the traffic tool"),
    ("domain", "domain age, registrar, expiry"),
    ("mobile", "viewport, tap targets, font sizes"),
    ("structuredData", "schema.org types present, validation errors"),
    ("coreWebVitals", "LCP, INP, CLS, FCP and TTFB estimates"),
    ("pageResources", "page weight, request counts, render-blocking resources"),
    ("server", "server software, compression, caching, HTTP version"),
    ("urlStructure", "length, readability, parameters"),
    ("localization", "hreflang, declared languages"),
    ("accessibility", "contrast, ARIA usage, form labels"),
    ("backlinks", "referring domains, total backlinks, authority"),
    ("competitors", "a few competing domains with a short note each"),
    ("analytics", "analytics and tag-manager tools detected"),
    ("recommendations", "prioritized fixes (high, medium, low) with a category"),
];

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Return the static system prompt shared by all flows.
pub fn system_prompt() -> String {
    format!(
        "You are an expert SEO consultant and web performance engineer.\n\
         \n\
         You assess websites for search visibility and page performance and explain \
         findings in plain, specific language a site owner can act on.\n\
         \n\
         Rules:\n\
         - Scores are numbers from 0 (worst) to 100 (best).\n\
         - Prefer concrete observations over generic advice.\n\
         - When you are estimating rather than observing, say so in the text.\n\
         - Always deliver your final answer by calling the `{RESPOND_TOOL_NAME}` tool. \
         Do not put the answer in plain text."
    )
}

// ---------------------------------------------------------------------------
// Report generation
// ---------------------------------------------------------------------------

/// Build the one-shot report prompt for `request`.
///
/// The model is asked for both narratives and both scores at once, plus any
/// optional sections it can fill. Traffic figures must come from the traffic
/// tool.
pub fn generate_report_prompt(request: &ReportRequest) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(&format!(
        "## SITE\n\
         URL: {}\n\
         Host: {}\n\n",
        request.url,
        request.host(),
    ));

    prompt.push_str(
        "## REQUIRED\n\
         - report: a thorough SEO report for this page (markdown allowed)\n\
         - score: overall SEO score, 0-100\n\
         - performanceReport: a page performance report covering load speed and \
         Core Web Vitals\n\
         - performanceScore: overall performance score, 0-100\n\n",
    );

    prompt.push_str("## OPTIONAL SECTIONS (include every one you can fill)\n");
    for (field, hint) in REPORT_SECTIONS {
        prompt.push_str(&format!("- {field}: {hint}\n"));
    }
    prompt.push('\n');

    prompt.push_str(&format!(
        "## TOOLS\n\
         Call `{TRAFFIC_TOOL_NAME}` with the URL above before filling the traffic \
         section, and copy its figures into `traffic` unchanged.\n\n"
    ));

    prompt.push_str(&format!(
        "Analyze the site and return the full result with `{RESPOND_TOOL_NAME}`."
    ));

    prompt
}

// ---------------------------------------------------------------------------
// Score calculation
// ---------------------------------------------------------------------------

/// Build a prompt asking for a single score for an existing report.
pub fn calculate_score_prompt(report: &str) -> String {
    format!(
        "## SEO REPORT\n\
         {}\n\n\
         ## TASK\n\
         Read the SEO report above and rate the site's overall SEO health as one \
         score from 0 to 100. Weigh critical issues (indexing, security, missing \
         titles) more heavily than cosmetic ones.\n\
         Return the score with `{RESPOND_TOOL_NAME}`.",
        report.trim()
    )
}

// ---------------------------------------------------------------------------
// Performance summary
// ---------------------------------------------------------------------------

/// Build a prompt asking for a short summary of a performance report.
pub fn summarize_performance_prompt(performance_report: &str) -> String {
    format!(
        "## PERFORMANCE REPORT\n\
         {}\n\n\
         ## TASK\n\
         Summarize the performance report above in three to five sentences for a \
         non-technical site owner. Lead with the biggest problem and end with the \
         single most valuable fix.\n\
         Return the summary with `{RESPOND_TOOL_NAME}`.",
        performance_report.trim()
    )
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
