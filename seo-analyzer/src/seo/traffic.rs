// Mock traffic-data tool.
//
// There is no analytics backend behind this. Figures are derived from the
// host name, so the same site always gets the same numbers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::tools::{Tool, ToolDefinition, ToolError};
use crate::seo::request::ReportRequest;

pub const TRAFFIC_TOOL_NAME: &str = "get_traffic_data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficDataInput {
    /// URL of the site to look up.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSource {
    /// Channel name, e.g. "organic" or "direct".
    pub source: String,
    /// Share of visits in percent.
    pub share: f64,
}

/// Site traffic figures, as returned by the traffic tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficData {
    pub monthly_visits: u64,
    /// Percentage of single-page sessions.
    pub bounce_rate: f64,
    pub avg_session_duration_secs: f64,
    pub pages_per_session: f64,
    #[serde(default)]
    pub top_sources: Vec<TrafficSource>,
}

/// Produce traffic figures for the host of `request`.
pub fn get_traffic_data(request: &ReportRequest) -> TrafficData {
    let host = request.host();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let h = fnv1a(host.as_bytes());

    let monthly_visits = 1_000 + (h % 2_500_000);
    let bounce_rate = 25.0 + ((h >> 8) % 5_000) as f64 / 100.0;
    let avg_session_duration_secs = 30.0 + ((h >> 20) % 300) as f64;
    let pages_per_session = 1.2 + ((h >> 32) % 50) as f64 / 10.0;

    // Organic 30-59%, direct 10-24%, social 0-9%, referral takes the rest.
    let organic = 30 + (h >> 40) % 30;
    let direct = 10 + (h >> 48) % 15;
    let social = (h >> 56) % 10;
    let referral = 100 - organic - direct - social;

    let top_sources = [
        ("organic", organic),
        ("direct", direct),
        ("referral", referral),
        ("social", social),
    ]
    .into_iter()
    .map(|(source, share)| TrafficSource {
        source: source.to_string(),
        share: share as f64,
    })
    .collect();

    TrafficData {
        monthly_visits,
        bounce_rate,
        avg_session_duration_secs,
        pages_per_session,
        top_sources,
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

// ---------------------------------------------------------------------------
// Tool adapter
// ---------------------------------------------------------------------------

/// Exposes [`get_traffic_data`] to the model.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrafficTool;

impl Tool for TrafficTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::for_input::<TrafficDataInput>(
            TRAFFIC_TOOL_NAME,
            "Look up monthly visits, bounce rate, session length, pages per session \
             and traffic-source shares for a website URL.",
        )
    }

    fn call(&self, input: Value) -> Result<Value, ToolError> {
        let input: TrafficDataInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let request =
            ReportRequest::new(&input.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let data = get_traffic_data(&request);
        debug!(url = %request.url, visits = data.monthly_visits, "traffic tool called");
        serde_json::to_value(data).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
