// Report generation: one model call produces the whole `ReportResult`,
// narratives and scores included.

use super::Flow;
use crate::llm::prompt::generate_report_prompt;
use crate::llm::tools::ToolSet;
use crate::protocol::FlowKind;
use crate::seo::report::{ReportResult, ValidationError};
use crate::seo::request::ReportRequest;
use crate::seo::traffic::TrafficTool;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateReport;

impl Flow for GenerateReport {
    type Input = ReportRequest;
    type Output = ReportResult;

    fn kind(&self) -> FlowKind {
        FlowKind::GenerateReport
    }

    fn prompt(&self, input: &ReportRequest) -> String {
        generate_report_prompt(input)
    }

    fn tools(&self) -> ToolSet {
        ToolSet::new().with(TrafficTool)
    }

    fn validate(&self, output: &ReportResult) -> Result<(), ValidationError> {
        output.validate()
    }

    fn respond_description(&self) -> &'static str {
        "Return the complete SEO analysis: report, score, performanceReport, \
         performanceScore and every optional section you could fill."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_the_traffic_tool() {
        let flow = GenerateReport;
        assert!(flow.tools().contains("get_traffic_data"));
        assert_eq!(flow.kind().name(), "generate_seo_report");
    }

    #[test]
    fn prompt_carries_the_url() {
        let req = ReportRequest::new("https://blog.example.org/post").unwrap();
        assert!(GenerateReport.prompt(&req).contains("https://blog.example.org/post"));
    }
}
