use super::Flow;
use crate::llm::prompt::summarize_performance_prompt;
use crate::protocol::FlowKind;
use crate::seo::report::{PerformanceSummary, PerformanceSummaryInput, ValidationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizePerformance;

impl Flow for SummarizePerformance {
    type Input = PerformanceSummaryInput;
    type Output = PerformanceSummary;

    fn kind(&self) -> FlowKind {
        FlowKind::SummarizePerformance
    }

    fn prompt(&self, input: &PerformanceSummaryInput) -> String {
        summarize_performance_prompt(&input.performance_report)
    }

    fn validate(&self, output: &PerformanceSummary) -> Result<(), ValidationError> {
        output.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_summary_fails_validation() {
        let out = PerformanceSummary { summary: " ".into() };
        assert!(SummarizePerformance.validate(&out).is_err());
    }
}
