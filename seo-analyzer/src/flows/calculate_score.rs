// Score calculation: rate an existing report text on a 0-100 scale.

use super::Flow;
use crate::llm::prompt::calculate_score_prompt;
use crate::protocol::FlowKind;
use crate::seo::report::{SeoScore, SeoScoreInput, ValidationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculateScore;

impl Flow for CalculateScore {
    type Input = SeoScoreInput;
    type Output = SeoScore;

    fn kind(&self) -> FlowKind {
        FlowKind::CalculateScore
    }

    fn prompt(&self, input: &SeoScoreInput) -> String {
        calculate_score_prompt(&input.report)
    }

    fn validate(&self, output: &SeoScore) -> Result<(), ValidationError> {
        output.validate()
    }

    fn respond_description(&self) -> &'static str {
        "Return the SEO score for the report."
    }
}
