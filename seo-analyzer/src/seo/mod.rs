// SEO domain types: request validation, report contracts, report sections,
// the mock traffic tool, and Markdown export.

pub mod markdown;
pub mod report;
pub mod request;
pub mod sections;
pub mod traffic;
