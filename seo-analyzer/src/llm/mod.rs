// Claude API access: streaming client, tool definitions and prompt templates.

pub mod client;
pub mod prompt;
pub mod tools;
