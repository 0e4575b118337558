mod generate_insight;
mod governed_call;
mod prompt;
mod summarize_reflection;

#[cfg(test)]
mod test_support;

pub use generate_insight::GenerateInsight;
pub use governed_call::{GovernedCall, GovernedRequest};
pub use prompt::{build_insight_prompt, build_reflection_prompt, estimate_tokens};
pub use summarize_reflection::SummarizeReflection;
