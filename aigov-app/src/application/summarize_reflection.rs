use super::governed_call::{GovernedCall, GovernedRequest};
use super::prompt::build_reflection_prompt;
use crate::domain::AiProvider;
use crate::infrastructure::security::{limits, operations, ErrorClassifier, PromptSanitizer};
use aigov_errors::{AIError, GovernanceError};
use serde_json::Value;
use std::sync::Arc;

const MAX_OUTPUT_TOKENS: u32 = 300;
const FIELD: &str = "reflection";

/// Reflections are rejected outright on any injection attempt rather than
/// filtered. Input arrives as loosely typed JSON: `null` counts as blank and
/// any other non-string is a validation error.
pub struct SummarizeReflection {
    provider: Arc<dyn AiProvider>,
    governed: GovernedCall,
}

impl SummarizeReflection {
    pub fn new(provider: Arc<dyn AiProvider>, governed: GovernedCall) -> Self {
        Self { provider, governed }
    }

    pub async fn execute(&self, identifier: &str, reflection: &Value) -> Result<String, AIError> {
        let operation = operations::REFLECTION_SUMMARY;
        let classify = |err: GovernanceError| ErrorClassifier::classify(&err, operation, Some(identifier));

        if let Value::String(raw) = reflection {
            PromptSanitizer::validate_prompt_safety(raw, FIELD).map_err(classify)?;
        }
        let sanitized =
            PromptSanitizer::sanitize_json_field(reflection, limits::REFLECTION, FIELD).map_err(classify)?;
        if sanitized.is_empty() {
            return Err(classify(GovernanceError::validation("Reflection must not be empty")));
        }

        let prompt = build_reflection_prompt(&sanitized);

        let request = GovernedRequest {
            identifier,
            operation,
            prompt: &prompt,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };
        let completion = self.governed.execute(self.provider.as_ref(), &request).await?;
        Ok(completion.text.trim().to_string())
    }
}
