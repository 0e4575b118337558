use super::governed_call::{GovernedCall, GovernedRequest};
use super::prompt::build_insight_prompt;
use crate::domain::{AiProvider, Block, Insight, UserProfile};
use crate::infrastructure::security::{operations, ErrorClassifier, PromptSanitizer};
use aigov_errors::{AIError, GovernanceError};
use std::sync::Arc;

const MAX_OUTPUT_TOKENS: u32 = 600;
const INSIGHT_CATEGORY: &str = "schedule";

pub struct GenerateInsight {
    provider: Arc<dyn AiProvider>,
    governed: GovernedCall,
}

impl GenerateInsight {
    pub fn new(provider: Arc<dyn AiProvider>, governed: GovernedCall) -> Self {
        Self { provider, governed }
    }

    pub async fn execute(
        &self,
        identifier: &str,
        profile: &UserProfile,
        blocks: &[Block],
    ) -> Result<Insight, AIError> {
        let operation = operations::INSIGHT_GENERATION;

        if blocks.is_empty() {
            let err = GovernanceError::validation("At least one block is required to generate an insight");
            return Err(ErrorClassifier::classify(&err, operation, Some(identifier)));
        }

        let profile = PromptSanitizer::sanitize_profile(profile);
        let blocks = PromptSanitizer::sanitize_blocks(blocks);
        let prompt = build_insight_prompt(&profile, &blocks);

        let request = GovernedRequest {
            identifier,
            operation,
            prompt: &prompt,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };
        let completion = self.governed.execute(self.provider.as_ref(), &request).await?;

        let title = format!("Insight for {}", profile.display_name);
        Ok(Insight::new(title, completion.text.trim().to_string())
            .with_category(Some(INSIGHT_CATEGORY.to_string())))
    }
}
