mod ai_error;
mod governance_error;
mod rate_limit_error;

pub use ai_error::{AIError, AIErrorType};
pub use governance_error::GovernanceError;
pub use rate_limit_error::RateLimitError;
