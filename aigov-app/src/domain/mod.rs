mod block;
mod completion;
mod insight;
mod profile;

pub use block::Block;
pub use completion::{AiProvider, Completion, TokenUsage};
pub use insight::Insight;
pub use profile::UserProfile;
