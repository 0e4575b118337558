#[cfg(feature = "openrouter")]
pub mod openrouter;

pub mod security;
