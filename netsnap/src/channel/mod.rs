//! Prompt-aware buffering on top of a [`Transport`](crate::transport::Transport).

pub mod buffer;
mod expect;
pub mod patterns;

pub use buffer::PatternBuffer;
pub use expect::{Channel, ExpectMatch};
pub use patterns::{CompiledPrompt, PromptMatch, PromptMatcher, compile_pattern, compile_text_pattern};
