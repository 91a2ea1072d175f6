pub mod reasoning;
pub mod stats;

pub use reasoning::{LlmReasoner, ReasoningContext, ReasoningGenerator, ReasoningRequest, TemplateReasoner};
pub use stats::{compute_stats, Stats};
