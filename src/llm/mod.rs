pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;

pub use provider::LlmProvider;
pub use registry::{ProviderRegistry, ProviderSource};
pub use types::{ChatMessage, GenerationOptions, ProviderKind, Role};
