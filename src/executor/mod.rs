pub mod dispatcher;
pub mod draft;
pub mod prompts;

pub use dispatcher::{ActionDispatcher, DispatchOutcome, DispatchRecord};
pub use draft::DraftOutcome;
pub use prompts::{BuiltinTransform, ComposeMode};
