// starmap-llm - Text-generation backends and the batch categorizer
//
// A batch is dispatched to the primary backend first. Parse failures,
// transport failures and timeouts each trigger exactly one retry against the
// fallback backend; if that also fails the batch contributes nothing.

mod backend;
mod categorizer;
mod error;
mod openai;
mod prompt;

pub use backend::ChatBackend;
pub use categorizer::{BatchCategorizer, CategorizerConfig};
pub use error::{BackendError, DispatchError};
pub use openai::OpenAiBackend;
pub use prompt::build_prompt;
