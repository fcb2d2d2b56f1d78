//! Generation backends.

pub mod gemini;
pub mod generic_rest;
pub mod mock;
pub mod router;

pub use gemini::{GeminiClient, GeminiConfig, GEMINI_API_KEY_ENV};
pub use generic_rest::GenericRestClient;
pub use mock::{CallEvent, MockGenerationClient, MockReply};
pub use router::ProviderRouter;
