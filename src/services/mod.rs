pub mod credentials; // Provider + API key resolution
pub mod gemini;
pub mod huggingface;
pub mod macros; // Approximate macros per 100 g
pub mod normalizer;
pub mod openai; // OpenAI and OpenAI-compatible chat APIs
pub mod prompt;
pub mod provider;

pub use credentials::CredentialResolver;
pub use prompt::Prompt;
