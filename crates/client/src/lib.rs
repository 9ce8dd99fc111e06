//! Network collaborators for sleuth.
//!
//! This crate provides the search providers, the text-generation client,
//! headless page rendering, and HTML text extraction used by the engine.

pub mod brave;
pub mod duckduckgo;
pub mod extract;
pub mod llm;
pub mod provider;
pub mod render;
pub mod searxng;
pub mod url;

pub use brave::{BraveClient, BraveConfig, BraveError};
pub use duckduckgo::{DuckDuckGoClient, DuckDuckGoConfig};
pub use extract::{ExtractedText, extract_text};
pub use llm::{ChatClient, ChatConfig, GenerationError, GenerationOptions, TextGenerator};
pub use provider::{ProviderError, SearchProvider};
#[cfg(feature = "render")]
pub use render::ChromiumLauncher;
pub use render::{
    BrowserLauncher, DisabledLauncher, GuardError, RenderError, RenderOptions, RenderedPage, Renderer, check_navigable,
};
pub use searxng::{SearxngClient, SearxngConfig};
pub use self::url::{UrlError, canonicalize, dedup_key};
