//! BBCode to safe HTML for user-submitted forum and fiddle content.
//!
//! ```
//! let html = bbfiddle::render("[b]bold[/b] <script>");
//! assert_eq!(html, "<strong>bold</strong> &lt;script&gt;");
//! ```
//!
//! Raw HTML is neutralized by escaping `<` and `>`, bare URLs become links, `[code]`/`[noparse]` bodies are
//! never interpreted, and mismatched close tags are flagged inline instead of dropped.
use std::sync::LazyLock;

pub mod autolink;
pub mod config;
mod error;
pub mod html;
mod parser;

pub use config::{ConfigError, RenderConfig};
pub use error::Error;
pub use html::{HandlerOutcome, OpenTag, Renderer, TagHandler, TagRegistry};
pub use parser::stack::{Capture, OpenTagEntry, OpenTagStack};
pub use parser::{BBTag, ScanFlags, ScanState, Token, TokenKind, Tokenizer};

static DEFAULT_RENDERER: LazyLock<Renderer> =
    LazyLock::new(|| Renderer::new(RenderConfig::default()).expect("default configuration must be valid"));

/// Render `text` with the default configuration.
pub fn render(text: &str) -> String {
    DEFAULT_RENDERER.render(text)
}
