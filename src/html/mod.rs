//! BBCode to HTML rendering.
//!
//! [`Renderer::render`] runs the whole pipeline: `<`/`>` escaping, the autolink preprocessor, then a single
//! scan over the [`Tokenizer`]'s output that dispatches tags to [`TagHandler`]s and keeps an [`OpenTagStack`].
//! Malformed markup is never an error. A close token that does not match the innermost open tag is flagged
//! inline with a red marker and anything still open at the end is closed automatically.
use std::borrow::Cow;
use std::sync::Arc;

use static_assertions::{assert_impl_all, assert_obj_safe};

use crate::autolink::{self, Autolinker, UrlAutolinker};
use crate::config::RenderConfig;
use crate::parser::stack::{OpenTagEntry, OpenTagStack};
use crate::parser::{BBTag, ScanState, Token, TokenKind, Tokenizer};
use crate::Error;

pub mod builtins;
pub mod registry;

pub use registry::TagRegistry;

/// An opening tag as seen by a [`TagHandler`].
#[derive(Debug, Clone, Copy)]
pub struct OpenTag<'a> {
    /// Lower-cased tag name.
    pub name: &'a str,
    /// Raw attribute text after `=`, if any.
    pub args: Option<&'a str>,
}

/// What a handler produced for an opening tag, and how the scan mode changes for its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub html: String,
    pub line_breaks_to_br: Option<bool>,
    pub noparse: Option<bool>,
    /// Capture the raw body up to the matching close token instead of scanning it.
    pub capture: bool,
}

impl HandlerOutcome {
    pub fn with_line_breaks_to_br(mut self, on: bool) -> Self {
        self.line_breaks_to_br = Some(on);
        self
    }

    pub fn with_noparse(mut self, on: bool) -> Self {
        self.noparse = Some(on);
        self
    }

    pub fn capturing(mut self) -> Self {
        self.capture = true;
        self
    }
}

impl From<String> for HandlerOutcome {
    fn from(html: String) -> Self {
        Self {
            html,
            ..Default::default()
        }
    }
}

impl From<&str> for HandlerOutcome {
    fn from(html: &str) -> Self {
        html.to_owned().into()
    }
}

/// The primary trait for converting an opening BBCode tag to HTML.
pub trait TagHandler: Send + Sync {
    /// Produce the opening markup for `tag`.
    /// # Remarks
    /// The handler decides whether the tag gets a stack entry, and pushes it itself. The entry's closing markup
    /// is what the renderer emits when the tag closes, so it must be fully determined here.
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome;
}

assert_obj_safe!(TagHandler);

/// Escape the two characters that could open raw HTML. Everything else, `&` included, passes through.
pub fn escape_angle_brackets(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Prepare already-escaped text for a double-quoted HTML attribute without double-escaping entities.
pub fn attribute_value(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    html_escape::encode_double_quoted_attribute(&decoded).into_owned()
}

/// Renders BBCode to HTML. Cheap to share: every [`render`](Renderer::render) call keeps its own scan state.
pub struct Renderer {
    config: RenderConfig,
    registry: TagRegistry,
    autolinker: Arc<dyn Autolinker>,
}

assert_impl_all!(Renderer: Send, Sync);

impl Renderer {
    /// Construct a renderer with the default URL autolinker.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RenderConfig) -> Result<Self, Error> {
        Self::with_autolinker(config, Arc::new(UrlAutolinker::default()))
    }

    /// Construct a renderer that detects links with `autolinker`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the tag matcher fails to compile.
    pub fn with_autolinker(config: RenderConfig, autolinker: Arc<dyn Autolinker>) -> Result<Self, Error> {
        config.validate()?;
        let registry = TagRegistry::with_dynamic(&config)?;
        Ok(Self {
            config,
            registry,
            autolinker,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Render `text` to HTML. Empty input comes back unchanged.
    pub fn render(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let escaped = escape_angle_brackets(text);
        let folded = autolink::fold_fiddle_permalinks(&escaped);
        let linked = autolink::autolink(&folded, self.autolinker.as_ref(), &self.config.autolink);
        let listed = autolink::expand_list_items(&linked);

        self.scan(&listed)
    }

    /// Run the tag scan alone over text that is already escaped and preprocessed.
    pub fn scan(&self, input: &str) -> String {
        let mut scan = Scan::new(&self.registry, input);
        for token in Tokenizer::new(input) {
            scan.step(token);
        }
        scan.finish()
    }
}

/// One scan over one input. Owns the output buffer, the open-tag stack and the mode flags.
struct Scan<'r, 'a> {
    registry: &'r TagRegistry,
    input: &'a str,
    out: String,
    stack: OpenTagStack,
    state: ScanState,
}

impl<'r, 'a> Scan<'r, 'a> {
    fn new(registry: &'r TagRegistry, input: &'a str) -> Self {
        Self {
            registry,
            input,
            out: String::with_capacity(input.len()),
            stack: OpenTagStack::new(),
            state: ScanState::default(),
        }
    }

    fn step(&mut self, token: Token<'a>) {
        if let Some(start) = self.state.capture_start {
            // Everything up to the capturing tag's own close is body text, tags included.
            if let TokenKind::CloseBBTag(BBTag { tag, .. }) = token.kind {
                if self.stack.peek().is_some_and(|top| top.tag_name.eq_ignore_ascii_case(tag)) {
                    self.close_capture(start, token.start);
                }
            }
            return;
        }

        match token.kind {
            TokenKind::LineBreak => self.line_break(token),
            TokenKind::OpenBBTag(_) if self.state.noparse() => self.out.push_str(token.span),
            TokenKind::OpenBBTag(tag) => self.open_tag(token, tag),
            TokenKind::CloseBBTag(tag) if self.state.noparse() => self.noparse_close(token, tag),
            TokenKind::CloseBBTag(tag) => self.close_tag(token, tag),
            TokenKind::Text => self.out.push_str(token.span),
        }
    }

    fn line_break(&mut self, token: Token<'a>) {
        if token.span == "\r" {
            return;
        }
        if self.state.line_breaks_to_br() {
            self.out.push_str("<br>");
        } else {
            self.out.push_str(token.span);
        }
    }

    fn open_tag(&mut self, token: Token<'a>, tag: BBTag<'a>) {
        if !self.registry.is_valid(tag.tag) {
            self.out.push_str(token.span);
            return;
        }

        let name = tag.tag.to_ascii_lowercase();
        let depth = self.stack.len();
        let outcome = self.registry.handler(&name).open(
            &OpenTag {
                name: &name,
                args: tag.args,
            },
            &mut self.stack,
        );

        self.out.push_str(&outcome.html);
        if let Some(on) = outcome.line_breaks_to_br {
            self.state.set_line_breaks_to_br(on);
        }
        if let Some(on) = outcome.noparse {
            self.state.set_noparse(on);
            self.state.set_noparse_owned(on && self.stack.len() > depth);
        }
        if outcome.capture {
            self.state.capture_start = Some(token.end());
        }
    }

    fn close_tag(&mut self, token: Token<'a>, tag: BBTag<'a>) {
        if !self.registry.is_valid(tag.tag) {
            self.out.push_str(token.span);
            return;
        }

        if tag.tag.eq_ignore_ascii_case("noparse") {
            // Noparse regions have no stack entry; a stray close just makes sure the mode is off.
            self.state.set_noparse(false);
            return;
        }

        let matches_top = self.stack.peek().is_some_and(|top| top.tag_name.eq_ignore_ascii_case(tag.tag));
        if !matches_top {
            tracing::debug!(tag = tag.tag, offset = token.start, "mismatched close tag");
            self.out.push_str("<span style=\"color: red\">");
            self.out.push_str(token.span);
            self.out.push_str("</span>");
            return;
        }

        if let Some(entry) = self.stack.pop() {
            self.emit_close(entry);
        }
    }

    fn noparse_close(&mut self, token: Token<'a>, tag: BBTag<'a>) {
        if tag.tag.eq_ignore_ascii_case("noparse") {
            if self.state.noparse_owned() {
                self.out.push_str(token.span);
            } else {
                self.state.set_noparse(false);
            }
            return;
        }

        // Any open tag of this name ends the region, not only the innermost one.
        match self.stack.take_by_tag_name(tag.tag) {
            Some(entry) => {
                self.state.set_noparse(false);
                self.emit_close(entry);
            }
            None => self.out.push_str(token.span),
        }
    }

    fn emit_close(&mut self, entry: OpenTagEntry) {
        self.out.push_str(&entry.closing_markup);
        if entry.preserves_whitespace {
            self.state.set_line_breaks_to_br(!self.stack.preserves_whitespace());
        }
    }

    fn close_capture(&mut self, start: usize, end: usize) {
        self.state.capture_start = None;
        let input = self.input;
        if let Some(entry) = self.stack.pop() {
            let body = &input[start..end];
            self.out.push_str(&builtins::render_capture(&entry, body));
        }
    }

    fn finish(mut self) -> String {
        if self.state.noparse() {
            tracing::trace!("unterminated noparse region");
            self.state.set_noparse(false);
        }

        if let Some(start) = self.state.capture_start {
            self.close_capture(start, self.input.len());
        }

        if !self.stack.is_empty() {
            tracing::debug!(open = self.stack.len(), "closing unterminated tags");
        }
        while let Some(entry) = self.stack.pop() {
            self.out.push_str(&entry.closing_markup);
        }

        self.out
    }
}

#[cfg(test)]
mod tests;
