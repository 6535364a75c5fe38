//! Bookkeeping for currently open tags.

/// How a capturing tag turns its raw body into HTML once it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Attribute-less `[url]`/`[link]`: the body is both the target and the visible text.
    BareLink { new_window: bool },
    /// `[img]` without a usable attribute: the body is the image source.
    ImageSource,
    /// `[img=src]`: the body is the alternative text.
    ImageAlt { src: String },
    /// `[fiddle]`/`[issue]`: the body is an identifier appended to `src_prefix`.
    Embed { class: &'static str, src_prefix: String },
}

/// One currently open tag instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTagEntry {
    /// Lower-cased tag name as opened.
    pub tag_name: String,
    /// HTML emitted when this tag closes, fixed at open time.
    pub closing_markup: String,
    /// Body is captured verbatim and rendered by this rule on close.
    pub capture: Option<Capture>,
    /// Line breaks inside this tag are kept as-is rather than turned into `<br>`.
    pub preserves_whitespace: bool,
}

impl OpenTagEntry {
    pub fn new(tag_name: impl Into<String>, closing_markup: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            closing_markup: closing_markup.into(),
            capture: None,
            preserves_whitespace: false,
        }
    }

    pub fn capturing(mut self, capture: Capture) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn preserving_whitespace(mut self) -> Self {
        self.preserves_whitespace = true;
        self
    }
}

/// LIFO stack of open tags. The top is always the most recently opened, not yet closed tag.
#[derive(Debug, Default, Clone)]
pub struct OpenTagStack {
    entries: Vec<OpenTagEntry>,
}

impl OpenTagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: OpenTagEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<OpenTagEntry> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&OpenTagEntry> {
        self.entries.last()
    }

    /// Removes the innermost entry named `tag_name`, wherever it sits in the stack.
    pub fn take_by_tag_name(&mut self, tag_name: &str) -> Option<OpenTagEntry> {
        let idx = self.entries.iter().rposition(|e| e.tag_name.eq_ignore_ascii_case(tag_name))?;
        Some(self.entries.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any open tag keeps its line breaks verbatim.
    pub fn preserves_whitespace(&self) -> bool {
        self.entries.iter().any(|e| e.preserves_whitespace)
    }
}
