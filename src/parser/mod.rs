//! Single-pass tokenizer over the bracket dialect, plus the per-call scan state.
//!
//! The [`Tokenizer`] is a pull parser: it walks the input once with a single master pattern and yields
//! [`Token`]s in order, filling the gaps between recognized tokens with [`TokenKind::Text`]. It knows nothing
//! about which tag names are valid, that is the registry's job.
use std::sync::LazyLock;

use bitflags::bitflags;
use regex::{CaptureMatches, Captures, Regex};

pub mod stack;

/// Recognizes, in priority order: a line-break character, an opening tag with an optional `=attr`, a closing tag.
///
/// Attribute values are bounded to 256 characters and exclude control characters, quotes, parentheses, angle
/// brackets and square brackets.
static MASTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<br>[\r\n])",
        r#"|\[(?P<open>[A-Za-z][A-Za-z0-9]*)(?:=(?P<attr>[^\x00-\x1f\x7f"'()<>\[\]]{1,256}))?\]"#,
        r"|\[/(?P<close>[A-Za-z][A-Za-z0-9]*)\]",
    ))
    .expect("master token pattern must compile")
});

bitflags! {
    /// Mode flags that alter how the scanner treats tokens.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScanFlags: u8 {
        /// A line feed becomes `<br>`. Cleared inside whitespace-preserving tags.
        const LINE_BREAKS_TO_BR = 1 << 0;
        /// Tag tokens are echoed verbatim until the region's close token.
        const NOPARSE = 1 << 1;
        /// The noparse region belongs to an open stack entry (`[code]`); `[/noparse]` is literal inside it.
        const NOPARSE_OWNED = 1 << 2;
    }
}

impl Default for ScanFlags {
    fn default() -> Self {
        ScanFlags::LINE_BREAKS_TO_BR
    }
}

/// Mutable state threaded through one top-level render call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub flags: ScanFlags,
    /// Byte offset right after a capturing opener (bare `[url]`, `[img]`, ...). Text from here up to the matching
    /// close token is taken verbatim instead of being scanned.
    pub capture_start: Option<usize>,
}

impl ScanState {
    pub fn line_breaks_to_br(&self) -> bool {
        self.flags.contains(ScanFlags::LINE_BREAKS_TO_BR)
    }

    pub fn noparse(&self) -> bool {
        self.flags.contains(ScanFlags::NOPARSE)
    }

    pub fn set_line_breaks_to_br(&mut self, on: bool) {
        self.flags.set(ScanFlags::LINE_BREAKS_TO_BR, on);
    }

    pub fn noparse_owned(&self) -> bool {
        self.flags.contains(ScanFlags::NOPARSE | ScanFlags::NOPARSE_OWNED)
    }

    /// Entering a region records whether a stack entry owns it. Leaving clears both flags.
    pub fn set_noparse(&mut self, on: bool) {
        self.flags.set(ScanFlags::NOPARSE, on);
        if !on {
            self.flags.remove(ScanFlags::NOPARSE_OWNED);
        }
    }

    pub fn set_noparse_owned(&mut self, owned: bool) {
        self.flags.set(ScanFlags::NOPARSE_OWNED, owned);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBTag<'a> {
    /// Tag name exactly as written, without the brackets or the leading `/`.
    pub tag: &'a str,
    pub args: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    LineBreak,
    OpenBBTag(BBTag<'a>),
    CloseBBTag(BBTag<'a>),
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The exact source text of this token.
    pub span: &'a str,
    /// Byte offset of `span` in the input.
    pub start: usize,
    pub kind: TokenKind<'a>,
}

impl<'a> Token<'a> {
    /// Byte offset one past the end of this token.
    pub fn end(&self) -> usize {
        self.start + self.span.len()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TokenKind::Text)
    }

    pub fn tag_name(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::OpenBBTag(BBTag { tag, .. }) | TokenKind::CloseBBTag(BBTag { tag, .. }) => Some(tag),
            TokenKind::LineBreak | TokenKind::Text => None,
        }
    }

    pub fn args(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::OpenBBTag(BBTag { args, .. }) => args,
            _ => None,
        }
    }

    pub fn is_open(&self, tag: &str) -> bool {
        matches!(self.kind, TokenKind::OpenBBTag(t) if t.tag.eq_ignore_ascii_case(tag))
    }

    pub fn is_open_argless(&self, tag: &str) -> bool {
        matches!(self.kind, TokenKind::OpenBBTag(t) if t.tag.eq_ignore_ascii_case(tag) && t.args.is_none())
    }

    pub fn is_close(&self, tag: &str) -> bool {
        matches!(self.kind, TokenKind::CloseBBTag(t) if t.tag.eq_ignore_ascii_case(tag))
    }
}

#[doc(alias = "parser")]
pub struct Tokenizer<'a> {
    input: &'a str,
    loc: usize,
    matches: CaptureMatches<'static, 'a>,
    /// A tag token found past a run of text, handed out on the following call.
    pending: Option<Token<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Self {
            input,
            loc: 0,
            matches: MASTER_PATTERN.captures_iter(input),
            pending: None,
        }
    }

    /// Returns all input text not yet handed out as a token.
    pub fn remaining(&self) -> &'a str {
        match self.pending {
            Some(tk) => &self.input[tk.start..],
            None => &self.input[self.loc..],
        }
    }

    fn to_token(caps: &Captures<'a>) -> Option<Token<'a>> {
        let whole = caps.get(0)?;
        let kind = if caps.name("br").is_some() {
            TokenKind::LineBreak
        } else if let Some(tag) = caps.name("open") {
            TokenKind::OpenBBTag(BBTag {
                tag: tag.as_str(),
                args: caps.name("attr").map(|a| a.as_str()),
            })
        } else {
            let tag = caps.name("close")?;
            TokenKind::CloseBBTag(BBTag {
                tag: tag.as_str(),
                args: None,
            })
        };

        Some(Token {
            span: whole.as_str(),
            start: whole.start(),
            kind,
        })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tk) = self.pending.take() {
            return Some(tk);
        }

        let Some(token) = self.matches.next().and_then(|caps| Self::to_token(&caps)) else {
            if self.loc >= self.input.len() {
                return None;
            }
            let start = self.loc;
            self.loc = self.input.len();
            return Some(Token {
                span: &self.input[start..],
                start,
                kind: TokenKind::Text,
            });
        };

        let gap = self.loc..token.start;
        self.loc = token.end();
        if gap.is_empty() {
            return Some(token);
        }

        self.pending = Some(token);
        Some(Token {
            span: &self.input[gap.clone()],
            start: gap.start,
            kind: TokenKind::Text,
        })
    }
}
