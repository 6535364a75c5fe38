//! Built-in tag handlers.
//!
//! Every handler degrades malformed attributes to a safe default instead of failing: an unknown color becomes
//! `inherit`, a non-numeric size becomes `1`, and an unusable URI switches `url`/`img` to taking their target from
//! the tag body.
use std::sync::LazyLock;

use regex::Regex;

use super::{attribute_value, HandlerOutcome, OpenTag, TagHandler};
use crate::parser::stack::{Capture, OpenTagEntry, OpenTagStack};

/// Characters allowed in a link or image target, behind an explicit scheme or a site-relative start.
static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:https?|ftp)://|/|#)[-A-Za-z0-9._~:/?#@!$&*+,;=%()]*$").expect("URI pattern must compile")
});

static HEX_COLOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("hex color pattern must compile")
});

static EMBED_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("embed id pattern must compile"));

const COLOR_KEYWORDS: &[&str] = &[
    "aqua", "black", "blue", "brown", "cyan", "darkblue", "darkgreen", "darkred", "fuchsia", "gold", "gray", "green",
    "grey", "indigo", "lime", "magenta", "maroon", "navy", "olive", "orange", "pink", "purple", "red", "silver",
    "teal", "violet", "white", "yellow",
];

pub fn is_valid_uri(uri: &str) -> bool {
    URI_PATTERN.is_match(uri)
}

impl<T: SimpleHtmlTag + Send + Sync> TagHandler for T {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let entry = OpenTagEntry::new(tag.name, Self::HTML_CLOSE);
        if Self::PRESERVES_WHITESPACE {
            stack.push(entry.preserving_whitespace());
            HandlerOutcome::from(Self::HTML_OPEN).with_line_breaks_to_br(false)
        } else {
            stack.push(entry);
            Self::HTML_OPEN.into()
        }
    }
}

/// A tag with fixed markup that ignores its attribute.
pub trait SimpleHtmlTag {
    const HTML_OPEN: &'static str;

    const HTML_CLOSE: &'static str;

    /// Keep line breaks verbatim in the body.
    const PRESERVES_WHITESPACE: bool = false;
}

macro_rules! simple_tag {
    ($doc:expr, $name:ident, $open:expr, $close:expr $(, $preserve:expr)?) => {
        #[derive(Copy, Clone, Debug, Default)]
        #[doc = $doc]
        #[doc = "# Exact output"]
        #[doc = "```html"]
        #[doc = $open]
        #[doc = " contents"]
        #[doc = $close]
        #[doc = "```"]
        pub struct $name;

        impl SimpleHtmlTag for $name {
            const HTML_OPEN: &'static str = $open;
            const HTML_CLOSE: &'static str = $close;
            $(const PRESERVES_WHITESPACE: bool = $preserve;)?
        }
    };
}

simple_tag! {
    "Bold, as HTML5 `<strong>`.",
    BoldTag, "<strong>", "</strong>"
}
simple_tag! {
    "Italic, as HTML5 `<em>`.",
    ItalicTag, "<em>", "</em>"
}
simple_tag! {
    "Strikethrough.",
    StrikeTag, "<span style=\"text-decoration: line-through\">", "</span>"
}
simple_tag! {
    "Underline.",
    UnderlineTag, "<span style=\"text-decoration: underline\">", "</span>"
}
simple_tag! {
    "Centered block. Line breaks in the body are kept as written.",
    CenterTag, "<div style=\"text-align:center\">", "</div>", true
}
simple_tag! {
    "Preformatted block. Line breaks in the body are kept as written.",
    PreTag, "<pre>", "</pre>", true
}

/// Fallback for registered tags without special semantics: `<name>` ... `</name>`.
#[derive(Copy, Clone, Debug, Default)]
pub struct GenericTag;

impl TagHandler for GenericTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        stack.push(OpenTagEntry::new(tag.name, format!("</{}>", tag.name)));
        format!("<{}>", tag.name).into()
    }
}

/// `[code]` or `[code=lang]`: a highlighted block whose body is never parsed as tags.
#[derive(Copy, Clone, Debug, Default)]
pub struct CodeTag;

impl CodeTag {
    pub const DEFAULT_LANGUAGE: &'static str = "php";
}

impl TagHandler for CodeTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let lang = attribute_value(tag.args.unwrap_or(Self::DEFAULT_LANGUAGE));
        stack.push(OpenTagEntry::new(tag.name, "</code></pre></div>").preserving_whitespace());
        HandlerOutcome::from(format!("<div class=\"code\"><pre class=\"{lang}\"><code>"))
            .with_noparse(true)
            .with_line_breaks_to_br(false)
    }
}

/// `[noparse]`: no markup and no stack entry, only the mode switch.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoParseTag;

impl TagHandler for NoParseTag {
    fn open(&self, _tag: &OpenTag<'_>, _stack: &mut OpenTagStack) -> HandlerOutcome {
        HandlerOutcome::default().with_noparse(true)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ColorTag;

impl ColorTag {
    /// A CSS color keyword from the allowlist or a `#rgb`/`#rrggbb` value, else `inherit`.
    pub fn color(arg: Option<&str>) -> String {
        let Some(arg) = arg.map(str::trim) else {
            return "inherit".to_owned();
        };
        if HEX_COLOR_PATTERN.is_match(arg) {
            return arg.to_owned();
        }
        let lower = arg.to_ascii_lowercase();
        if COLOR_KEYWORDS.contains(&lower.as_str()) {
            return lower;
        }
        tracing::trace!(color = arg, "rejected color");
        "inherit".to_owned()
    }
}

impl TagHandler for ColorTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        stack.push(OpenTagEntry::new(tag.name, "</span>"));
        format!("<span style=\"color: {}\">", Self::color(tag.args)).into()
    }
}

/// `[font=family]`. The family is used as written.
#[derive(Copy, Clone, Debug, Default)]
pub struct FontTag;

impl TagHandler for FontTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let family = tag.args.map_or_else(|| "inherit".to_owned(), attribute_value);
        stack.push(OpenTagEntry::new(tag.name, "</span>"));
        format!("<span style=\"font-family: {family}\">").into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
    Px(i64),
    Em(f64),
}

impl std::fmt::Display for FontSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontSize::Px(n) => write!(f, "{n}px"),
            FontSize::Em(n) => write!(f, "{n}em"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SizeTag;

impl SizeTag {
    /// Sizes above 5 are pixels. Anything else is an em multiplier clamped to `[0.7, 3]`.
    pub fn size(arg: Option<&str>) -> FontSize {
        let n = arg.and_then(leading_integer).unwrap_or(1);
        if n > 5 {
            FontSize::Px(n)
        } else {
            FontSize::Em((n as f64).clamp(0.7, 3.0))
        }
    }
}

impl TagHandler for SizeTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        stack.push(OpenTagEntry::new(tag.name, "</span>"));
        format!("<span style=\"font-size: {}\">", Self::size(tag.args)).into()
    }
}

/// The integer at the start of `s`, like `parseInt`: `"12px"` is 12, `"px"` is nothing.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    let value = digits[..len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// `[img]src[/img]` or `[img=src]alt[/img]`. The body is captured raw either way.
#[derive(Copy, Clone, Debug, Default)]
pub struct ImgTag;

impl TagHandler for ImgTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let capture = match tag.args {
            Some(src) if is_valid_uri(src) => Capture::ImageAlt {
                src: attribute_value(src),
            },
            _ => Capture::ImageSource,
        };
        stack.push(OpenTagEntry::new(tag.name, "").capturing(capture));
        HandlerOutcome::default().capturing()
    }
}

/// `[url=target]text[/url]`, or `[url]target[/url]` where the body is both. Also registered as `link`.
#[derive(Copy, Clone, Debug, Default)]
pub struct UrlTag {
    new_window: bool,
}

impl UrlTag {
    pub fn new(new_window: bool) -> Self {
        Self { new_window }
    }
}

impl TagHandler for UrlTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        match tag.args {
            Some(href) if is_valid_uri(href) => {
                stack.push(OpenTagEntry::new(tag.name, "</a>"));
                anchor_open(&attribute_value(href), self.new_window).into()
            }
            _ => {
                if let Some(href) = tag.args {
                    tracing::trace!(href, "rejected link target, using body");
                }
                let capture = Capture::BareLink {
                    new_window: self.new_window,
                };
                stack.push(OpenTagEntry::new(tag.name, "</a>").capturing(capture));
                HandlerOutcome::default().capturing()
            }
        }
    }
}

fn anchor_open(href: &str, new_window: bool) -> String {
    if new_window {
        format!("<a href=\"{href}\" target=\"_blank\">")
    } else {
        format!("<a href=\"{href}\">")
    }
}

/// `[list]` is a bulleted list, `[list=anything]` a numbered one. Also registered as `ulist`.
#[derive(Copy, Clone, Debug, Default)]
pub struct ListTag;

impl TagHandler for ListTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let (open, close) = if tag.args.is_some() {
            ("<ol>", "</ol>")
        } else {
            ("<ul>", "</ul>")
        };
        stack.push(OpenTagEntry::new(tag.name, close));
        open.into()
    }
}

/// `[q]` is an inline quote. `[quote]`, `[quote=author]` and `[quote=author;ticket;num]` are block quotes with an
/// attribution line, the last one linking to the quoted ticket comment.
#[derive(Copy, Clone, Debug, Default)]
pub struct QuoteTag;

impl QuoteTag {
    pub fn attribution(arg: Option<&str>) -> String {
        let Some(arg) = arg else {
            return "quote".to_owned();
        };
        let parts: Vec<&str> = arg.split(';').collect();
        match parts.as_slice() {
            [author, ticket, num] => format!(
                "{author} <a href=\"#ticket-{}-{}\">#{num}</a>",
                attribute_value(ticket),
                attribute_value(num),
            ),
            [author, ..] => (*author).to_owned(),
            [] => "quote".to_owned(),
        }
    }
}

impl TagHandler for QuoteTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        if tag.name == "q" {
            stack.push(OpenTagEntry::new(tag.name, "</q>"));
            return "<q>".into();
        }

        stack.push(OpenTagEntry::new(tag.name, "</blockquote>"));
        format!(
            "<blockquote><div class=\"quote-author\">{}</div>",
            Self::attribution(tag.args)
        )
        .into()
    }
}

/// `[fiddle]id[/fiddle]` and `[issue]id[/issue]`: an iframe whose source is `src_prefix` plus the body.
#[derive(Clone, Debug)]
pub struct EmbedTag {
    class: &'static str,
    src_prefix: String,
}

impl EmbedTag {
    pub fn new(class: &'static str, src_prefix: impl Into<String>) -> Self {
        Self {
            class,
            src_prefix: src_prefix.into(),
        }
    }
}

impl TagHandler for EmbedTag {
    fn open(&self, tag: &OpenTag<'_>, stack: &mut OpenTagStack) -> HandlerOutcome {
        let capture = Capture::Embed {
            class: self.class,
            src_prefix: self.src_prefix.clone(),
        };
        stack.push(OpenTagEntry::new(tag.name, "\" frameborder=\"0\"></iframe>").capturing(capture));
        HandlerOutcome::default().capturing()
    }
}

/// Turn the raw body of a capturing tag into HTML, closing markup included.
///
/// Bodies that cannot be used as a link target, image source or embed identifier come out as plain text.
pub fn render_capture(entry: &OpenTagEntry, body: &str) -> String {
    let Some(capture) = &entry.capture else {
        return format!("{body}{}", entry.closing_markup);
    };

    match capture {
        Capture::BareLink { new_window } => {
            let target = body.trim();
            if !is_valid_uri(target) {
                return body.to_owned();
            }
            format!(
                "{}{body}{}",
                anchor_open(&attribute_value(target), *new_window),
                entry.closing_markup
            )
        }
        Capture::ImageSource => {
            let src = body.trim();
            if !is_valid_uri(src) {
                return body.to_owned();
            }
            format!("<img src=\"{}\">{}", attribute_value(src), entry.closing_markup)
        }
        Capture::ImageAlt { src } => format!(
            "<img src=\"{src}\" alt=\"{}\">{}",
            attribute_value(body.trim()),
            entry.closing_markup
        ),
        Capture::Embed { class, src_prefix } => {
            let id = body.trim();
            if !EMBED_ID_PATTERN.is_match(id) {
                return body.to_owned();
            }
            format!(
                "<iframe class=\"{class}\" src=\"{src_prefix}{id}{}",
                entry.closing_markup
            )
        }
    }
}
