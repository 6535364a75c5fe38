//! Text passes that run before the tag scan.
//!
//! Bare URLs are rewritten into `[url]` tags so they take the same path through the scanner as hand-written
//! links, fiddle permalinks are folded into `[FIDDLE]id[/FIDDLE]` embeds, and `[*]` list shorthand becomes
//! explicit `[li]` items. Bodies of `code`, `url`/`link`, `img`, `quote` and `q` tags are never autolinked.
use std::sync::LazyLock;

use regex::Regex;

use crate::config::AutolinkConfig;
use crate::parser::Tokenizer;

mod linker;

pub use linker::{Autolinker, LinkMatch, LinkPolicy, MatchKind, OnMatch, Scheme, UrlAutolinker};

/// A fiddle permalink, `https://fiddle.<host>/#...fiddle/<id>...`.
const FIDDLE_URL: &str = r"https://fiddle\.[A-Za-z0-9.-]+/#[^\s\[\]]*?fiddle/(?P<id>[A-Za-z0-9_-]+)[^\s\[\]]*";

const FOLDED_FIDDLE: &str = "[FIDDLE]${id}[/FIDDLE]";

static FIDDLE_URL_EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{FIDDLE_URL}$")).expect("fiddle URL pattern must compile"));

/// `[url=permalink]text[/url]` and `[url]permalink[/url]`.
static URL_FIDDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\[url=(?:{FIDDLE_URL})\].*?\[/url\]")).expect("url fiddle pattern must compile")
});

static URL_BODY_FIDDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\[url\]\s*(?:{FIDDLE_URL})\s*\[/url\]")).expect("url body fiddle pattern must compile")
});

/// A code block holding nothing but a permalink.
static CODE_FIDDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\[code(?:=[^\]]*)?\]\s*(?:{FIDDLE_URL})\s*\[/code\]"))
        .expect("code fiddle pattern must compile")
});

/// Opening and closing tags whose bodies the autolinker must not touch.
static PROTECTED_EDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?P<close>/)?(?P<name>code|url|link|img|quote|q)(?:=[^\]]*)?\]")
        .expect("protected tag pattern must compile")
});

/// Regions where `[*]` is literal text.
static VERBATIM_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[code(?:=[^\]]*)?\].*?(?:\[/code\]|\z)|\[noparse\].*?(?:\[/noparse\]|\z)")
        .expect("verbatim span pattern must compile")
});

/// What ends a `[*]` item: the next item, the end of the list, or a line break.
static LIST_ITEM_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\*\]|\[/u?list\]|\r?\n").expect("list item pattern must compile"));

/// The fiddle identifier of a permalink, if `url` is one.
pub fn fiddle_id(url: &str) -> Option<&str> {
    FIDDLE_URL_EXACT.captures(url)?.name("id").map(|m| m.as_str())
}

/// Replace fiddle permalinks inside `[url]` tags and permalink-only `[code]` blocks with `[FIDDLE]id[/FIDDLE]`.
pub fn fold_fiddle_permalinks(text: &str) -> String {
    let text = URL_FIDDLE.replace_all(text, FOLDED_FIDDLE);
    let text = URL_BODY_FIDDLE.replace_all(&text, FOLDED_FIDDLE);
    let text = CODE_FIDDLE.replace_all(&text, FOLDED_FIDDLE);
    text.into_owned()
}

/// The replacement rule the renderer hands to the autolinker.
///
/// Fiddle permalinks become embeds, `http`/`https` URLs become `[url]` tags, anything else stays as written.
pub fn bbcode_link_rule(m: &LinkMatch<'_>) -> Option<String> {
    if let Some(id) = fiddle_id(m.text) {
        return Some(format!("\n[FIDDLE]{id}[/FIDDLE]\n"));
    }
    match m.kind {
        MatchKind::Url {
            scheme: Some(Scheme::Http | Scheme::Https),
        } => Some(format!("[url]{}[/url]", m.text)),
        _ => None,
    }
}

/// Split `text` into `(protected, segment)` runs. A protected run starts at a `code`, `url`, `link`, `img`, `quote`
/// or `q` opener and ends after its matching close, or at the end of the input if it never closes.
pub fn split_protected(text: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while let Some(open) = PROTECTED_EDGE.captures_at(text, pos) {
        let (Some(whole), Some(name)) = (open.get(0), open.name("name")) else {
            break;
        };
        if open.name("close").is_some() {
            // A stray close is ordinary text.
            if whole.end() > pos {
                segments.push((false, &text[pos..whole.end()]));
            }
            pos = whole.end();
            continue;
        }

        if whole.start() > pos {
            segments.push((false, &text[pos..whole.start()]));
        }
        let end = protected_end(text, whole.end(), name.as_str());
        segments.push((true, &text[whole.start()..end]));
        pos = end;
    }

    if pos < text.len() {
        segments.push((false, &text[pos..]));
    }
    segments
}

/// Byte offset just past the close tag matching an opener named `name` whose body starts at `from`.
fn protected_end(text: &str, from: usize, name: &str) -> usize {
    // Only quotes nest. Code, link and img bodies end at their first close.
    let nests = name.eq_ignore_ascii_case("quote") || name.eq_ignore_ascii_case("q");
    let mut depth = 1usize;
    for edge in PROTECTED_EDGE.captures_iter(&text[from..]) {
        let (Some(whole), Some(edge_name)) = (edge.get(0), edge.name("name")) else {
            continue;
        };
        if !edge_name.as_str().eq_ignore_ascii_case(name) {
            continue;
        }
        if edge.name("close").is_some() {
            depth -= 1;
            if depth == 0 {
                return from + whole.end();
            }
        } else if nests {
            depth += 1;
        }
    }
    text.len()
}

/// Run `linker` over the plain text of `text` outside protected tag bodies and tag tokens.
pub fn autolink(text: &str, linker: &dyn Autolinker, config: &AutolinkConfig) -> String {
    if !config.enabled {
        return text.to_owned();
    }

    let policy = LinkPolicy {
        open_in_new_window: true,
        strip_url_prefix: false,
        mentions: false,
        on_match: Some(&bbcode_link_rule),
    };

    let mut out = String::with_capacity(text.len());
    for (protected, segment) in split_protected(text) {
        if protected {
            out.push_str(segment);
            continue;
        }
        // Tag tokens are copied as written, so `[font=http://...]` keeps its attribute.
        for token in Tokenizer::new(segment) {
            if token.is_text() {
                out.push_str(&linker.link(token.span, &policy));
            } else {
                out.push_str(token.span);
            }
        }
    }
    out
}

/// Rewrite `[*]item` shorthand into `[li]item[/li]`, leaving code and noparse bodies alone.
pub fn expand_list_items(text: &str) -> String {
    if !text.contains("[*]") {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut pos = 0;
    for span in VERBATIM_SPAN.find_iter(text) {
        expand_items_into(&text[pos..span.start()], &mut out);
        out.push_str(span.as_str());
        pos = span.end();
    }
    expand_items_into(&text[pos..], &mut out);
    out
}

fn expand_items_into(mut rest: &str, out: &mut String) {
    while let Some(idx) = rest.find("[*]") {
        out.push_str(&rest[..idx]);
        let item = &rest[idx + "[*]".len()..];
        let (body_len, consumed) = match LIST_ITEM_END.find(item) {
            // A following item or list close stays in place for the next round.
            Some(end) if end.as_str().starts_with('[') => (end.start(), end.start()),
            // A line break ends the item and is dropped with it.
            Some(end) => (end.start(), end.end()),
            None => (item.len(), item.len()),
        };
        out.push_str("[li]");
        out.push_str(&item[..body_len]);
        out.push_str("[/li]");
        rest = &item[consumed..];
    }
    out.push_str(rest);
}
