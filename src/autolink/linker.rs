//! Link detection in plain text.
use std::sync::LazyLock;

use regex::Regex;

/// Characters allowed inside a detected URL, and the narrower set it may end with, so trailing punctuation
/// stays outside the link.
const URL_CHARS: &str = r"[-a-zA-Z0-9_/%&=#+~@$*!?,.;:]*";
const URL_END_CHARS: &str = r"[-a-zA-Z0-9_/%&=#+~@$*]";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:(?P<scheme>https?|ftp)://|www\.){0}{1}(?:[(]{0}[)](?:{0}{1})?)?",
        URL_CHARS, URL_END_CHARS
    ))
    .expect("URL pattern must compile")
});

static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(?P<handle>[A-Za-z0-9_]{1,15})\b").expect("mention pattern must compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ftp,
}

impl Scheme {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            "ftp" => Some(Scheme::Ftp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A URL; `scheme` is `None` when it was written without one (`www.example.com`).
    Url { scheme: Option<Scheme> },
    /// An `@handle` mention.
    Mention,
}

/// One detected link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch<'a> {
    /// The text as it appears in the input.
    pub text: &'a str,
    /// The target the text resolves to.
    pub url: String,
    pub kind: MatchKind,
}

/// Decides for each match what replaces it. `None` leaves the match untouched.
pub type OnMatch<'a> = &'a dyn Fn(&LinkMatch<'_>) -> Option<String>;

/// How an [`Autolinker`] should treat what it finds.
#[derive(Clone, Copy)]
pub struct LinkPolicy<'a> {
    pub open_in_new_window: bool,
    /// Drop `http://`/`https://` from the visible text of rendered anchors.
    pub strip_url_prefix: bool,
    /// Detect `@handle` mentions.
    pub mentions: bool,
    /// Overrides the default anchor rendering for every match.
    pub on_match: Option<OnMatch<'a>>,
}

impl Default for LinkPolicy<'_> {
    fn default() -> Self {
        Self {
            open_in_new_window: true,
            strip_url_prefix: false,
            mentions: false,
            on_match: None,
        }
    }
}

impl std::fmt::Debug for LinkPolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkPolicy")
            .field("open_in_new_window", &self.open_in_new_window)
            .field("strip_url_prefix", &self.strip_url_prefix)
            .field("mentions", &self.mentions)
            .field("on_match", &self.on_match.is_some())
            .finish()
    }
}

/// Finds links in plain text and replaces them according to a [`LinkPolicy`].
pub trait Autolinker: Send + Sync {
    fn link(&self, text: &str, policy: &LinkPolicy<'_>) -> String;
}

/// Regex-based detector for `http`, `https` and `ftp` URLs, scheme-less `www.` hosts and, on request,
/// `@handle` mentions.
#[derive(Debug, Clone)]
pub struct UrlAutolinker {
    mention_base: String,
}

impl Default for UrlAutolinker {
    fn default() -> Self {
        Self {
            mention_base: "https://twitter.com/".to_owned(),
        }
    }
}

impl UrlAutolinker {
    /// Use `base` followed by the handle as the target of mentions.
    pub fn with_mention_base(base: impl Into<String>) -> Self {
        Self {
            mention_base: base.into(),
        }
    }

    /// All matches in `text`, in order and without overlaps, as `(start, match)`.
    pub fn find<'t>(&self, text: &'t str, mentions: bool) -> Vec<(usize, LinkMatch<'t>)> {
        let mut found: Vec<(usize, LinkMatch<'t>)> = URL_PATTERN
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let matched = trim_escaped_brackets(whole.as_str());
                if matched.is_empty() {
                    return None;
                }
                let scheme = caps.name("scheme").and_then(|s| Scheme::parse(s.as_str()));
                let url = match scheme {
                    Some(_) => matched.to_owned(),
                    None => format!("http://{matched}"),
                };
                Some((
                    whole.start(),
                    LinkMatch {
                        text: matched,
                        url,
                        kind: MatchKind::Url { scheme },
                    },
                ))
            })
            .collect();

        if mentions {
            for caps in MENTION_PATTERN.captures_iter(text) {
                let (Some(whole), Some(handle)) = (caps.get(0), caps.name("handle")) else {
                    continue;
                };
                // An `@` preceded by a word character is part of an address, not a mention.
                let preceded_by_word = text[..whole.start()]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
                if preceded_by_word {
                    continue;
                }
                found.push((
                    whole.start(),
                    LinkMatch {
                        text: whole.as_str(),
                        url: format!("{}{}", self.mention_base, handle.as_str()),
                        kind: MatchKind::Mention,
                    },
                ));
            }
            found.sort_by_key(|(start, _)| *start);
        }

        let mut last_end = 0;
        found.retain(|(start, m)| {
            if *start < last_end {
                return false;
            }
            last_end = start + m.text.len();
            true
        });
        found
    }

    fn anchor(m: &LinkMatch<'_>, policy: &LinkPolicy<'_>) -> String {
        let mut display = m.text;
        if policy.strip_url_prefix {
            for prefix in ["https://", "http://"] {
                if display.len() > prefix.len() && display[..prefix.len()].eq_ignore_ascii_case(prefix) {
                    display = &display[prefix.len()..];
                }
            }
        }
        let href = crate::html::attribute_value(&m.url);
        let target = if policy.open_in_new_window {
            " target=\"_blank\""
        } else {
            ""
        };
        format!("<a href=\"{href}\"{target}>{display}</a>")
    }
}

impl Autolinker for UrlAutolinker {
    fn link(&self, text: &str, policy: &LinkPolicy<'_>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (start, m) in self.find(text, policy.mentions) {
            let replacement = match policy.on_match {
                Some(on_match) => on_match(&m),
                None => Some(Self::anchor(&m, policy)),
            };
            let Some(replacement) = replacement else {
                continue;
            };
            tracing::trace!(link = m.text, "autolinked");
            out.push_str(&text[last..start]);
            out.push_str(&replacement);
            last = start + m.text.len();
        }
        out.push_str(&text[last..]);
        out
    }
}

/// Input arrives with `<`/`>` already escaped; those entities end a URL, as the raw brackets would have.
fn trim_escaped_brackets(matched: &str) -> &str {
    let cut = ["&lt", "&gt"]
        .iter()
        .filter_map(|entity| matched.find(entity))
        .min()
        .unwrap_or(matched.len());
    let trimmed = &matched[..cut];
    if cut == matched.len() {
        return trimmed;
    }
    trimmed.trim_end_matches(|c: char| !(c.is_ascii_alphanumeric() || "-_/%&=#+~@$*".contains(c)))
}
