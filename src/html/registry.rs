//! The tag vocabulary: which names are tags at all, and which of them have special handlers.
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::builtins::{
    BoldTag, CenterTag, CodeTag, ColorTag, EmbedTag, FontTag, GenericTag, ImgTag, ItalicTag, ListTag, NoParseTag,
    PreTag, QuoteTag, SizeTag, StrikeTag, UnderlineTag, UrlTag,
};
use super::TagHandler;
use crate::config::RenderConfig;

/// Tags rendered as `<name>body</name>` with no special handling.
pub const PASSTHROUGH_TAGS: &[&str] = &["li", "samp", "kbd", "sub", "sup", "tt", "h1", "h2", "h3"];

/// Mapping from a tag name to its handler, or `None` for a plain passthrough tag.
pub struct TagRegistry {
    tags: HashMap<String, Option<Arc<dyn TagHandler>>>,
    matcher: Regex,
}

impl TagRegistry {
    /// The fixed tag table.
    pub fn default_tags(config: &RenderConfig) -> Vec<(&'static str, Option<Arc<dyn TagHandler>>)> {
        let url: Arc<dyn TagHandler> = Arc::new(UrlTag::new(config.links.open_in_new_window));
        let list: Arc<dyn TagHandler> = Arc::new(ListTag);
        let quote: Arc<dyn TagHandler> = Arc::new(QuoteTag);

        let mut tags: Vec<(&'static str, Option<Arc<dyn TagHandler>>)> = vec![
            ("b", special(BoldTag)),
            ("center", special(CenterTag)),
            ("code", special(CodeTag)),
            ("color", special(ColorTag)),
            ("font", special(FontTag)),
            ("i", special(ItalicTag)),
            ("img", special(ImgTag)),
            ("link", Some(url.clone())),
            ("url", Some(url)),
            ("list", Some(list.clone())),
            ("ulist", Some(list)),
            ("noparse", special(NoParseTag)),
            ("pre", special(PreTag)),
            ("quote", Some(quote.clone())),
            ("q", Some(quote)),
            ("s", special(StrikeTag)),
            ("size", special(SizeTag)),
            ("u", special(UnderlineTag)),
        ];
        tags.extend(PASSTHROUGH_TAGS.iter().map(|&name| (name, None)));
        tags
    }

    /// Build a registry from an explicit table.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag-name matcher fails to compile.
    pub fn new<I, S>(tags: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (S, Option<Arc<dyn TagHandler>>)>,
        S: Into<String>,
    {
        let tags: HashMap<String, Option<Arc<dyn TagHandler>>> = tags
            .into_iter()
            .map(|(name, handler)| (name.into().to_ascii_lowercase(), handler))
            .collect();
        let matcher = compile_matcher(tags.keys().map(String::as_str))?;
        Ok(Self { tags, matcher })
    }

    /// The default table plus the configuration-dependent `fiddle` and `issue` tags.
    ///
    /// `fiddle` is always present; `issue` only when a server vhost is configured. The result is built once per
    /// renderer and only read afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag-name matcher fails to compile.
    pub fn with_dynamic(config: &RenderConfig) -> Result<Self, regex::Error> {
        let mut tags = Self::default_tags(config);
        let fiddle_prefix = format!("{}?id=", config.fiddle.run_url);
        tags.push(("fiddle", special(EmbedTag::new("fiddle", fiddle_prefix))));

        if let Some(vhost) = &config.server.vhost {
            let issue_prefix = format!("https://{vhost}{}?id=", config.fiddle.issue_path);
            tags.push(("issue", special(EmbedTag::new("issue", issue_prefix))));
        }

        Self::new(tags)
    }

    /// Whether `name` (optionally prefixed with `/`) is a recognized tag, ignoring case.
    pub fn is_valid(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(&name.to_ascii_lowercase())
    }

    /// Handler for a lower-cased tag name, falling back to the generic passthrough handler.
    pub fn handler(&self, name: &str) -> &dyn TagHandler {
        match self.tags.get(name) {
            Some(Some(handler)) => handler.as_ref(),
            _ => &GenericTag,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

fn special(h: impl TagHandler + 'static) -> Option<Arc<dyn TagHandler>> {
    Some(Arc::new(h))
}

fn compile_matcher<'a>(names: impl Iterator<Item = &'a str>) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = names.map(regex::escape).collect();
    Regex::new(&format!("(?i)^/?(?:{})$", alternatives.join("|")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_ignores_case_and_slash() {
        let registry = TagRegistry::with_dynamic(&RenderConfig::default()).unwrap();
        assert!(registry.is_valid("b"));
        assert!(registry.is_valid("QUOTE"));
        assert!(registry.is_valid("/url"));
        assert!(registry.is_valid("FIDDLE"));
        assert!(!registry.is_valid("bold"));
        assert!(!registry.is_valid("bb"));
        assert!(!registry.is_valid("//b"));
    }

    #[test]
    fn issue_requires_vhost() {
        let mut config = RenderConfig::default();
        let registry = TagRegistry::with_dynamic(&config).unwrap();
        assert!(!registry.contains("issue"));
        assert!(!registry.is_valid("issue"));

        config.server.vhost = Some("example.org".to_owned());
        let registry = TagRegistry::with_dynamic(&config).unwrap();
        assert!(registry.contains("issue"));
        assert!(registry.is_valid("issue"));
    }

    #[test]
    fn default_table_has_no_dynamic_tags() {
        let names: Vec<_> = TagRegistry::default_tags(&RenderConfig::default())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.contains(&"samp"));
        assert!(!names.contains(&"fiddle"));
        assert!(!names.contains(&"issue"));
    }

    #[test]
    fn custom_table() {
        let registry = TagRegistry::new([("Spoiler", None)]).unwrap();
        assert!(registry.is_valid("spoiler"));
        assert!(!registry.is_valid("b"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["spoiler"]);
    }
}
