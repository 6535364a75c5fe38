use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use super::Renderer;
use crate::autolink::{Autolinker, LinkPolicy};
use crate::config::RenderConfig;

fn render(input: &str) -> String {
    Renderer::new(RenderConfig::default()).unwrap().render(input)
}

const SIMPLE_ESCAPED: &str = "[b]Foo<b>bar[/b] baz.";

#[test]
pub fn simple_escaped() {
    assert_eq!(render(SIMPLE_ESCAPED), "<strong>Foo&lt;b&gt;bar</strong> baz.");
}

#[test]
pub fn empty_input() {
    assert_eq!(render(""), "");
}

#[test]
pub fn plain_text_is_only_escaped() {
    assert_eq!(render("a < b\r\nc > d & e"), "a &lt; b<br>c &gt; d & e");
}

#[test]
pub fn passthrough_tags() {
    assert_eq!(render("[samp]x[/samp]"), "<samp>x</samp>");
    assert_eq!(render("[sup][samp]x[/samp][/sup]"), "<sup><samp>x</samp></sup>");
}

#[test]
pub fn fixed_inline_tags() {
    assert_eq!(render("[i]x[/i]"), "<em>x</em>");
    assert_eq!(render("[s]x[/s]"), "<span style=\"text-decoration: line-through\">x</span>");
    assert_eq!(render("[u]x[/u]"), "<span style=\"text-decoration: underline\">x</span>");
    assert_eq!(render("[q]x[/q]"), "<q>x</q>");
}

#[test]
pub fn tag_names_ignore_case() {
    assert_eq!(render("[B]x[/b]"), "<strong>x</strong>");
}

#[test]
pub fn unknown_tags_are_literal() {
    assert_eq!(render("[foo]x[/foo]"), "[foo]x[/foo]");
    assert_eq!(render("[b ]x[/ b]"), "[b ]x[/ b]");
}

#[test]
pub fn unbalanced_tag_closes_at_end() {
    assert_eq!(render("[b]text"), "<strong>text</strong>");
}

#[test]
pub fn auto_close_order_is_innermost_first() {
    assert_eq!(
        render("[quote][b][i]x"),
        "<blockquote><div class=\"quote-author\">quote</div><strong><em>x</em></strong></blockquote>"
    );
}

#[test]
pub fn mismatched_close_is_flagged() {
    assert_eq!(render("[b][i]text[/b]"), "<strong><em>text<span style=\"color: red\">[/b]</span></em></strong>");
}

#[test]
pub fn close_without_open_is_flagged() {
    assert_eq!(render("x[/b]"), "x<span style=\"color: red\">[/b]</span>");
}

#[test]
pub fn code_body_is_not_parsed() {
    assert_eq!(
        render("[code]if (!x[s]) {}[/code]"),
        "<div class=\"code\"><pre class=\"php\"><code>if (!x[s]) {}</code></pre></div>"
    );
}

#[test]
pub fn code_keeps_line_breaks_for_its_body_only() {
    assert_eq!(
        render("[code=js]a\nb[/code]\nc"),
        "<div class=\"code\"><pre class=\"js\"><code>a\nb</code></pre></div><br>c"
    );
}

#[test]
pub fn code_ignores_stray_noparse_close() {
    assert_eq!(
        render("[code]x[/noparse][b]y[/b][/code]"),
        "<div class=\"code\"><pre class=\"php\"><code>x[/noparse][b]y[/b]</code></pre></div>"
    );
    assert_eq!(render("[noparse][code]x[/noparse]y"), "[code]xy");
}

#[test]
pub fn noparse_region() {
    assert_eq!(render("[noparse][b]x[/b][/noparse][i]y[/i]"), "[b]x[/b]<em>y</em>");
    assert_eq!(render("[noparse][b]x"), "[b]x");
    assert_eq!(render("a[/noparse]b"), "ab");
}

#[test]
pub fn noparse_close_matches_anywhere_in_stack() {
    assert_eq!(
        render("[quote][code]x[/quote]y"),
        "<blockquote><div class=\"quote-author\">quote</div>\
         <div class=\"code\"><pre class=\"php\"><code>x</blockquote>y</code></pre></div>"
    );
}

#[test]
pub fn center_and_pre_keep_line_breaks() {
    assert_eq!(render("[center]a\r\nb[/center]\nc"), "<div style=\"text-align:center\">a\nb</div><br>c");
    assert_eq!(
        render("[center][pre]a[/pre]\nb[/center]\nc"),
        "<div style=\"text-align:center\"><pre>a</pre>\nb</div><br>c"
    );
}

#[test]
pub fn size_values() {
    assert_eq!(render("[size=10]x[/size]"), "<span style=\"font-size: 10px\">x</span>");
    assert_eq!(render("[size=4]x[/size]"), "<span style=\"font-size: 3em\">x</span>");
    assert_eq!(render("[size=foo]x[/size]"), "<span style=\"font-size: 1em\">x</span>");
}

#[test]
pub fn color_values() {
    assert_eq!(render("[color=red]x[/color]"), "<span style=\"color: red\">x</span>");
    assert_eq!(render("[color=#FF0000]x[/color]"), "<span style=\"color: #FF0000\">x</span>");
    assert_eq!(render("[color=bogus]x[/color]"), "<span style=\"color: inherit\">x</span>");
    assert_eq!(render("[color]x[/color]"), "<span style=\"color: inherit\">x</span>");
}

#[test]
pub fn font_family() {
    assert_eq!(render("[font=Arial]x[/font]"), "<span style=\"font-family: Arial\">x</span>");
}

#[test]
pub fn bare_url_is_target_and_text() {
    assert_eq!(render("[url]http://a.com[/url]"), "<a href=\"http://a.com\" target=\"_blank\">http://a.com</a>");
}

#[test]
pub fn url_attribute_is_target() {
    assert_eq!(render("[url=http://a.com]Text[/url]"), "<a href=\"http://a.com\" target=\"_blank\">Text</a>");
    assert_eq!(
        render("[link=http://a.com][b]Text[/b][/link]"),
        "<a href=\"http://a.com\" target=\"_blank\"><strong>Text</strong></a>"
    );
}

#[test]
pub fn bare_url_swallows_nested_tags() {
    assert_eq!(render("[url]http://a.com/[b]x[/url]"), "http://a.com/[b]x");
}

#[test]
pub fn unusable_bare_url_is_text() {
    assert_eq!(render("[url]javascript:alert(1)[/url]"), "javascript:alert(1)");
}

#[test]
pub fn unterminated_bare_url_takes_the_tail() {
    assert_eq!(
        render("[b][url]http://a.com"),
        "<strong><a href=\"http://a.com\" target=\"_blank\">http://a.com</a></strong>"
    );
}

#[test]
pub fn links_in_same_window() {
    let mut config = RenderConfig::default();
    config.links.open_in_new_window = false;
    let renderer = Renderer::new(config).unwrap();
    assert_eq!(renderer.render("[url=http://a.com]x[/url]"), "<a href=\"http://a.com\">x</a>");
}

#[test]
pub fn images() {
    assert_eq!(render("[img]http://a.com/p.png[/img]"), "<img src=\"http://a.com/p.png\">");
    assert_eq!(
        render("[img=http://a.com/p.png]A \"cat\"[/img]"),
        "<img src=\"http://a.com/p.png\" alt=\"A &quot;cat&quot;\">"
    );
    assert_eq!(render("[img]javascript:x[/img]"), "javascript:x");
}

#[test]
pub fn lists() {
    assert_eq!(render("[list][*]one[*]two[/list]"), "<ul><li>one</li><li>two</li></ul>");
    assert_eq!(render("[list=1][*]a\n[*]b[/list]"), "<ol><li>a</li><li>b</li></ol>");
    assert_eq!(render("[ulist][*]x[/ulist]"), "<ul><li>x</li></ul>");
}

#[test]
pub fn quote_attribution() {
    assert_eq!(
        render("[quote]body[/quote]"),
        "<blockquote><div class=\"quote-author\">quote</div>body</blockquote>"
    );
    assert_eq!(
        render("[quote=Name]body[/quote]"),
        "<blockquote><div class=\"quote-author\">Name</div>body</blockquote>"
    );
    assert_eq!(
        render("[quote=Name;123;4]body[/quote]"),
        "<blockquote><div class=\"quote-author\">Name <a href=\"#ticket-123-4\">#4</a></div>body</blockquote>"
    );
}

#[test]
pub fn nested_quote_and_code() {
    assert_eq!(
        render("[quote=A][quote]x[/quote][code][b][/code][/quote]"),
        "<blockquote><div class=\"quote-author\">A</div>\
         <blockquote><div class=\"quote-author\">quote</div>x</blockquote>\
         <div class=\"code\"><pre class=\"php\"><code>[b]</code></pre></div></blockquote>"
    );
}

#[test]
pub fn bare_urls_are_autolinked() {
    assert_eq!(render("see http://a.com/x"), "see <a href=\"http://a.com/x\" target=\"_blank\">http://a.com/x</a>");
    assert_eq!(render("ftp://f.org"), "ftp://f.org");
}

#[test]
pub fn parenthesized_urls_are_autolinked() {
    assert_eq!(
        render("see http://en.wiki.org/A_(b) now"),
        "see <a href=\"http://en.wiki.org/A_(b)\" target=\"_blank\">http://en.wiki.org/A_(b)</a> now"
    );
}

#[test]
pub fn tag_attributes_are_not_autolinked() {
    assert_eq!(render("[font=http://x.org]t[/font]"), "<span style=\"font-family: http://x.org\">t</span>");
}

#[test]
pub fn protected_bodies_are_not_autolinked() {
    assert_eq!(
        render("[code]http://a.com[/code]"),
        "<div class=\"code\"><pre class=\"php\"><code>http://a.com</code></pre></div>"
    );
    assert_eq!(
        render("[quote]http://a.com[/quote]"),
        "<blockquote><div class=\"quote-author\">quote</div>http://a.com</blockquote>"
    );
}

#[test]
pub fn autolink_can_be_disabled() {
    let mut config = RenderConfig::default();
    config.autolink.enabled = false;
    let renderer = Renderer::new(config).unwrap();
    assert_eq!(renderer.render("http://a.com"), "http://a.com");
}

const FIDDLE_FRAME: &str =
    "<iframe class=\"fiddle\" src=\"https://run.fiddle.example/?id=abc123\" frameborder=\"0\"></iframe>";

#[test]
pub fn fiddle_permalink_is_embedded() {
    assert_eq!(
        render("look https://fiddle.example.com/#!/fiddle/abc123 here"),
        format!("look <br>{FIDDLE_FRAME}<br> here")
    );
}

#[test]
pub fn fiddle_permalink_in_tags_is_embedded() {
    assert_eq!(render("[url=https://fiddle.example.com/#fiddle/abc123]mine[/url]"), FIDDLE_FRAME);
    assert_eq!(render("[url]https://fiddle.example.com/#fiddle/abc123[/url]"), FIDDLE_FRAME);
    assert_eq!(render("[code]https://fiddle.example.com/#fiddle/abc123[/code]"), FIDDLE_FRAME);
}

#[test]
pub fn fiddle_tag_needs_identifier() {
    assert_eq!(render("[fiddle]abc123[/fiddle]"), FIDDLE_FRAME);
    assert_eq!(render("[fiddle]a\"b[/fiddle]"), "a\"b");
}

#[test]
pub fn issue_tag_follows_vhost() {
    assert_eq!(render("[issue]42[/issue]"), "[issue]42[/issue]");

    let mut config = RenderConfig::default();
    config.server.vhost = Some("example.org".to_owned());
    let renderer = Renderer::new(config).unwrap();
    assert_eq!(
        renderer.render("[issue]42[/issue]"),
        "<iframe class=\"issue\" src=\"https://example.org/issue/embed?id=42\" frameborder=\"0\"></iframe>"
    );
}

#[test]
pub fn invalid_config_is_rejected() {
    let mut config = RenderConfig::default();
    config.fiddle.issue_path = "issue".to_owned();
    assert!(Renderer::new(config).is_err());
}

struct NoLinks;

impl Autolinker for NoLinks {
    fn link(&self, text: &str, _policy: &LinkPolicy<'_>) -> String {
        text.to_owned()
    }
}

#[test]
pub fn custom_autolinker() {
    let renderer = Renderer::with_autolinker(RenderConfig::default(), Arc::new(NoLinks)).unwrap();
    assert_eq!(renderer.render("http://a.com"), "http://a.com");
}

#[test]
pub fn concurrent_renders_share_one_renderer() {
    let renderer = Arc::new(Renderer::new(RenderConfig::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || renderer.render(&format!("[b]{n}[code][i]{n}")))
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!("<strong>{n}<div class=\"code\"><pre class=\"php\"><code>[i]{n}</code></pre></div></strong>")
        );
    }
}

#[test]
pub fn default_renderer() {
    assert_eq!(crate::render("[b]x[/b]"), "<strong>x</strong>");
}
