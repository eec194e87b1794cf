//! Built-in sanitizer used when no sanitizing collaborator is available.
//!
//! The markup is parsed as an HTML fragment (html5ever via `scraper`), so
//! every check sees the same decoded names and attribute values a browser
//! would. The tree is then re-serialized keeping only what survives:
//!
//! * blocked elements (`script`, `style`, `iframe`, `object`, `embed`,
//!   `link`, ...) are dropped together with their content,
//! * every `on*` attribute is dropped,
//! * URL attributes whose decoded value uses a script scheme are dropped,
//! * comments, doctypes and processing instructions are dropped.
//!
//! Text and attribute values are always re-escaped on the way out.

use scraper::{ElementRef, Html, Node};

const BLOCKED_ELEMENTS: [&str; 14] = [
    "script", "style", "iframe", "object", "embed", "link", "base", "meta", "frame", "frameset",
    "template", "noscript", "animate", "set",
];
const VOID_ELEMENTS: [&str; 16] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "link", "meta", "param", "source", "track",
];
const URL_ATTRIBUTES: [&str; 8] = [
    "href",
    "src",
    "action",
    "formaction",
    "poster",
    "background",
    "cite",
    "data",
];
const SCRIPT_SCHEMES: [&str; 2] = ["javascript:", "vbscript:"];

pub fn sanitize_html(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut output = String::with_capacity(input.len());
    write_children(&mut output, fragment.root_element());
    output
}

/// Comments, doctypes and processing instructions are skipped.
fn write_children(output: &mut String, parent: ElementRef<'_>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => push_escaped_text(output, &text.text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(output, element);
                }
            }
            _ => {}
        }
    }
}

fn write_element(output: &mut String, element: ElementRef<'_>) {
    let name = element.value().name();
    if is_blocked(name) {
        return;
    }

    output.push('<');
    output.push_str(name);
    for (attribute, value) in element.value().attrs() {
        if !keep_attribute(attribute, value) {
            continue;
        }
        output.push(' ');
        output.push_str(attribute);
        output.push_str("=\"");
        push_escaped_attribute(output, value);
        output.push('"');
    }
    output.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(output, element);
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

fn is_blocked(name: &str) -> bool {
    BLOCKED_ELEMENTS
        .iter()
        .any(|blocked| blocked.eq_ignore_ascii_case(name))
}

/// `value` is the parsed attribute value, with character references already
/// decoded.
fn keep_attribute(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") {
        return false;
    }
    if URL_ATTRIBUTES.contains(&name.as_str()) {
        return !is_script_url(value);
    }
    true
}

/// Browsers ignore embedded whitespace and control characters in the scheme,
/// so they are stripped before the prefix check.
pub(crate) fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    SCRIPT_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}

fn push_escaped_text(output: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            other => output.push(other),
        }
    }
}

fn push_escaped_attribute(output: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            other => output.push(other),
        }
    }
}

/// Elements and attributes in `markup`, as a browser would parse them, that
/// the sanitizer must never let through.
#[cfg(test)]
pub(crate) fn unsafe_parts(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    let mut found = Vec::new();
    for node in fragment.root_element().descendants() {
        let Some(element) = node.value().as_element() else {
            continue;
        };
        if is_blocked(element.name()) {
            found.push(format!("<{}>", element.name()));
        }
        for (name, value) in element.attrs() {
            if !keep_attribute(name, value) {
                found.push(format!("{name}={value:?}"));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn drops_script_element_and_its_body() {
        let cleaned = sanitize_html("<p>Hi</p><script>alert('x < y')</script><p>Bye</p>");
        assert_eq!(cleaned, "<p>Hi</p><p>Bye</p>");
    }

    #[test]
    fn drops_blocked_elements_case_insensitively() {
        let cleaned = sanitize_html("a<STYLE>p{}</Style>b<IFRAME src=x></iframe>c");
        assert_eq!(cleaned, "abc");
    }

    #[test]
    fn drops_nested_object_subtree() {
        let cleaned =
            sanitize_html("<div><object><object><param name=a></object><b>x</b></object>ok</div>");
        assert_eq!(cleaned, "<div>ok</div>");
    }

    #[test]
    fn drops_void_blocked_elements_without_eating_siblings() {
        let cleaned = sanitize_html("<link rel=stylesheet href=x.css><p>kept</p><embed src=a.swf>");
        assert_eq!(cleaned, "<p>kept</p>");
    }

    #[test]
    fn strips_event_handler_attributes() {
        let cleaned = sanitize_html(r#"<p onclick="steal()" class="tip" ONMOUSEOVER='x'>Salt</p>"#);
        assert_eq!(cleaned, r#"<p class="tip">Salt</p>"#);
    }

    #[test]
    fn strips_javascript_urls_but_keeps_safe_links() {
        let cleaned = sanitize_html(
            r#"<a href="  JavaScript:alert(1)">bad</a><a href="https://atfood.example/miso">good</a><img src="JAVASCRIPT:y">"#,
        );
        assert_eq!(
            cleaned,
            r#"<a>bad</a><a href="https://atfood.example/miso">good</a><img>"#
        );
    }

    #[test]
    fn entity_encoded_javascript_urls_are_stripped() {
        let cleaned = sanitize_html(concat!(
            r#"<a href="&#106;avascript:alert(1)">a</a>"#,
            r#"<a href="&#x6A;avascript:alert(2)">b</a>"#,
            r#"<a href="javascript&colon;alert(3)">c</a>"#,
            r#"<img src="java&#9;script:x">"#,
            r#"<a href="&#x20;vbscript:msgbox(1)">d</a>"#,
        ));
        assert_eq!(cleaned, "<a>a</a><a>b</a><a>c</a><img><a>d</a>");
    }

    #[test]
    fn unterminated_script_swallows_the_rest() {
        assert_eq!(sanitize_html("<p>a</p><script>alert(1)"), "<p>a</p>");
    }

    #[test]
    fn comments_and_doctypes_are_removed() {
        assert_eq!(
            sanitize_html("<!doctype html><!-- <script>x</script> -->text"),
            "text"
        );
    }

    #[test]
    fn loose_angle_brackets_become_text() {
        assert_eq!(sanitize_html("1 < 2 and <3"), "1 &lt; 2 and &lt;3");
        assert_eq!(sanitize_html("Salt &amp; fat"), "Salt &amp; fat");
    }

    #[test]
    fn attribute_values_are_requoted_safely() {
        assert_eq!(
            sanitize_html(r#"<span title='say "hi" <b>'>x</span>"#),
            r#"<span title="say &quot;hi&quot; &lt;b&gt;">x</span>"#
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        assert_eq!(sanitize_html("a<br/>b<hr />"), "a<br>b<hr>");
    }

    #[test]
    fn unclosed_elements_are_closed() {
        assert_eq!(sanitize_html("<p><em>rich"), "<p><em>rich</em></p>");
    }

    #[test]
    fn script_url_detection_ignores_case_and_padding() {
        assert!(is_script_url(" JAVASCRIPT:void(0)"));
        assert!(is_script_url("java\nscript:alert(1)"));
        assert!(is_script_url("VBScript:msgbox"));
        assert!(!is_script_url("https://example.com/javascript:"));
    }

    quickcheck! {
        fn sanitized_output_has_no_blocked_elements_or_handlers(prefix: String, suffix: String) -> bool {
            let input = format!(
                "{prefix}<script>alert(1)</script><p onclick=\"x()\">{suffix}</p><a href=\"&#106;avascript:x\">y</a>"
            );
            unsafe_parts(&sanitize_html(&input)).is_empty()
        }

        fn arbitrary_input_never_yields_unsafe_markup(input: String) -> bool {
            unsafe_parts(&sanitize_html(&input)).is_empty()
        }
    }
}
