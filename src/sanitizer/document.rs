//! Mutable parsed page that the sanitizers operate on.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// HTML5 void elements that must not have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are written out verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// A parsed upstream page plus the edits made to it so far.
///
/// The parsed tree itself is never rewritten. Removals and attribute edits
/// are recorded against node ids and applied when the document is
/// [serialized](Self::serialize). [`select`](Self::select) only yields
/// elements that are still attached, so each step sees the result of the
/// steps before it.
pub struct Document {
    html: Html,
    url: Url,
    origin: String,
    removed: HashSet<NodeId>,
    attr_edits: HashMap<NodeId, Vec<(String, Option<String>)>>,
}

impl Document {
    /// Parse `source` as a full HTML document fetched from `url`.
    pub fn parse(source: &str, url: Url) -> Self {
        let origin = url.origin().ascii_serialization();
        Self {
            html: Html::parse_document(source),
            url,
            origin,
            removed: HashSet::new(),
            attr_edits: HashMap::new(),
        }
    }

    /// The url the page was fetched from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Scheme, host and non-default port of [`url`](Self::url), no path.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Iterate over attached elements matching `selector`, in document order.
    pub fn select<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html
            .select(selector)
            .filter(|el| self.is_attached(el.id()))
    }

    /// Current value of an attribute, taking earlier edits into account.
    pub fn attr<'a>(&'a self, element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
        if let Some(edit) = self.edit_for(element.id(), name) {
            return edit;
        }
        element.value().attr(name)
    }

    /// Detach an element and everything beneath it.
    pub fn remove(&mut self, id: NodeId) {
        self.removed.insert(id);
    }

    /// Drop an attribute from an element, keeping the element.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.record(id, name, None);
    }

    /// Set an attribute on an element, adding it if absent.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.record(id, name, Some(value.into()));
    }

    /// Returns `true` if neither the node nor any ancestor was removed.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(node) = self.html.tree.get(id) else {
            return false;
        };
        !self.removed.contains(&id) && !node.ancestors().any(|a| self.removed.contains(&a.id()))
    }

    /// Write the edited document back out as HTML.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_node(self.html.tree.root(), false, &mut out);
        out
    }

    fn edit_for(&self, id: NodeId, name: &str) -> Option<Option<&str>> {
        self.attr_edits
            .get(&id)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_deref())
    }

    fn record(&mut self, id: NodeId, name: &str, value: Option<String>) {
        let edits = self.attr_edits.entry(id).or_default();
        match edits.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => edits.push((name.to_string(), value)),
        }
    }

    fn serialize_node(&self, node: NodeRef<Node>, raw_text: bool, out: &mut String) {
        let id = node.id();
        if self.removed.contains(&id) {
            return;
        }

        match node.value() {
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.serialize_node(child, false, out);
                }
            }
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                let (public_id, system_id) = (doctype.public_id(), doctype.system_id());
                if !public_id.is_empty() {
                    out.push_str(" PUBLIC \"");
                    out.push_str(public_id);
                    out.push('"');
                } else if !system_id.is_empty() {
                    out.push_str(" SYSTEM");
                }
                if !system_id.is_empty() {
                    out.push_str(" \"");
                    out.push_str(system_id);
                    out.push('"');
                }
                out.push('>');
            }
            Node::Element(el) => {
                let tag = el.name();
                out.push('<');
                out.push_str(tag);

                let edits = self.attr_edits.get(&id);
                let names: Vec<(Cow<str>, &str)> = el
                    .attrs
                    .iter()
                    .map(|(qual, v)| {
                        let name = match &qual.prefix {
                            Some(prefix) => Cow::Owned(format!("{prefix}:{}", qual.local)),
                            None => Cow::Borrowed(&*qual.local),
                        };
                        (name, &**v)
                    })
                    .collect();
                for (k, v) in &names {
                    let value = match edits.and_then(|e| e.iter().find(|(name, _)| name == k)) {
                        Some((_, None)) => continue,
                        Some((_, Some(replacement))) => replacement.as_str(),
                        None => *v,
                    };
                    push_attr(out, k, value);
                }
                for (k, v) in edits.into_iter().flatten() {
                    if let Some(v) = v {
                        if !names.iter().any(|(name, _)| name == k) {
                            push_attr(out, k, v);
                        }
                    }
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&tag);
                for child in node.children() {
                    self.serialize_node(child, raw, out);
                }

                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Node::Text(text) => {
                if raw_text {
                    out.push_str(text.as_ref());
                } else {
                    escape_into(out, text.as_ref(), false);
                }
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment.as_ref());
                out.push_str("-->");
            }
            _ => {}
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(out, value, true);
    out.push('"');
}

fn escape_into(out: &mut String, text: &str, attr_mode: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        Document::parse(html, Url::parse("https://example.com:8443/manga/page").unwrap())
    }

    #[test]
    fn origin_drops_path_keeps_port() {
        let d = doc("");
        assert_eq!(d.origin(), "https://example.com:8443");
        let d = Document::parse("", Url::parse("http://example.com/a/b?c=d").unwrap());
        assert_eq!(d.origin(), "http://example.com");
    }

    #[test]
    fn serializes_full_document() {
        let d = doc("<!DOCTYPE html><title>T</title><p class=\"x\">Hi</p><br>");
        assert_eq!(
            d.serialize(),
            "<!DOCTYPE html><html><head><title>T</title></head>\
             <body><p class=\"x\">Hi</p><br></body></html>"
        );
    }

    #[test]
    fn escapes_text_but_not_script_bodies() {
        let d = doc("<p>a &lt; b &amp; c</p><script>if (a < b && c) {}</script>");
        let out = d.serialize();
        assert!(out.contains("<p>a &lt; b &amp; c</p>"));
        assert!(out.contains("<script>if (a < b && c) {}</script>"));
    }

    #[test]
    fn escapes_quotes_in_attributes() {
        let d = doc(r#"<p title="say &quot;hi&quot;">x</p>"#);
        assert!(d.serialize().contains(r#"title="say &quot;hi&quot;""#));
    }

    #[test]
    fn removed_subtree_is_skipped_and_detached() {
        let mut d = doc(r#"<div id="outer"><a href="/x">x</a></div><a href="/y">y</a>"#);
        let outer = Selector::parse("#outer").unwrap();
        let id = d.select(&outer).next().unwrap().id();
        d.remove(id);

        let anchors = Selector::parse("a").unwrap();
        let hrefs: Vec<_> = d
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["/y"]);
        assert!(!d.serialize().contains("outer"));
    }

    #[test]
    fn attribute_edits_apply_on_read_and_write() {
        let mut d = doc(r#"<a href="/x" onclick="go()">x</a>"#);
        let sel = Selector::parse("a").unwrap();
        let id = d.select(&sel).next().unwrap().id();

        d.remove_attr(id, "onclick");
        d.set_attr(id, "href", "/read?url=x");
        d.set_attr(id, "rel", "noopener");

        let a = d.select(&sel).next().unwrap();
        assert_eq!(d.attr(&a, "href"), Some("/read?url=x"));
        assert_eq!(d.attr(&a, "onclick"), None);

        let out = d.serialize();
        assert!(out.contains(r#"<a href="/read?url=x" rel="noopener">x</a>"#));
    }

    #[test]
    fn legacy_doctype_keeps_public_and_system_ids() {
        let d = doc(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN"><p>x</p>"#,
        );
        assert!(d.serialize().starts_with(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN"><html>"#
        ));

        let d = doc(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd"><p>x</p>"#,
        );
        assert!(d.serialize().starts_with(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#
        ));

        let d = doc(r#"<!DOCTYPE html SYSTEM "about:legacy-compat"><p>x</p>"#);
        assert!(d.serialize().starts_with(r#"<!DOCTYPE html SYSTEM "about:legacy-compat">"#));
    }

    #[test]
    fn prefixed_attributes_keep_prefix() {
        let d = doc(r##"<svg><use xlink:href="#icon"></use></svg>"##);
        let out = d.serialize();
        assert!(out.contains(r##"<use xlink:href="#icon"></use>"##), "{out}");
    }

    #[test]
    fn comments_survive() {
        let d = doc("<p>a<!-- note -->b</p>");
        assert!(d.serialize().contains("<p>a<!-- note -->b</p>"));
    }
}
