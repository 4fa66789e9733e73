use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

/// An element of a parsed XML document.
///
/// SIARD metadata and content files are small enough to hold as a tree, and the walkers need
/// arbitrary child/sibling navigation, so the pull events from `quick_xml` are assembled into this
/// owned DOM up front. Namespace prefixes are stripped from element and attribute names; XML
/// entity references are decoded during the build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: String) -> Self {
        Element {
            name,
            ..Default::default()
        }
    }

    /// The tag name, without any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concatenated text content directly under this element, unmodified.
    ///
    /// Cell payloads are whitespace-sensitive, so no trimming happens here.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text content with surrounding whitespace removed.
    ///
    /// For metadata fields like `<name>` and `<folder>`, where pretty-printed archives may
    /// introduce incidental whitespace.
    pub fn text_trimmed(&self) -> &str {
        self.text.trim()
    }

    /// The value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The value of the named attribute, or `default` if not present.
    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    /// Iterate over the direct children with the given tag name.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == tag)
    }

    /// The first direct child with the given tag name.
    pub fn child<'a>(&'a self, tag: &'a str) -> Option<&'a Element> {
        self.children_named(tag).next()
    }

    /// The trimmed text of the first direct child with the given tag name, or `""`.
    pub fn child_text<'a>(&'a self, tag: &'a str) -> &'a str {
        self.child(tag).map(Element::text_trimmed).unwrap_or("")
    }

    /// All elements with the given tag name, searched down to `maxdepth` levels below this
    /// element (depth 0 is this element itself).
    pub fn find_all<'a>(&'a self, tag: &str, maxdepth: usize) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(tag, maxdepth, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, tag: &str, depth_left: usize, found: &mut Vec<&'a Element>) {
        if self.name == tag {
            found.push(self);
        }

        if depth_left == 0 {
            return;
        }

        for child in &self.children {
            child.collect_named(tag, depth_left - 1, found);
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// The root element of the document.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Parse the XML file at `path`.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::parse_reader(BufReader::new(file))
    }

    /// Parse an XML document from a string.
    pub fn parse_str(xml: &str) -> crate::Result<Self> {
        Self::parse_reader(xml.as_bytes())
    }

    /// Parse an XML document from a buffered reader.
    pub fn parse_reader<R: BufRead>(reader: R) -> crate::Result<Self> {
        let mut reader = Reader::from_reader(reader);
        let mut buf = Vec::new();

        // Open elements, innermost last. Finished elements attach to their parent when their end
        // tag arrives; the outermost one becomes the root.
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    stack.push(open_element(&start)?);
                }
                Event::Empty(start) => {
                    let element = open_element(&start)?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => {}
                    }
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(top) = stack.last_mut() {
                        top.text
                            .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| crate::Error::Xml {
                        reason: String::from("unexpected closing tag"),
                    })?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => {}
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry nothing the
                // walkers need.
                _ => {}
            }

            buf.clear();
        }

        root.ok_or_else(|| crate::Error::Xml {
            reason: String::from("document has no root element"),
        })
        .map(|root| Document { root })
    }
}

fn open_element(start: &quick_xml::events::BytesStart) -> crate::Result<Element> {
    let mut element = Element::new(local_name(start.name().as_ref()));

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        element.attrs.push((
            local_name(attr.key.local_name().as_ref()),
            attr.unescape_value()?.into_owned(),
        ));
    }

    Ok(element)
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);

    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_string(),
        None => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use xpct::{be_none, be_ok, be_some, equal, expect};

    #[test]
    fn parse_nested_elements_and_attributes() -> crate::Result<()> {
        let doc = Document::parse_str(
            r#"<table version="2.1"><row><c1 file="lob0" length="3"/><c2>x</c2></row></table>"#,
        )?;

        let root = doc.root();

        expect!(root.name()).to(equal("table"));
        expect!(root.attr("version")).to(be_some()).to(equal("2.1"));

        let row = expect!(root.child("row")).to(be_some()).into_inner();
        let c1 = expect!(row.child("c1")).to(be_some()).into_inner();

        expect!(c1.attr("file")).to(be_some()).to(equal("lob0"));
        expect!(c1.attr("missing")).to(be_none());
        expect!(row.child_text("c2")).to(equal("x"));

        Ok(())
    }

    #[test]
    fn text_is_unescaped_and_untrimmed() -> crate::Result<()> {
        let doc = Document::parse_str("<c1> O&apos;Hara &amp; co </c1>")?;

        expect!(doc.root().text()).to(equal(" O'Hara & co "));
        expect!(doc.root().text_trimmed()).to(equal("O'Hara & co"));

        Ok(())
    }

    #[test]
    fn namespace_prefixes_are_stripped() -> crate::Result<()> {
        let doc = Document::parse_str(
            r#"<ns:siardArchive xmlns:ns="http://example.com" ns:version="2.2"><ns:schemas/></ns:siardArchive>"#,
        )?;

        expect!(doc.root().name()).to(equal("siardArchive"));
        expect!(doc.root().attr("version")).to(be_some()).to(equal("2.2"));
        expect!(doc.root().child("schemas")).to(be_some());

        Ok(())
    }

    #[test]
    fn find_all_respects_maxdepth() -> crate::Result<()> {
        let doc = Document::parse_str(
            "<a><name>top</name><b><name>mid</name><c><name>deep</name></c></b></a>",
        )?;

        expect!(doc.root().find_all("name", 1).len()).to(equal(1));
        expect!(doc.root().find_all("name", 2).len()).to(equal(2));
        expect!(doc.root().find_all("name", 9).len()).to(equal(3));

        Ok(())
    }

    #[test]
    fn missing_root_is_an_error() {
        expect!(Document::parse_str("  ")).to_not(be_ok());
    }

    #[test]
    fn whitespace_between_children_does_not_hide_them() -> crate::Result<()> {
        let doc = Document::parse_str("<row>\n  <c1>1</c1>\n  <c2>2</c2>\n</row>")?;

        expect!(doc.root().child("c1")).to(be_some());
        expect!(doc.root().child_text("c2")).to(equal("2"));

        Ok(())
    }
}
