use std::borrow::Cow;

use quick_xml::{
    escape::{partial_escape, unescape},
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    name::{QName, ResolveResult},
    NsReader, Writer,
};
use thiserror::Error;

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Invalid XML attribute")]
    AttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("Error writing XML output")]
    WriteError(#[from] std::io::Error),

    #[error("Unknown namespace prefix {0}")]
    UnknownPrefix(String),

    #[error("Unexpected end of element")]
    UnexpectedEnd,

    #[error("Unclosed element {0}")]
    UnclosedElement(String),

    #[error("Document has no root element")]
    NoRootElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    /// A `prefix:local` value, resolved against the namespaces in scope.
    QName {
        namespace: Option<String>,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

/// Namespace-resolved XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(namespace: Option<&str>, name: S) -> Self {
        Self {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<S: Into<String>>(
        mut self,
        namespace: Option<&str>,
        name: &str,
        value: S,
    ) -> Self {
        self.attributes.push(Attribute {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.to_owned(),
            value: AttributeValue::Text(value.into()),
        });
        self
    }

    pub fn with_qname_attribute(
        mut self,
        namespace: Option<&str>,
        name: &str,
        value_namespace: Option<&str>,
        value: &str,
    ) -> Self {
        self.attributes.push(Attribute {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.to_owned(),
            value: AttributeValue::QName {
                namespace: value_namespace.map(ToOwned::to_owned),
                name: value.to_owned(),
            },
        });
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name && attribute.namespace.as_deref() == namespace)
            .map(|attribute| &attribute.value)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given local name, in any namespace.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated text and CDATA content of this element (not descendants).
    pub fn text(&self) -> String {
        let mut text = String::new();

        for node in &self.children {
            match node {
                Node::Text(value) | Node::CData(value) => text.push_str(value),
                Node::Element(_) => (),
            }
        }

        text
    }

    /// `xsi:nil="true"`
    pub fn is_nil(&self) -> bool {
        matches!(
            self.attribute(Some(XSI_NS), "nil"),
            Some(AttributeValue::Text(value)) if value == "true" || value == "1"
        )
    }

    /// Resolved `xsi:type`, if present.
    pub fn xsi_type(&self) -> Option<(Option<&str>, &str)> {
        match self.attribute(Some(XSI_NS), "type")? {
            AttributeValue::QName { namespace, name } => Some((namespace.as_deref(), name)),
            AttributeValue::Text(name) => Some((None, name)),
        }
    }
}

fn resolved_namespace(result: ResolveResult<'_>) -> Result<Option<String>, Error> {
    match result {
        ResolveResult::Bound(namespace) => Ok(Some(
            String::from_utf8_lossy(namespace.as_ref()).into_owned(),
        )),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::UnknownPrefix(
            String::from_utf8_lossy(&prefix).into_owned(),
        )),
    }
}

fn is_namespace_declaration(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

/// Resolves a `prefix:local` value against the namespaces currently in scope
/// of `reader`. An unprefixed value takes the default namespace, if any.
pub fn resolve_qname<R>(
    reader: &NsReader<R>,
    value: &str,
) -> Result<(Option<String>, String), Error> {
    let (result, local) = reader.resolve_element(QName(value.as_bytes()));
    let local = String::from_utf8_lossy(local.as_ref()).into_owned();
    Ok((resolved_namespace(result)?, local))
}

fn element_from_start<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<Element, Error> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute = attribute?;

        if is_namespace_declaration(attribute.key.as_ref()) {
            continue;
        }

        let (result, local) = reader.resolve_attribute(attribute.key);
        let attribute_namespace = match resolved_namespace(result) {
            Ok(namespace) => namespace,
            Err(err) if attribute.key.prefix().map(|prefix| prefix.as_ref() == b"xml") == Some(true) => {
                tracing::trace!(error = %err, "reserved xml prefix");
                Some(XML_NS.to_owned())
            }
            Err(err) => return Err(err),
        };
        let attribute_name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let raw = attribute.unescape_value()?.into_owned();

        let value = if attribute_namespace.as_deref() == Some(XSI_NS) && attribute_name == "type" {
            let (namespace, name) = resolve_qname(reader, &raw)?;
            AttributeValue::QName { namespace, name }
        } else {
            AttributeValue::Text(raw)
        };

        attributes.push(Attribute {
            namespace: attribute_namespace,
            name: attribute_name,
            value,
        });
    }

    Ok(Element {
        namespace,
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Whitespace-only text between child elements is indentation, not content.
fn drop_indentation(element: &mut Element) {
    if element.has_elements() {
        element.children.retain(|node| match node {
            Node::Text(text) => !text.trim().is_empty(),
            _ => true,
        });
    }
}

/// Parses a document into a namespace-resolved element tree. Text content is
/// kept verbatim, except for indentation between child elements. Comments and
/// processing instructions are ignored.
pub fn parse(input: &str) -> Result<Element, Error> {
    let mut reader = NsReader::from_str(input);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let (result, event) = reader.read_resolved_event()?;
        let namespace = resolved_namespace(result);

        match event {
            Event::Start(start) => {
                let element = element_from_start(&reader, namespace?, &start)?;
                stack.push(element);
            }

            Event::Empty(start) => {
                let element = element_from_start(&reader, namespace?, &start)?;
                attach(&mut stack, &mut root, element);
            }

            Event::End(..) => {
                let mut element = stack.pop().ok_or(Error::UnexpectedEnd)?;
                drop_indentation(&mut element);
                attach(&mut stack, &mut root, element);
            }

            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.unescape()?.into_owned()));
                }
            }

            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(Node::CData(text));
                }
            }

            Event::Eof => break,

            _ => (),
        }
    }

    if let Some(unclosed) = stack.pop() {
        return Err(Error::UnclosedElement(unclosed.name));
    }

    root.ok_or(Error::NoRootElement)
}

/// Prefix assignment for serialization. Well-known namespaces keep their
/// conventional prefixes; every other namespace gets `ns1`, `ns2`, ... in
/// order of first use.
#[derive(Debug, Clone, Default)]
pub struct Prefixes {
    leading: Vec<(String, String)>,
    generated: Vec<(String, String)>,
    trailing: Vec<(String, String)>,
}

const TRAILING: [(&str, &str); 4] = [
    ("xsd", XSD_NS),
    ("xsi", XSI_NS),
    ("SOAP-ENC", "http://schemas.xmlsoap.org/soap/encoding/"),
    ("enc", "http://www.w3.org/2003/05/soap-encoding"),
];

impl Prefixes {
    /// Declares `namespace` with a fixed `prefix`, ahead of every other
    /// declaration.
    pub fn leading(mut self, prefix: &str, namespace: &str) -> Self {
        self.leading.push((prefix.to_owned(), namespace.to_owned()));
        self
    }

    fn find(&self, namespace: &str) -> Option<&str> {
        self.leading
            .iter()
            .chain(self.generated.iter())
            .chain(self.trailing.iter())
            .find(|(_, value)| value == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn declare(&mut self, namespace: &str) {
        if self.find(namespace).is_some() {
            return;
        }

        if let Some((prefix, _)) = TRAILING.iter().find(|(_, value)| *value == namespace) {
            self.trailing.push(((*prefix).to_owned(), namespace.to_owned()));
            self.trailing.sort_by_key(|(prefix, _)| {
                TRAILING.iter().position(|(known, _)| known == prefix)
            });
        } else {
            let prefix = format!("ns{}", self.generated.len() + 1);
            self.generated.push((prefix, namespace.to_owned()));
        }
    }

    fn collect(&mut self, element: &Element) {
        if let Some(namespace) = &element.namespace {
            self.declare(namespace);
        }

        for attribute in &element.attributes {
            if let Some(namespace) = &attribute.namespace {
                self.declare(namespace);
            }

            if let AttributeValue::QName {
                namespace: Some(namespace),
                ..
            } = &attribute.value
            {
                self.declare(namespace);
            }
        }

        for child in element.elements() {
            self.collect(child);
        }
    }

    fn declarations(&self) -> impl Iterator<Item = &(String, String)> {
        self.leading
            .iter()
            .chain(self.generated.iter())
            .chain(self.trailing.iter())
    }

    fn qualify(&self, namespace: Option<&str>, name: &str) -> String {
        match namespace.and_then(|namespace| self.find(namespace)) {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_owned(),
        }
    }
}

pub trait ToXml {
    fn to_xml<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        prefixes: &Prefixes,
        top_level: bool,
    ) -> Result<(), Error>;
}

impl ToXml for Element {
    fn to_xml<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        prefixes: &Prefixes,
        top_level: bool,
    ) -> Result<(), Error> {
        let name = prefixes.qualify(self.namespace.as_deref(), &self.name);
        let mut start = BytesStart::new(name.as_str());

        if top_level {
            for (prefix, namespace) in prefixes.declarations() {
                let key = format!("xmlns:{}", prefix);
                start.push_attribute((key.as_str(), namespace.as_str()));
            }
        }

        for attribute in &self.attributes {
            let key = prefixes.qualify(attribute.namespace.as_deref(), &attribute.name);
            let value = match &attribute.value {
                AttributeValue::Text(value) => value.clone(),
                AttributeValue::QName { namespace, name } => {
                    prefixes.qualify(namespace.as_deref(), name)
                }
            };

            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;

        for child in &self.children {
            match child {
                Node::Element(element) => element.to_xml(writer, prefixes, false)?,
                Node::Text(text) => write_text(writer, text)?,
                Node::CData(text) => {
                    writer.write_event(Event::CData(BytesCData::new(text.as_str())))?
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Text holding literal `<![CDATA[...]]>` markers is written as real CDATA
/// sections, everything else is escaped.
fn write_text<W: std::io::Write>(writer: &mut Writer<W>, text: &str) -> Result<(), Error> {
    let mut rest = text;

    while let Some(open) = rest.find(CDATA_OPEN) {
        let Some(close) = rest[open..].find(CDATA_CLOSE) else {
            break;
        };

        let (before, section) = (&rest[..open], &rest[open + CDATA_OPEN.len()..open + close]);

        if !before.is_empty() {
            writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(before))))?;
        }

        writer.write_event(Event::CData(BytesCData::new(section)))?;
        rest = &rest[open + close + CDATA_CLOSE.len()..];
    }

    if !rest.is_empty() {
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(rest))))?;
    }

    Ok(())
}

/// Writes `root` as a standalone document: XML declaration, root element with
/// every namespace declaration, trailing newline.
pub fn to_document(root: &Element, mut prefixes: Prefixes) -> Result<Vec<u8>, Error> {
    prefixes.collect(root);

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.get_mut().push(b'\n');
    root.to_xml(&mut writer, &prefixes, true)?;

    let mut document = writer.into_inner();
    document.push(b'\n');
    Ok(document)
}

const ESCAPED_CDATA_OPEN: &str = "&lt;![CDATA[";
const ESCAPED_CDATA_CLOSE: &str = "]]&gt;";

/// Turns escaped `&lt;![CDATA[...]]&gt;` markers in text content back into
/// CDATA sections, entity-decoding their content. Markup, attribute values and
/// existing CDATA sections are copied as they are.
pub fn repair_cdata(document: &str) -> Cow<'_, str> {
    if !document.contains(ESCAPED_CDATA_OPEN) {
        return Cow::Borrowed(document);
    }

    let mut repaired = String::with_capacity(document.len());
    let mut rest = document;

    while !rest.is_empty() {
        let end = if rest.starts_with(CDATA_OPEN) {
            rest.find(CDATA_CLOSE)
                .map_or(rest.len(), |close| close + CDATA_CLOSE.len())
        } else if rest.starts_with('<') {
            // attribute values are written with `<` and `>` escaped
            rest.find('>').map_or(rest.len(), |close| close + 1)
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            repair_text(&rest[..end], &mut repaired);
            rest = &rest[end..];
            continue;
        };

        repaired.push_str(&rest[..end]);
        rest = &rest[end..];
    }

    Cow::Owned(repaired)
}

fn repair_text(text: &str, repaired: &mut String) {
    let mut rest = text;

    while let Some(open) = rest.find(ESCAPED_CDATA_OPEN) {
        let inner_start = open + ESCAPED_CDATA_OPEN.len();
        let Some(close) = rest[inner_start..].find(ESCAPED_CDATA_CLOSE) else {
            break;
        };

        let inner = &rest[inner_start..inner_start + close];
        let decoded = unescape(inner).unwrap_or(Cow::Borrowed(inner));

        repaired.push_str(&rest[..open]);
        repaired.push_str(CDATA_OPEN);
        repaired.push_str(&decoded);
        repaired.push_str(CDATA_CLOSE);

        rest = &rest[inner_start + close + ESCAPED_CDATA_CLOSE.len()..];
    }

    repaired.push_str(rest);
}
