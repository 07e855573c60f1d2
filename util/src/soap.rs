use bytes::Bytes;
use thiserror::Error;

use super::{
    classmap::ClassMap,
    error::MarshalError,
    generic::{self, Encoding},
    value::Value,
    xml::{self, Element, Prefixes},
};

pub const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const SOAP11_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const SOAP12_ENCODING_NS: &str = "http://www.w3.org/2003/05/soap-encoding";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapVersion {
    #[default]
    V1_1,
    V1_2,
}

impl SoapVersion {
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            SOAP11_ENVELOPE_NS => Some(Self::V1_1),
            SOAP12_ENVELOPE_NS => Some(Self::V1_2),
            _ => None,
        }
    }

    pub fn envelope_namespace(self) -> &'static str {
        match self {
            Self::V1_1 => SOAP11_ENVELOPE_NS,
            Self::V1_2 => SOAP12_ENVELOPE_NS,
        }
    }

    pub fn encoding_namespace(self) -> &'static str {
        match self {
            Self::V1_1 => SOAP11_ENCODING_NS,
            Self::V1_2 => SOAP12_ENCODING_NS,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::V1_1 => "SOAP-ENV",
            Self::V1_2 => "env",
        }
    }

    /// `Content-Type` of a request. SOAP 1.2 carries the action here instead
    /// of in a `SOAPAction` header.
    pub fn content_type(self, action: &str) -> String {
        match self {
            Self::V1_1 => "text/xml; charset=utf-8".to_owned(),
            Self::V1_2 if action.is_empty() => "application/soap+xml; charset=utf-8".to_owned(),
            Self::V1_2 => format!("application/soap+xml; charset=utf-8; action={}", action),
        }
    }

    fn must_understand(self) -> &'static str {
        match self {
            Self::V1_1 => "1",
            Self::V1_2 => "true",
        }
    }

    fn actor_attribute(self) -> &'static str {
        match self {
            Self::V1_1 => "actor",
            Self::V1_2 => "role",
        }
    }
}

/// Out-of-band header element attached to a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapHeader {
    pub namespace: String,
    pub name: String,
    pub value: Value,
    pub must_understand: bool,
    pub actor: Option<String>,
}

impl SoapHeader {
    pub fn new<V: Into<Value>>(namespace: &str, name: &str, value: V) -> Self {
        Self {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            value: value.into(),
            must_understand: false,
            actor: None,
        }
    }

    pub fn must_understand(mut self) -> Self {
        self.must_understand = true;
        self
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_owned());
        self
    }

    pub fn to_element(&self, version: SoapVersion, encoded: bool) -> Result<Element, MarshalError> {
        let envelope = Some(version.envelope_namespace());
        let mut element = Element::new(Some(&self.namespace), self.name.as_str());

        if self.must_understand {
            element = element.with_attribute(envelope, "mustUnderstand", version.must_understand());
        }

        if let Some(actor) = &self.actor {
            element = element.with_attribute(envelope, version.actor_attribute(), actor.as_str());
        }

        let encoding = Encoding {
            encoded,
            encoding_namespace: version.encoding_namespace(),
        };

        generic::encode_value(element, &self.value, encoding)
    }
}

/// Structured SOAP fault, either signalled by the server or raised while
/// reading its response.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{string}")]
pub struct Fault {
    pub code: String,
    pub string: String,
    pub actor: Option<String>,
    pub detail: Option<Value>,
    /// Function whose call produced this fault.
    pub function: Option<String>,
    pub request: Option<Bytes>,
    pub response: Option<Bytes>,
}

impl Fault {
    pub fn new<C: Into<String>, S: Into<String>>(code: C, string: S) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            actor: None,
            detail: None,
            function: None,
            request: None,
            response: None,
        }
    }

    /// Fault blamed on the client side, e.g. an unreadable response.
    pub fn client<S: Into<String>>(string: S) -> Self {
        Self::new("Client", string)
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = Some(function.to_owned());
        self
    }

    pub fn with_request(mut self, request: Bytes) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_response(mut self, response: Bytes) -> Self {
        self.response = Some(response);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub version: SoapVersion,
    pub headers: Vec<Element>,
    pub body: Vec<Element>,
    /// Marks the message as SOAP-encoded (`use="encoded"`).
    pub encoded: bool,
}

impl Envelope {
    pub fn new(version: SoapVersion) -> Self {
        Self {
            version,
            headers: Vec::new(),
            body: Vec::new(),
            encoded: false,
        }
    }

    pub fn to_element(&self) -> Element {
        let namespace = Some(self.version.envelope_namespace());
        let mut envelope = Element::new(namespace, "Envelope");

        if self.encoded && self.version == SoapVersion::V1_1 {
            envelope = envelope.with_attribute(
                namespace,
                "encodingStyle",
                self.version.encoding_namespace(),
            );
        }

        if !self.headers.is_empty() {
            let mut header = Element::new(namespace, "Header");
            for element in &self.headers {
                header.push(element.clone());
            }
            envelope.push(header);
        }

        let mut body = Element::new(namespace, "Body");
        for element in &self.body {
            let mut element = element.clone();

            if self.encoded && self.version == SoapVersion::V1_2 {
                element = element.with_attribute(
                    namespace,
                    "encodingStyle",
                    self.version.encoding_namespace(),
                );
            }

            body.push(element);
        }
        envelope.push(body);

        envelope
    }

    pub fn to_request(&self) -> Result<Vec<u8>, xml::Error> {
        let mut prefixes = Prefixes::default()
            .leading(self.version.prefix(), self.version.envelope_namespace());

        if self.encoded {
            prefixes.declare(xml::XSD_NS);
            prefixes.declare(xml::XSI_NS);
            prefixes.declare(self.version.encoding_namespace());
        }

        xml::to_document(&self.to_element(), prefixes)
    }

    /// Reads a response envelope. Anything that is not a SOAP envelope is
    /// reported as a client fault.
    pub fn from_response(input: &[u8]) -> Result<Self, Fault> {
        let no_document = || Fault::client("looks like we got no XML document");

        let text = std::str::from_utf8(input).map_err(|_| no_document())?;
        let root = xml::parse(text).map_err(|err| {
            tracing::debug!(error = %err, "response is not XML");
            no_document()
        })?;

        if root.name != "Envelope" {
            return Err(Fault::client(
                "looks like we got XML without \"Envelope\" element",
            ));
        }

        let version = root
            .namespace
            .as_deref()
            .and_then(SoapVersion::from_namespace)
            .ok_or_else(|| Fault::new("VersionMismatch", "Wrong Version"))?;

        let headers = root
            .child("Header")
            .map(|header| header.elements().cloned().collect())
            .unwrap_or_default();

        let body = root
            .child("Body")
            .ok_or_else(|| Fault::client("Body must be present in a SOAP envelope"))?
            .elements()
            .cloned()
            .collect();

        Ok(Self {
            version,
            headers,
            body,
            encoded: false,
        })
    }

    /// The fault carried by this envelope, from `Body/Fault` or from a
    /// `faultcode` placed directly in the header.
    pub fn fault(&self, class_map: &ClassMap) -> Option<Fault> {
        if let Some(fault) = self.body.iter().find(|element| element.name == "Fault") {
            return Some(match self.version {
                SoapVersion::V1_1 => read_fault_11(&fault.elements().collect::<Vec<_>>(), class_map),
                SoapVersion::V1_2 => read_fault_12(fault, class_map),
            });
        }

        if self.headers.iter().any(|element| element.name == "faultcode") {
            return Some(read_fault_11(&self.headers.iter().collect::<Vec<_>>(), class_map));
        }

        None
    }
}

fn find<'a>(elements: &[&'a Element], name: &str) -> Option<&'a Element> {
    elements.iter().copied().find(|element| element.name == name)
}

fn read_detail(detail: Option<&Element>, class_map: &ClassMap) -> Option<Value> {
    let detail = detail?;

    if !detail.has_elements() {
        let text = detail.text();
        return (!text.trim().is_empty()).then_some(Value::String(text));
    }

    match generic::decode_value(detail, class_map) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "unable to decode fault detail");
            Some(Value::String(detail.text()))
        }
    }
}

fn read_fault_11(elements: &[&Element], class_map: &ClassMap) -> Fault {
    let text = |name| find(elements, name).map(Element::text);

    Fault {
        code: text("faultcode").unwrap_or_default(),
        string: text("faultstring").unwrap_or_default(),
        actor: text("faultactor"),
        detail: read_detail(find(elements, "detail"), class_map),
        function: None,
        request: None,
        response: None,
    }
}

fn read_fault_12(fault: &Element, class_map: &ClassMap) -> Fault {
    let code = fault
        .child("Code")
        .and_then(|code| code.child("Value"))
        .map(Element::text)
        .unwrap_or_default();

    let string = fault
        .child("Reason")
        .and_then(|reason| reason.child("Text"))
        .map(Element::text)
        .unwrap_or_default();

    let actor = fault
        .child("Role")
        .or_else(|| fault.child("Node"))
        .map(Element::text);

    Fault {
        code,
        string,
        actor,
        detail: read_detail(fault.child("Detail"), class_map),
        function: None,
        request: None,
        response: None,
    }
}
