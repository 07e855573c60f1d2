use quick_xml::{
    events::{BytesStart, BytesText, Event},
    name::ResolveResult,
    NsReader,
};
use suds_util::{
    soap::SoapVersion,
    xml::{self, XSD_NS},
};
use tracing::{debug, trace, warn};

use super::{
    error::Error,
    types::{
        Binding, BindingOperation, BodyBinding, Definition, ElementDecl, Field, FieldKind,
        Message, NamespacedName, Operation, Part, PartKind, Port, PortType, Service, Style, Type,
        TypeKind, Use,
    },
};

const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
const WSDL_SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

type Reader<'a> = NsReader<&'a [u8]>;

fn get_attributes<const N: usize>(
    start: &BytesStart<'_>,
    names: [&'static str; N],
) -> Result<[Option<String>; N], Error> {
    const INIT: Option<String> = None;
    let mut result = [INIT; N];

    for attribute in start.attributes() {
        let attribute = attribute?;

        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }

        let key = attribute.key.local_name();

        for (index, name) in names.iter().enumerate() {
            if key.as_ref() == name.as_bytes() {
                result[index] = Some(attribute.unescape_value()?.into_owned());
                break;
            }
        }
    }

    Ok(result)
}

fn required(
    value: Option<String>,
    element: &'static str,
    attribute: &'static str,
) -> Result<String, Error> {
    value.ok_or(Error::MissingAttribute { element, attribute })
}

fn owned_namespace(result: ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        _ => None,
    }
}

fn soap_version(namespace: Option<&str>) -> Option<SoapVersion> {
    match namespace? {
        WSDL_SOAP11_NS => Some(SoapVersion::V1_1),
        WSDL_SOAP12_NS => Some(SoapVersion::V1_2),
        _ => None,
    }
}

fn parse_occurs(value: Option<String>, attribute: &'static str) -> Result<Option<u32>, Error> {
    match value {
        None => Ok(Some(1)),
        Some(value) if value == "unbounded" => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidAttribute {
                element: "element",
                attribute,
                value,
            }),
    }
}

fn any_type() -> NamespacedName {
    NamespacedName::new(Some(XSD_NS), "anyType")
}

#[derive(Debug, Clone)]
struct Scope {
    target: Option<String>,
    qualified: bool,
}

struct Parser {
    definition: Definition,
    scopes: Vec<Scope>,
    seen_root: bool,
}

#[derive(Debug)]
enum ParseState {
    Definitions,

    Types,
    Schema,
    Element {
        name: String,
        ty: Option<NamespacedName>,
        nillable: bool,
        inner: Option<TypeKind>,
    },
    ComplexType {
        name: Option<String>,
        kind: Option<TypeKind>,
    },
    ComplexContent {
        kind: Option<TypeKind>,
    },
    ComplexExtension {
        base: NamespacedName,
        fields: Vec<Field>,
    },
    ComplexRestriction {
        item: Option<NamespacedName>,
        fields: Vec<Field>,
    },
    SimpleContent {
        ty: Option<NamespacedName>,
    },
    SimpleExtension {
        ty: NamespacedName,
    },
    Sequence(Vec<Field>),
    SequenceElement {
        name: String,
        namespace: Option<String>,
        ty: Option<FieldKind>,
        min_occurs: u32,
        max_occurs: Option<u32>,
        nillable: bool,
        inner: Option<TypeKind>,
    },
    SimpleType {
        name: Option<String>,
        ty: Option<NamespacedName>,
    },
    Restriction {
        ty: NamespacedName,
    },

    Message {
        name: String,
        parts: Vec<Part>,
    },
    Part(Part),

    PortType {
        name: String,
        operations: Vec<Operation>,
    },
    Operation {
        name: String,
        documentation: Option<String>,
        input: Option<NamespacedName>,
        output: Option<NamespacedName>,
    },
    Documentation(Option<String>),
    Input {
        message: NamespacedName,
    },
    Output {
        message: NamespacedName,
    },

    Binding {
        name: String,
        ty: NamespacedName,
        version: Option<SoapVersion>,
        style: Option<Style>,
        transport: Option<String>,
        operations: Vec<BindingOperation>,
    },
    Transport {
        version: SoapVersion,
        style: Option<Style>,
        transport: Option<String>,
    },
    BindingOperation {
        name: String,
        action: Option<String>,
        style: Option<Style>,
        input: Option<BodyBinding>,
        output: Option<BodyBinding>,
    },
    OperationAction {
        action: Option<String>,
        style: Option<Style>,
    },
    BindingInput {
        body: Option<BodyBinding>,
    },
    BindingOutput {
        body: Option<BodyBinding>,
    },
    BindingBody {
        body: BodyBinding,
    },

    Service {
        name: String,
        documentation: Option<String>,
        ports: Vec<Port>,
    },
    Port {
        name: String,
        binding: NamespacedName,
        address: Option<String>,
    },
    Address {
        location: String,
    },

    Other(String),
}

impl Parser {
    fn new() -> Self {
        Self {
            definition: Default::default(),
            scopes: Vec::new(),
            seen_root: false,
        }
    }

    fn push_scope(&mut self, target: Option<String>, qualified: bool) {
        self.scopes.push(Scope { target, qualified });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn target_namespace(&self) -> Option<&str> {
        self.scopes.last().and_then(|scope| scope.target.as_deref())
    }

    fn target_namespaced(&self, name: String) -> NamespacedName {
        NamespacedName {
            namespace: self.target_namespace().map(ToOwned::to_owned),
            name,
        }
    }

    /// Namespace a local element declaration is written in.
    fn local_element_namespace(&self, form: Option<&str>) -> Option<String> {
        let qualified = match form {
            Some(form) => form == "qualified",
            None => self.scopes.last().map_or(false, |scope| scope.qualified),
        };

        qualified
            .then(|| self.target_namespace().map(ToOwned::to_owned))
            .flatten()
    }

    fn resolve_namespace(reader: &Reader<'_>, prefixed_name: &str) -> Result<NamespacedName, Error> {
        let (namespace, name) = xml::resolve_qname(reader, prefixed_name.trim())?;
        Ok(NamespacedName { namespace, name })
    }

    fn parse(mut self, input: &str) -> Result<Definition, Error> {
        let mut reader = NsReader::from_str(input);
        reader.config_mut().trim_text(true);

        self.parse_xml(&mut reader)?;

        if !self.seen_root {
            return Err(Error::MissingDefinitions);
        }

        Ok(self.definition)
    }

    fn parse_xml(&mut self, reader: &mut Reader<'_>) -> Result<(), Error> {
        let mut stack = Vec::new();

        loop {
            let (result, event) = reader.read_resolved_event()?;
            let namespace = owned_namespace(result);

            match event {
                Event::Decl(..) => (),

                Event::Start(start) => self.handle_start(&mut stack, reader, &start, namespace)?,
                Event::End(..) => self.handle_end(&mut stack)?,

                Event::Empty(start) => {
                    self.handle_start(&mut stack, reader, &start, namespace)?;
                    self.handle_end(&mut stack)?;
                }

                Event::Text(text) => self.handle_text(&mut stack, text)?,

                Event::Eof => break,

                event => trace!("skipping {:?}", event),
            }
        }

        if !stack.is_empty() {
            return Err(Error::UnexpectedEof);
        }

        Ok(())
    }

    fn handle_start(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<'_>,
        start: &BytesStart<'_>,
        namespace: Option<String>,
    ) -> Result<(), Error> {
        let local_name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let local_name = local_name.as_str();
        let namespace = namespace.as_deref();

        let state = stack.pop();
        let mut new_state = ParseState::Other(local_name.to_owned());

        match state.as_ref() {
            None => match local_name {
                "definitions" if !self.seen_root => {
                    let [target] = get_attributes(start, ["targetNamespace"])?;

                    self.seen_root = true;
                    self.definition.target_namespace = target.clone();
                    self.push_scope(target, true);

                    new_state = ParseState::Definitions;
                }

                _ => return Err(Error::MissingDefinitions),
            },

            Some(ParseState::Definitions) => match local_name {
                "import" => {
                    let [location, import_namespace] =
                        get_attributes(start, ["location", "namespace"])?;
                    warn!(?location, ?import_namespace, "skipping WSDL import");
                }

                "documentation" => new_state = ParseState::Documentation(None),

                "types" => new_state = ParseState::Types,

                "message" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::Message {
                        name: required(name, "message", "name")?,
                        parts: Vec::new(),
                    };
                }

                "portType" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::PortType {
                        name: required(name, "portType", "name")?,
                        operations: Vec::new(),
                    };
                }

                "binding" => {
                    let [name, ty] = get_attributes(start, ["name", "type"])?;

                    new_state = ParseState::Binding {
                        name: required(name, "binding", "name")?,
                        ty: Self::resolve_namespace(reader, &required(ty, "binding", "type")?)?,
                        version: None,
                        style: None,
                        transport: None,
                        operations: Vec::new(),
                    };
                }

                "service" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::Service {
                        name: required(name, "service", "name")?,
                        documentation: None,
                        ports: Vec::new(),
                    };
                }

                _ => trace!("found {} inside definitions block", local_name),
            },

            Some(ParseState::Types) => match local_name {
                "schema" => {
                    let [target, element_form] =
                        get_attributes(start, ["targetNamespace", "elementFormDefault"])?;

                    self.push_scope(target, element_form.as_deref() == Some("qualified"));
                    new_state = ParseState::Schema;
                }

                _ => trace!("found {} inside types block", local_name),
            },

            Some(ParseState::Schema) => match local_name {
                "element" => {
                    let [name, ty, nillable] = get_attributes(start, ["name", "type", "nillable"])?;

                    new_state = ParseState::Element {
                        name: required(name, "element", "name")?,
                        ty: ty
                            .map(|ty| Self::resolve_namespace(reader, &ty))
                            .transpose()?,
                        nillable: nillable.as_deref() == Some("true"),
                        inner: None,
                    };
                }

                "complexType" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::ComplexType {
                        name: Some(required(name, "complexType", "name")?),
                        kind: None,
                    };
                }

                "simpleType" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::SimpleType {
                        name: Some(required(name, "simpleType", "name")?),
                        ty: None,
                    };
                }

                "include" | "import" => {
                    let [location, import_namespace] =
                        get_attributes(start, ["schemaLocation", "namespace"])?;
                    debug!(?location, ?import_namespace, "skipping schema import");
                }

                _ => trace!("found {} inside schema block", local_name),
            },

            Some(ParseState::Element { .. } | ParseState::SequenceElement { .. }) => match local_name {
                "complexType" => {
                    new_state = ParseState::ComplexType {
                        name: None,
                        kind: None,
                    }
                }

                "simpleType" => new_state = ParseState::SimpleType { name: None, ty: None },

                _ => trace!("found {} inside element block", local_name),
            },

            Some(ParseState::ComplexType { .. }) => match local_name {
                "sequence" | "all" | "choice" => new_state = ParseState::Sequence(Vec::new()),

                "simpleContent" => new_state = ParseState::SimpleContent { ty: None },

                "complexContent" => new_state = ParseState::ComplexContent { kind: None },

                _ => trace!("found {} inside complex type block", local_name),
            },

            Some(ParseState::ComplexContent { .. }) => match local_name {
                "extension" => {
                    let [base] = get_attributes(start, ["base"])?;
                    let base = Self::resolve_namespace(reader, &required(base, "extension", "base")?)?;

                    new_state = ParseState::ComplexExtension {
                        base,
                        fields: Vec::new(),
                    };
                }

                "restriction" => {
                    new_state = ParseState::ComplexRestriction {
                        item: None,
                        fields: Vec::new(),
                    };
                }

                _ => trace!("found {} inside complex content block", local_name),
            },

            Some(ParseState::ComplexExtension { .. }) => match local_name {
                "sequence" | "all" | "choice" => new_state = ParseState::Sequence(Vec::new()),

                _ => trace!("found {} inside complex extension block", local_name),
            },

            Some(ParseState::ComplexRestriction { .. }) => match local_name {
                "sequence" | "all" | "choice" => new_state = ParseState::Sequence(Vec::new()),

                "attribute" => {
                    let [array_type] = get_attributes(start, ["arrayType"])?;

                    if let Some(array_type) = array_type {
                        // "xsd:string[]" names the item type
                        let item = array_type.split('[').next().unwrap_or_default();
                        let item = Self::resolve_namespace(reader, item)?;

                        new_state = ParseState::SimpleExtension { ty: item };
                    }
                }

                _ => trace!("found {} inside complex restriction block", local_name),
            },

            Some(ParseState::SimpleExtension { .. }) => {
                trace!("found {} inside simple extension block", local_name)
            }

            Some(ParseState::SimpleContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(start, ["base"])?;
                    let ty = Self::resolve_namespace(reader, &required(base, "extension", "base")?)?;

                    new_state = ParseState::SimpleExtension { ty };
                }

                _ => trace!("found {} inside simple content block", local_name),
            },

            Some(ParseState::SimpleType { .. }) => match local_name {
                "restriction" => {
                    let [base] = get_attributes(start, ["base"])?;
                    let ty = Self::resolve_namespace(reader, &required(base, "restriction", "base")?)?;

                    new_state = ParseState::Restriction { ty };
                }

                _ => trace!("found {} inside simple type block", local_name),
            },

            Some(ParseState::Restriction { .. }) => {
                trace!("found {} inside restriction block", local_name)
            }

            Some(ParseState::Sequence(_)) => match local_name {
                "element" => {
                    let [name, ty, reference, min_occurs, max_occurs, nillable, form] =
                        get_attributes(
                            start,
                            ["name", "type", "ref", "minOccurs", "maxOccurs", "nillable", "form"],
                        )?;

                    let min_occurs = parse_occurs(min_occurs, "minOccurs")?.unwrap_or(1);
                    let max_occurs = parse_occurs(max_occurs, "maxOccurs")?;
                    let nillable = nillable.as_deref() == Some("true");

                    new_state = match reference {
                        Some(reference) => {
                            let reference = Self::resolve_namespace(reader, &reference)?;

                            ParseState::SequenceElement {
                                name: reference.name.clone(),
                                namespace: reference.namespace.clone(),
                                ty: Some(FieldKind::Ref(reference)),
                                min_occurs,
                                max_occurs,
                                nillable,
                                inner: None,
                            }
                        }

                        None => ParseState::SequenceElement {
                            name: required(name, "element", "name")?,
                            namespace: self.local_element_namespace(form.as_deref()),
                            ty: ty
                                .map(|ty| Self::resolve_namespace(reader, &ty).map(FieldKind::Type))
                                .transpose()?,
                            min_occurs,
                            max_occurs,
                            nillable,
                            inner: None,
                        },
                    };
                }

                "sequence" | "all" | "choice" => new_state = ParseState::Sequence(Vec::new()),

                _ => trace!("found {} inside sequence block", local_name),
            },

            Some(ParseState::Message { .. }) => match local_name {
                "part" => {
                    let [name, element, ty] = get_attributes(start, ["name", "element", "type"])?;
                    let name = required(name, "part", "name")?;

                    let kind = match (element, ty) {
                        (Some(element), _) => {
                            PartKind::Element(Self::resolve_namespace(reader, &element)?)
                        }
                        (None, Some(ty)) => PartKind::Type(Self::resolve_namespace(reader, &ty)?),
                        (None, None) => {
                            return Err(Error::MissingAttribute {
                                element: "part",
                                attribute: "element",
                            })
                        }
                    };

                    new_state = ParseState::Part(Part { name, kind });
                }

                _ => trace!("found {} inside message block", local_name),
            },

            Some(ParseState::PortType { .. }) => match local_name {
                "operation" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::Operation {
                        name: required(name, "operation", "name")?,
                        documentation: None,
                        input: None,
                        output: None,
                    }
                }

                _ => trace!("found {} inside port type block", local_name),
            },

            Some(ParseState::Operation { .. }) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "input" | "output" => {
                    let element = if local_name == "input" { "input" } else { "output" };
                    let [message] = get_attributes(start, ["message"])?;
                    let message =
                        Self::resolve_namespace(reader, &required(message, element, "message")?)?;

                    if local_name == "input" {
                        new_state = ParseState::Input { message }
                    } else {
                        new_state = ParseState::Output { message }
                    }
                }

                _ => trace!("found {} inside operation block", local_name),
            },

            Some(ParseState::Binding { .. }) => match local_name {
                "binding" => match soap_version(namespace) {
                    Some(version) => {
                        let [transport, style] = get_attributes(start, ["transport", "style"])?;

                        new_state = ParseState::Transport {
                            version,
                            style: style.as_deref().and_then(Style::parse),
                            transport,
                        }
                    }

                    None => debug!(?namespace, "skipping non-SOAP binding"),
                },

                "operation" => {
                    let [name] = get_attributes(start, ["name"])?;

                    new_state = ParseState::BindingOperation {
                        name: required(name, "operation", "name")?,
                        action: None,
                        style: None,
                        input: None,
                        output: None,
                    }
                }

                _ => trace!("found {} inside binding block", local_name),
            },

            Some(ParseState::BindingOperation { .. }) => match local_name {
                "operation" if soap_version(namespace).is_some() => {
                    let [action, style] = get_attributes(start, ["soapAction", "style"])?;

                    new_state = ParseState::OperationAction {
                        action,
                        style: style.as_deref().and_then(Style::parse),
                    };
                }

                "input" => new_state = ParseState::BindingInput { body: None },
                "output" => new_state = ParseState::BindingOutput { body: None },

                _ => trace!("found {} inside binding operation block", local_name),
            },

            Some(ParseState::BindingInput { .. } | ParseState::BindingOutput { .. }) => {
                match local_name {
                    "body" if soap_version(namespace).is_some() => {
                        let [body_use, body_namespace] = get_attributes(start, ["use", "namespace"])?;

                        new_state = ParseState::BindingBody {
                            body: BodyBinding {
                                body_use: body_use.as_deref().and_then(Use::parse).unwrap_or_default(),
                                namespace: body_namespace,
                            },
                        };
                    }

                    _ => trace!("found {} inside binding message block", local_name),
                }
            }

            Some(ParseState::Service { .. }) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "port" => {
                    let [name, binding] = get_attributes(start, ["name", "binding"])?;

                    new_state = ParseState::Port {
                        name: required(name, "port", "name")?,
                        binding: Self::resolve_namespace(reader, &required(binding, "port", "binding")?)?,
                        address: None,
                    };
                }

                _ => trace!("found {} inside service block", local_name),
            },

            Some(ParseState::Port { .. }) => match local_name {
                "address" => {
                    let [location] = get_attributes(start, ["location"])?;

                    new_state = ParseState::Address {
                        location: required(location, "address", "location")?,
                    }
                }

                _ => trace!("found {} inside port block", local_name),
            },

            Some(ParseState::Other(name)) => {
                trace!("found {} inside {} block", local_name, name);
            }

            Some(state) => trace!("found {} inside {:?}", local_name, state),
        }

        stack.extend(state);
        stack.push(new_state);

        Ok(())
    }

    fn handle_end(&mut self, stack: &mut Vec<ParseState>) -> Result<(), Error> {
        let finished_state = stack.pop();
        let mut next_state = stack.pop();

        match finished_state {
            Some(ParseState::Definitions | ParseState::Schema) => self.pop_scope(),

            Some(ParseState::Element {
                name,
                ty,
                nillable,
                inner,
            }) => {
                let ty = match (inner, ty) {
                    (Some(kind), _) => FieldKind::Inner(kind),
                    (None, Some(ty)) => FieldKind::Type(ty),
                    (None, None) => FieldKind::Type(any_type()),
                };

                let name = self.target_namespaced(name);
                self.definition.elements.push(ElementDecl { name, ty, nillable })
            }

            Some(ParseState::ComplexType { name, kind }) => {
                let kind = kind.unwrap_or(TypeKind::Struct {
                    base: None,
                    fields: Vec::new(),
                });

                match next_state {
                    Some(
                        ParseState::SequenceElement { ref mut inner, .. }
                        | ParseState::Element { ref mut inner, .. },
                    ) => *inner = Some(kind),

                    _ => {
                        if let Some(name) = name {
                            let name = self.target_namespaced(name);
                            self.definition.types.push(Type { name, kind })
                        }
                    }
                }
            }

            Some(ParseState::ComplexContent { kind: content }) => match next_state {
                Some(ParseState::ComplexType { ref mut kind, .. }) if kind.is_none() => {
                    *kind = content
                }

                _ => (),
            },

            Some(ParseState::ComplexExtension { base, fields }) => match next_state {
                Some(ParseState::ComplexContent { ref mut kind }) => {
                    *kind = Some(TypeKind::Struct {
                        base: Some(base),
                        fields,
                    })
                }

                _ => (),
            },

            Some(ParseState::ComplexRestriction { item, fields }) => match next_state {
                Some(ParseState::ComplexContent { ref mut kind }) => {
                    *kind = Some(match item {
                        Some(item) => TypeKind::Array(item),
                        None => TypeKind::Struct { base: None, fields },
                    })
                }

                _ => (),
            },

            Some(ParseState::SimpleContent { ty }) => match next_state {
                Some(ParseState::ComplexType { ref mut kind, .. }) if kind.is_none() => {
                    *kind = Some(TypeKind::Alias(
                        ty.unwrap_or_else(|| NamespacedName::new(Some(XSD_NS), "string")),
                    ))
                }

                _ => (),
            },

            Some(ParseState::SimpleExtension { ty: base }) => match next_state {
                Some(ParseState::SimpleContent { ref mut ty }) => *ty = Some(base),

                Some(ParseState::ComplexRestriction { ref mut item, .. }) => *item = Some(base),

                _ => (),
            },

            Some(ParseState::SimpleType { name, ty }) => {
                let kind = TypeKind::Simple(
                    ty.unwrap_or_else(|| NamespacedName::new(Some(XSD_NS), "string")),
                );

                match next_state {
                    Some(
                        ParseState::SequenceElement { ref mut inner, .. }
                        | ParseState::Element { ref mut inner, .. },
                    ) => *inner = Some(kind),

                    _ => {
                        if let Some(name) = name {
                            let name = self.target_namespaced(name);
                            self.definition.types.push(Type { name, kind })
                        }
                    }
                }
            }

            Some(ParseState::Restriction { ty: base }) => match next_state {
                Some(ParseState::SimpleType { ref mut ty, .. }) => *ty = Some(base),
                _ => (),
            },

            Some(ParseState::Sequence(fields)) => match next_state {
                Some(ParseState::ComplexType { ref mut kind, .. }) if kind.is_none() => {
                    *kind = Some(TypeKind::Struct { base: None, fields })
                }

                Some(
                    ParseState::ComplexExtension {
                        fields: ref mut outer,
                        ..
                    }
                    | ParseState::ComplexRestriction {
                        fields: ref mut outer,
                        ..
                    }
                    | ParseState::Sequence(ref mut outer),
                ) => outer.extend(fields),

                _ => (),
            },

            Some(ParseState::SequenceElement {
                name,
                namespace,
                ty,
                min_occurs,
                max_occurs,
                nillable,
                inner,
            }) => match next_state {
                Some(ParseState::Sequence(ref mut fields)) => fields.push(Field {
                    name,
                    namespace,
                    ty: match (inner, ty) {
                        (Some(kind), _) => FieldKind::Inner(kind),
                        (None, Some(ty)) => ty,
                        (None, None) => FieldKind::Type(any_type()),
                    },
                    min_occurs,
                    max_occurs,
                    nillable,
                }),
                _ => (),
            },

            Some(ParseState::Message { name, parts }) => {
                let name = self.target_namespaced(name);
                self.definition.messages.push(Message { name, parts })
            }

            Some(ParseState::Part(part)) => match next_state {
                Some(ParseState::Message { ref mut parts, .. }) => parts.push(part),
                _ => (),
            },

            Some(ParseState::PortType { name, operations }) => {
                let name = self.target_namespaced(name);
                self.definition
                    .port_types
                    .push(PortType { name, operations })
            }

            Some(ParseState::Operation {
                name,
                input,
                output,
                documentation,
            }) => match next_state {
                Some(ParseState::PortType {
                    ref mut operations, ..
                }) => operations.push(Operation {
                    name,
                    input,
                    output,
                    documentation,
                }),
                _ => (),
            },

            Some(ParseState::Documentation(text)) => match next_state {
                Some(
                    ParseState::Operation {
                        ref mut documentation,
                        ..
                    }
                    | ParseState::Service {
                        ref mut documentation,
                        ..
                    },
                ) => *documentation = text,
                _ => (),
            },

            Some(ParseState::Input { message }) => match next_state {
                Some(ParseState::Operation { ref mut input, .. }) if input.is_none() => {
                    *input = Some(message)
                }
                _ => (),
            },

            Some(ParseState::Output { message }) => match next_state {
                Some(ParseState::Operation { ref mut output, .. }) if output.is_none() => {
                    *output = Some(message)
                }
                _ => (),
            },

            Some(ParseState::Transport {
                version: found,
                style: binding_style,
                transport: binding_transport,
            }) => match next_state {
                Some(ParseState::Binding {
                    ref mut version,
                    ref mut style,
                    ref mut transport,
                    ..
                }) => {
                    *version = Some(found);
                    *style = binding_style;
                    *transport = binding_transport;
                }
                _ => (),
            },

            Some(ParseState::Binding {
                name,
                ty,
                version,
                style,
                transport,
                operations,
            }) => {
                let name = self.target_namespaced(name);
                self.definition.bindings.push(Binding {
                    name,
                    ty,
                    version,
                    style,
                    transport,
                    operations,
                })
            }

            Some(ParseState::BindingOperation {
                name,
                action,
                style,
                input,
                output,
            }) => match next_state {
                Some(ParseState::Binding {
                    ref mut operations, ..
                }) => operations.push(BindingOperation {
                    name,
                    action,
                    style,
                    input,
                    output,
                }),
                _ => (),
            },

            Some(ParseState::OperationAction { action, style }) => match next_state {
                Some(ParseState::BindingOperation {
                    action: ref mut a,
                    style: ref mut s,
                    ..
                }) => {
                    *a = action;
                    *s = style;
                }
                _ => (),
            },

            Some(ParseState::BindingInput { body }) => match next_state {
                Some(ParseState::BindingOperation { ref mut input, .. }) => *input = body,
                _ => (),
            },

            Some(ParseState::BindingOutput { body }) => match next_state {
                Some(ParseState::BindingOperation { ref mut output, .. }) => *output = body,
                _ => (),
            },

            Some(ParseState::BindingBody { body: binding }) => match next_state {
                Some(
                    ParseState::BindingInput { ref mut body }
                    | ParseState::BindingOutput { ref mut body },
                ) => *body = Some(binding),
                _ => (),
            },

            Some(ParseState::Service {
                name,
                documentation,
                ports,
            }) => self.definition.services.push(Service {
                name,
                documentation,
                ports,
            }),

            Some(ParseState::Port {
                name,
                binding,
                address,
            }) => match next_state {
                Some(ParseState::Service { ref mut ports, .. }) => ports.push(Port {
                    name,
                    binding,
                    location: address,
                }),
                _ => (),
            },

            Some(ParseState::Address { location }) => match next_state {
                Some(ParseState::Port {
                    ref mut address, ..
                }) => *address = Some(location),
                _ => (),
            },

            _ => (),
        }

        stack.extend(next_state);
        Ok(())
    }

    fn handle_text(&mut self, stack: &mut [ParseState], text: BytesText<'_>) -> Result<(), Error> {
        if let Some(ParseState::Documentation(ref mut docs)) = stack.last_mut() {
            *docs = Some(text.unescape()?.into_owned());
        }

        Ok(())
    }
}

pub fn parse(input: &str) -> Result<Definition, Error> {
    Parser::new().parse(input)
}
