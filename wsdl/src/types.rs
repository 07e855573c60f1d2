use std::fmt;

use suds_util::{
    soap::{SoapVersion, SOAP11_ENCODING_NS, SOAP12_ENCODING_NS},
    xml::XSD_NS,
};

const MAX_BASE_DEPTH: usize = 16;

/// Qualified name, resolved against the prefixes in scope where it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Rpc,
    #[default]
    Document,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Use {
    #[default]
    Literal,
    Encoded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Struct {
        base: Option<NamespacedName>,
        fields: Vec<Field>,
    },
    /// SOAP-encoded array of the given item type.
    Array(NamespacedName),
    Simple(NamespacedName),
    Alias(NamespacedName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub name: NamespacedName,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Type(NamespacedName),
    Inner(TypeKind),
    /// `<element ref="..."/>`
    Ref(NamespacedName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Namespace of the element on the wire, `None` when unqualified.
    pub namespace: Option<String>,
    pub ty: FieldKind,
    pub min_occurs: u32,
    /// `None` for `unbounded`.
    pub max_occurs: Option<u32>,
    pub nillable: bool,
}

/// Global `<element>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub name: NamespacedName,
    pub ty: FieldKind,
    pub nillable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartKind {
    Element(NamespacedName),
    Type(NamespacedName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub kind: PartKind,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

/// `<soap:body>` of a binding operation's input or output.
#[derive(Debug, Default, Clone)]
pub struct BodyBinding {
    pub body_use: Use,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub name: String,
    pub action: Option<String>,
    pub style: Option<Style>,
    pub input: Option<BodyBinding>,
    pub output: Option<BodyBinding>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    /// `None` for non-SOAP (e.g. HTTP) bindings.
    pub version: Option<SoapVersion>,
    pub style: Option<Style>,
    pub transport: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub documentation: Option<String>,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub target_namespace: Option<String>,
    pub types: Vec<Type>,
    pub elements: Vec<ElementDecl>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

impl NamespacedName {
    pub fn new<S: Into<String>>(namespace: Option<&str>, name: S) -> Self {
        Self {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.into(),
        }
    }

    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// XSD or SOAP-encoding built-in type.
    pub fn is_builtin(&self) -> bool {
        self.is_in(XSD_NS) || self.is_in(SOAP11_ENCODING_NS) || self.is_in(SOAP12_ENCODING_NS)
    }

    /// Built-in types without a fixed shape: `anyType`, `Array`, `Struct`.
    pub fn is_untyped(&self) -> bool {
        self.is_builtin() && matches!(self.name.as_str(), "anyType" | "Array" | "Struct")
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{{{}}}{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl Style {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rpc" => Some(Self::Rpc),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

impl Use {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "literal" => Some(Self::Literal),
            "encoded" => Some(Self::Encoded),
            _ => None,
        }
    }
}

impl Field {
    pub fn is_list(&self) -> bool {
        self.max_occurs.map_or(true, |max| max > 1)
    }

    pub fn is_optional(&self) -> bool {
        self.min_occurs == 0
    }
}

impl Definition {
    pub fn find_type(&self, name: &NamespacedName) -> Option<&Type> {
        self.types.iter().find(|ty| &ty.name == name)
    }

    pub fn find_element(&self, name: &NamespacedName) -> Option<&ElementDecl> {
        self.elements.iter().find(|element| &element.name == name)
    }

    pub fn find_message(&self, name: &NamespacedName) -> Option<&Message> {
        self.messages.iter().find(|message| &message.name == name)
    }

    pub fn find_port_type(&self, name: &NamespacedName) -> Option<&PortType> {
        self.port_types.iter().find(|port_type| &port_type.name == name)
    }

    pub fn find_binding(&self, name: &NamespacedName) -> Option<&Binding> {
        self.bindings.iter().find(|binding| &binding.name == name)
    }

    pub fn is_known_type(&self, name: &NamespacedName) -> bool {
        name.is_builtin() || self.find_type(name).is_some()
    }

    /// Fields of a struct type, inherited ones first.
    pub fn fields_of<'a>(&'a self, kind: &'a TypeKind) -> Vec<&'a Field> {
        let mut fields = Vec::new();
        self.collect_fields(kind, &mut fields, 0);
        fields
    }

    fn collect_fields<'a>(&'a self, kind: &'a TypeKind, fields: &mut Vec<&'a Field>, depth: usize) {
        if let TypeKind::Struct { base, fields: own } = kind {
            let base = base
                .as_ref()
                .filter(|_| depth < MAX_BASE_DEPTH)
                .and_then(|base| self.find_type(base));

            if let Some(base) = base {
                self.collect_fields(&base.kind, fields, depth + 1);
            }

            fields.extend(own);
        }
    }
}
