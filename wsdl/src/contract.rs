use std::{borrow::Cow, collections::HashSet};

use suds_util::{ClassMap, SoapVersion};
use tracing::debug;

use super::{
    error::Error,
    parser,
    types::{
        Definition, Field, FieldKind, NamespacedName, Part, PartKind, Style, TypeKind, Use,
    },
};

/// Construction options. In WSDL mode every field is optional; without a
/// WSDL, `location` and `uri` are required.
#[derive(Debug, Clone, Default)]
pub struct ContractOptions {
    /// Endpoint override, applied to every function.
    pub location: Option<String>,
    /// Target namespace of non-WSDL calls.
    pub uri: Option<String>,
    pub soap_version: SoapVersion,
    /// Non-WSDL message style, `rpc` unless set.
    pub style: Option<Style>,
    /// Non-WSDL body use, `encoded` unless set.
    pub body_use: Option<Use>,
    pub class_map: ClassMap,
}

impl ContractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn soap_version(mut self, soap_version: SoapVersion) -> Self {
        self.soap_version = soap_version;
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn body_use(mut self, body_use: Use) -> Self {
        self.body_use = Some(body_use);
        self
    }

    pub fn class_map(mut self, class_map: ClassMap) -> Self {
        self.class_map = class_map;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// e.g. `getBankResponseType getBank(getBankType $parameters)`
    pub signature: String,
    pub documentation: Option<String>,
    pub input: Vec<Part>,
    pub output: Vec<Part>,
    pub location: Option<String>,
    pub action: String,
    pub style: Style,
    pub input_use: Use,
    pub output_use: Use,
    /// Namespace of the RPC wrapper element.
    pub namespace: Option<String>,
    pub version: SoapVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: NamespacedName,
    pub kind: TypeKind,
    /// e.g. `struct getBankType {\n string blz;\n}`
    pub signature: String,
}

/// A function named either by its name or by its position in
/// [`ContractModel::list_functions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRef<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for FunctionRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for FunctionRef<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for FunctionRef<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Everything known about a service before any call is made. Immutable once
/// built.
#[derive(Debug)]
pub struct ContractModel {
    definition: Option<Definition>,
    functions: Vec<FunctionDescriptor>,
    types: Vec<TypeDescriptor>,
    options: ContractOptions,
}

impl ContractModel {
    /// `wsdl` selects WSDL mode; `None` builds a non-WSDL contract from
    /// `options` alone.
    pub fn new(wsdl: Option<&str>, options: ContractOptions) -> Result<Self, Error> {
        match wsdl {
            Some(wsdl) => Self::from_wsdl(wsdl, options),
            None => Self::non_wsdl(options),
        }
    }

    pub fn from_wsdl(wsdl: &str, options: ContractOptions) -> Result<Self, Error> {
        let definition = parser::parse(wsdl)?;
        validate(&definition)?;

        let functions = build_functions(&definition)?;
        let types = build_types(&definition);

        debug!(
            functions = functions.len(),
            types = types.len(),
            "loaded WSDL contract"
        );

        Ok(Self {
            definition: Some(definition),
            functions,
            types,
            options,
        })
    }

    pub fn non_wsdl(options: ContractOptions) -> Result<Self, Error> {
        if options.location.is_none() {
            return Err(Error::MissingLocation);
        }

        if options.uri.is_none() {
            return Err(Error::MissingNamespace);
        }

        Ok(Self {
            definition: None,
            functions: Vec::new(),
            types: Vec::new(),
            options,
        })
    }

    pub fn is_wsdl(&self) -> bool {
        self.definition.is_some()
    }

    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_ref()
    }

    pub fn options(&self) -> &ContractOptions {
        &self.options
    }

    pub fn class_map(&self) -> &ClassMap {
        &self.options.class_map
    }

    pub fn soap_version(&self) -> SoapVersion {
        self.options.soap_version
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// Function signatures, `None` in non-WSDL mode.
    pub fn list_functions(&self) -> Option<Vec<String>> {
        self.definition.as_ref()?;

        Some(
            self.functions
                .iter()
                .map(|function| function.signature.clone())
                .collect(),
        )
    }

    /// Type signatures, `None` in non-WSDL mode.
    pub fn list_types(&self) -> Option<Vec<String>> {
        self.definition.as_ref()?;

        Some(self.types.iter().map(|ty| ty.signature.clone()).collect())
    }

    /// Looks up a WSDL function, preferring the binding of the configured
    /// SOAP version.
    pub fn find_function(&self, name: &str) -> Option<&FunctionDescriptor> {
        let mut candidates = self.functions.iter().filter(|function| function.name == name);
        let first = candidates.next()?;

        if first.version == self.options.soap_version {
            return Some(first);
        }

        candidates
            .find(|function| function.version == self.options.soap_version)
            .or(Some(first))
    }

    /// The function to encode a call to `name` with. Without a WSDL every
    /// name is valid and described by the options.
    pub fn function(&self, name: &str) -> Result<Cow<'_, FunctionDescriptor>, Error> {
        if self.definition.is_none() {
            return Ok(Cow::Owned(self.untyped_function(name)));
        }

        self.find_function(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| Error::UnknownFunction(name.to_owned()))
    }

    fn untyped_function(&self, name: &str) -> FunctionDescriptor {
        let uri = self.options.uri.clone().unwrap_or_default();

        FunctionDescriptor {
            name: name.to_owned(),
            signature: format!("{}()", name),
            documentation: None,
            input: Vec::new(),
            output: Vec::new(),
            location: self.options.location.clone(),
            action: format!("{}#{}", uri, name),
            style: self.options.style.unwrap_or(Style::Rpc),
            input_use: self.options.body_use.unwrap_or(Use::Encoded),
            output_use: self.options.body_use.unwrap_or(Use::Encoded),
            namespace: Some(uri),
            version: self.options.soap_version,
        }
    }

    /// Endpoint a call to `function` is sent to. The `location` option wins
    /// over the WSDL, but the function still has to exist.
    pub fn resolve_location<'a, F: Into<FunctionRef<'a>>>(&self, function: F) -> Result<String, Error> {
        let name = match function.into() {
            FunctionRef::Name(name) => name,
            FunctionRef::Index(index) => self
                .functions
                .get(index)
                .map(|function| function.name.as_str())
                .ok_or(Error::UnknownFunctionIndex(index))?,
        };

        let function = self.function(name)?;

        if let Some(location) = &self.options.location {
            return Ok(location.clone());
        }

        function
            .location
            .clone()
            .ok_or_else(|| Error::NoEndpoint(function.name.clone()))
    }
}

fn check_type(definition: &Definition, name: &NamespacedName) -> Result<(), Error> {
    if definition.is_known_type(name) {
        Ok(())
    } else {
        Err(Error::UnknownType(name.to_string()))
    }
}

fn check_field_kind(definition: &Definition, kind: &FieldKind) -> Result<(), Error> {
    match kind {
        FieldKind::Type(name) => check_type(definition, name),
        FieldKind::Inner(kind) => check_type_kind(definition, kind),
        FieldKind::Ref(name) => match definition.find_element(name) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownElement(name.to_string())),
        },
    }
}

fn check_type_kind(definition: &Definition, kind: &TypeKind) -> Result<(), Error> {
    match kind {
        TypeKind::Struct { base, fields } => {
            if let Some(base) = base {
                check_type(definition, base)?;
            }

            fields
                .iter()
                .try_for_each(|field| check_field_kind(definition, &field.ty))
        }
        TypeKind::Array(item) => check_type(definition, item),
        TypeKind::Simple(base) | TypeKind::Alias(base) => check_type(definition, base),
    }
}

/// Follows `simpleType` restrictions and aliases from `start` until they reach
/// a type that is neither.
fn check_restriction_chain<'a>(
    definition: &'a Definition,
    start: &'a NamespacedName,
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    let mut current = start;

    while let Some(ty) = definition.find_type(current) {
        if !seen.insert(current) {
            return Err(Error::CyclicType(start.to_string()));
        }

        match &ty.kind {
            TypeKind::Simple(base) | TypeKind::Alias(base) => current = base,
            TypeKind::Struct { .. } | TypeKind::Array(_) => break,
        }
    }

    Ok(())
}

/// Every reference inside the definition must resolve.
fn validate(definition: &Definition) -> Result<(), Error> {
    for ty in &definition.types {
        check_type_kind(definition, &ty.kind)?;
        check_restriction_chain(definition, &ty.name)?;
    }

    for element in &definition.elements {
        check_field_kind(definition, &element.ty)?;
    }

    for message in &definition.messages {
        for part in &message.parts {
            match &part.kind {
                PartKind::Element(name) => {
                    if definition.find_element(name).is_none() {
                        return Err(Error::UnknownElement(name.to_string()));
                    }
                }
                PartKind::Type(name) => check_type(definition, name)?,
            }
        }
    }

    for port_type in &definition.port_types {
        for operation in &port_type.operations {
            for message in operation.input.iter().chain(operation.output.iter()) {
                if definition.find_message(message).is_none() {
                    return Err(Error::UnknownMessage(message.to_string()));
                }
            }
        }
    }

    for binding in &definition.bindings {
        let port_type = definition
            .find_port_type(&binding.ty)
            .ok_or_else(|| Error::UnknownPortType(binding.ty.to_string()))?;

        for operation in &binding.operations {
            if !port_type.operations.iter().any(|op| op.name == operation.name) {
                return Err(Error::UnknownOperation {
                    port_type: port_type.name.to_string(),
                    operation: operation.name.clone(),
                });
            }
        }
    }

    for service in &definition.services {
        for port in &service.ports {
            if definition.find_binding(&port.binding).is_none() {
                return Err(Error::UnknownBinding(port.binding.to_string()));
            }
        }
    }

    Ok(())
}

fn message_parts(definition: &Definition, message: Option<&NamespacedName>) -> Vec<Part> {
    message
        .and_then(|message| definition.find_message(message))
        .map(|message| message.parts.clone())
        .unwrap_or_default()
}

fn part_type_name(definition: &Definition, part: &Part) -> String {
    match &part.kind {
        PartKind::Type(ty) => ty.name.clone(),
        PartKind::Element(element) => match definition.find_element(element).map(|decl| &decl.ty) {
            Some(FieldKind::Type(ty)) => ty.name.clone(),
            _ => element.name.clone(),
        },
    }
}

fn function_signature(definition: &Definition, name: &str, input: &[Part], output: &[Part]) -> String {
    let params = input
        .iter()
        .map(|part| format!("{} ${}", part_type_name(definition, part), part.name))
        .collect::<Vec<_>>()
        .join(", ");

    let result = match output {
        [] => "void".to_owned(),
        [part] => part_type_name(definition, part),
        parts => format!(
            "list({})",
            parts
                .iter()
                .map(|part| format!("{} ${}", part_type_name(definition, part), part.name))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    format!("{} {}({})", result, name, params)
}

/// One function per operation of every SOAP binding a service port points
/// at, in document order.
fn build_functions(definition: &Definition) -> Result<Vec<FunctionDescriptor>, Error> {
    let mut functions = Vec::new();
    let mut seen = HashSet::new();

    for service in &definition.services {
        for port in &service.ports {
            let binding = definition
                .find_binding(&port.binding)
                .ok_or_else(|| Error::UnknownBinding(port.binding.to_string()))?;

            let version = match binding.version {
                Some(version) => version,
                None => continue,
            };

            if !seen.insert(&binding.name) {
                continue;
            }

            let port_type = definition
                .find_port_type(&binding.ty)
                .ok_or_else(|| Error::UnknownPortType(binding.ty.to_string()))?;

            for operation in &binding.operations {
                let abstract_operation = port_type
                    .operations
                    .iter()
                    .find(|op| op.name == operation.name)
                    .ok_or_else(|| Error::UnknownOperation {
                        port_type: port_type.name.to_string(),
                        operation: operation.name.clone(),
                    })?;

                let input = message_parts(definition, abstract_operation.input.as_ref());
                let output = message_parts(definition, abstract_operation.output.as_ref());
                let input_body = operation.input.clone().unwrap_or_default();
                let output_body = operation.output.clone().unwrap_or_default();

                functions.push(FunctionDescriptor {
                    signature: function_signature(definition, &operation.name, &input, &output),
                    name: operation.name.clone(),
                    documentation: abstract_operation.documentation.clone(),
                    input,
                    output,
                    location: port.location.clone(),
                    action: operation.action.clone().unwrap_or_default(),
                    style: operation.style.or(binding.style).unwrap_or_default(),
                    input_use: input_body.body_use,
                    output_use: output_body.body_use,
                    namespace: input_body
                        .namespace
                        .or_else(|| definition.target_namespace.clone()),
                    version,
                });
            }
        }
    }

    Ok(functions)
}

fn field_type_name(definition: &Definition, field: &Field) -> String {
    match &field.ty {
        FieldKind::Type(ty) => ty.name.clone(),
        FieldKind::Inner(_) => field.name.clone(),
        FieldKind::Ref(element) => match definition.find_element(element).map(|decl| &decl.ty) {
            Some(FieldKind::Type(ty)) => ty.name.clone(),
            _ => element.name.clone(),
        },
    }
}

fn type_signature(definition: &Definition, name: &str, kind: &TypeKind) -> String {
    match kind {
        TypeKind::Struct { .. } => {
            let mut signature = format!("struct {} {{\n", name);

            for field in definition.fields_of(kind) {
                signature.push_str(&format!(
                    " {} {};\n",
                    field_type_name(definition, field),
                    field.name
                ));
            }

            signature.push('}');
            signature
        }

        TypeKind::Array(item) => format!("{} {}[]", item.name, name),

        TypeKind::Simple(base) | TypeKind::Alias(base) => format!("{} {}", base.name, name),
    }
}

/// Named schema types, followed by global elements declared with an
/// anonymous type.
fn build_types(definition: &Definition) -> Vec<TypeDescriptor> {
    let named = definition.types.iter().map(|ty| TypeDescriptor {
        signature: type_signature(definition, &ty.name.name, &ty.kind),
        name: ty.name.clone(),
        kind: ty.kind.clone(),
    });

    let anonymous = definition
        .elements
        .iter()
        .filter_map(|element| match &element.ty {
            FieldKind::Inner(kind) => Some(TypeDescriptor {
                signature: type_signature(definition, &element.name.name, kind),
                name: element.name.clone(),
                kind: kind.clone(),
            }),
            _ => None,
        });

    named.chain(anonymous).collect()
}
