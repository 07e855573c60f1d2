//! Schema-driven marshalling of call arguments and response bodies.

use suds_util::{
    generic::{self, Encoding},
    soap::{Envelope, SoapHeader},
    value::{Record, Value},
    xml::{Element, XSI_NS},
    ClassMap, MarshalError,
};
use tracing::trace;

use super::{
    contract::{ContractModel, FunctionDescriptor},
    types::{Definition, Field, FieldKind, NamespacedName, Part, PartKind, Style, TypeKind, Use},
};

/// Writes values against the types of one definition.
struct Schema<'a> {
    definition: &'a Definition,
    encoding: Encoding<'a>,
    class_map: &'a ClassMap,
}

fn nil(element: Element) -> Element {
    element.with_attribute(Some(XSI_NS), "nil", "true")
}

impl<'a> Schema<'a> {
    fn element_decl(&self, name: &NamespacedName) -> Result<&'a FieldKind, MarshalError> {
        self.definition
            .find_element(name)
            .map(|decl| &decl.ty)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    fn type_kind(&self, name: &NamespacedName) -> Result<&'a TypeKind, MarshalError> {
        self.definition
            .find_type(name)
            .map(|ty| &ty.kind)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    fn encode_part(&self, part: &Part, value: &Value) -> Result<Element, MarshalError> {
        match &part.kind {
            PartKind::Element(name) => {
                let element = Element::new(name.namespace.as_deref(), name.name.as_str());
                self.encode_kind(element, self.element_decl(name)?, value)
            }

            PartKind::Type(ty) => self.encode_typed(Element::new(None, part.name.as_str()), ty, value),
        }
    }

    fn encode_kind(
        &self,
        element: Element,
        kind: &FieldKind,
        value: &Value,
    ) -> Result<Element, MarshalError> {
        match kind {
            FieldKind::Type(ty) => self.encode_typed(element, ty, value),

            FieldKind::Inner(kind) => match value {
                Value::Null => Ok(nil(element)),
                Value::Var(_) => generic::encode_value(element, value, self.encoding),
                _ => self.encode_kind_content(element, kind, value),
            },

            FieldKind::Ref(name) => self.encode_kind(element, self.element_decl(name)?, value),
        }
    }

    /// Element of declared type `ty`. An explicit `SoapVar` keeps its own
    /// type.
    fn encode_typed(
        &self,
        mut element: Element,
        ty: &NamespacedName,
        value: &Value,
    ) -> Result<Element, MarshalError> {
        match value {
            Value::Null => return Ok(nil(element)),
            Value::Var(_) => return generic::encode_value(element, value, self.encoding),
            _ => (),
        }

        if ty.is_untyped() {
            return generic::encode_value(element, value, self.encoding);
        }

        if self.encoding.encoded {
            element = element.with_qname_attribute(
                Some(XSI_NS),
                "type",
                ty.namespace.as_deref(),
                &ty.name,
            );
        }

        self.encode_content(element, ty, value)
    }

    fn encode_content(
        &self,
        element: Element,
        ty: &NamespacedName,
        value: &Value,
    ) -> Result<Element, MarshalError> {
        if ty.is_untyped() {
            return generic::encode_value(element, value, self.encoding);
        }

        if ty.is_builtin() {
            let text = value.to_text().ok_or(MarshalError::UnexpectedKind {
                expected: "scalar",
                got: value.kind(),
            })?;

            generic::parse_scalar(&ty.name, &text)?;
            return Ok(element.with_text(text));
        }

        self.encode_kind_content(element, self.type_kind(ty)?, value)
    }

    fn encode_kind_content(
        &self,
        mut element: Element,
        kind: &TypeKind,
        value: &Value,
    ) -> Result<Element, MarshalError> {
        match kind {
            TypeKind::Struct { .. } => {
                let record = match value {
                    Value::Record(record) => record,
                    Value::Object(object) => object.record(),
                    other => {
                        return Err(MarshalError::UnexpectedKind {
                            expected: "record",
                            got: other.kind(),
                        })
                    }
                };

                for field in self.definition.fields_of(kind) {
                    self.encode_field(&mut element, field, record.get(&field.name))?;
                }

                Ok(element)
            }

            TypeKind::Array(item) => {
                let values = value.as_list().ok_or(MarshalError::UnexpectedKind {
                    expected: "list",
                    got: value.kind(),
                })?;

                if self.encoding.encoded {
                    element = element.with_qname_attribute(
                        Some(self.encoding.encoding_namespace),
                        "arrayType",
                        item.namespace.as_deref(),
                        &format!("{}[{}]", item.name, values.len()),
                    );
                }

                for value in values {
                    element.push(self.encode_typed(Element::new(None, "item"), item, value)?);
                }

                Ok(element)
            }

            TypeKind::Simple(base) | TypeKind::Alias(base) => {
                self.encode_content(element, base, value)
            }
        }
    }

    fn encode_field(
        &self,
        parent: &mut Element,
        field: &Field,
        value: Option<&Value>,
    ) -> Result<(), MarshalError> {
        let element = || Element::new(field.namespace.as_deref(), field.name.as_str());

        match value {
            None | Some(Value::Null) if field.is_optional() => (),

            None | Some(Value::Null) if field.nillable => parent.push(nil(element())),

            None | Some(Value::Null) => {
                return Err(MarshalError::MissingProperty(field.name.clone()))
            }

            Some(Value::List(values)) if field.is_list() => {
                for value in values {
                    parent.push(self.encode_kind(element(), &field.ty, value)?);
                }
            }

            Some(value) => parent.push(self.encode_kind(element(), &field.ty, value)?),
        }

        Ok(())
    }

    fn decode_part(&self, element: &Element, part: &Part) -> Result<Value, MarshalError> {
        match &part.kind {
            PartKind::Element(name) => {
                self.decode_kind(element, self.element_decl(name)?, Some(&name.name))
            }
            PartKind::Type(ty) => self.decode_typed(element, ty),
        }
    }

    /// `fallback_name` names anonymous types, for class map lookups.
    fn decode_kind(
        &self,
        element: &Element,
        kind: &FieldKind,
        fallback_name: Option<&str>,
    ) -> Result<Value, MarshalError> {
        match kind {
            FieldKind::Type(ty) => self.decode_typed(element, ty),

            FieldKind::Inner(_) if element.is_nil() => Ok(Value::Null),

            FieldKind::Inner(kind) => self.decode_kind_content(element, kind, fallback_name),

            FieldKind::Ref(name) => {
                self.decode_kind(element, self.element_decl(name)?, Some(&name.name))
            }
        }
    }

    fn decode_typed(&self, element: &Element, ty: &NamespacedName) -> Result<Value, MarshalError> {
        if element.is_nil() {
            return Ok(Value::Null);
        }

        // xsi:type may name a derived type
        if let Some((namespace, name)) = element.xsi_type() {
            let actual = NamespacedName::new(namespace, name);

            if &actual != ty && self.definition.is_known_type(&actual) {
                return self.decode_content(element, &actual);
            }
        }

        self.decode_content(element, ty)
    }

    fn decode_content(&self, element: &Element, ty: &NamespacedName) -> Result<Value, MarshalError> {
        if ty.is_untyped() || (ty.is_builtin() && element.has_elements()) {
            return generic::decode_value(element, self.class_map);
        }

        if ty.is_builtin() {
            return generic::parse_scalar(&ty.name, &element.text());
        }

        match self.definition.find_type(ty) {
            Some(found) => self.decode_kind_content(element, &found.kind, Some(&ty.name)),
            None => generic::decode_value(element, self.class_map),
        }
    }

    fn decode_kind_content(
        &self,
        element: &Element,
        kind: &TypeKind,
        type_name: Option<&str>,
    ) -> Result<Value, MarshalError> {
        match kind {
            TypeKind::Struct { .. } => {
                let fields = self.definition.fields_of(kind);
                let mut record = match type_name {
                    Some(type_name) => Record::typed(type_name),
                    None => Record::new(),
                };

                for field in &fields {
                    let mut children = element.elements().filter(|child| child.name == field.name);

                    if field.is_list() {
                        let values = children
                            .map(|child| self.decode_kind(child, &field.ty, Some(&field.name)))
                            .collect::<Result<Vec<_>, _>>()?;

                        if !values.is_empty() {
                            record.insert(field.name.clone(), Value::List(values));
                        }
                    } else if let Some(child) = children.next() {
                        let value = self.decode_kind(child, &field.ty, Some(&field.name))?;
                        record.insert(field.name.clone(), value);
                    }
                }

                // elements the schema does not describe are kept as they came
                for child in element.elements() {
                    if !fields.iter().any(|field| field.name == child.name) {
                        record.insert(child.name.clone(), generic::decode_value(child, self.class_map)?);
                    }
                }

                generic::hydrate(record, self.class_map)
            }

            TypeKind::Array(item) => element
                .elements()
                .map(|child| self.decode_typed(child, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),

            TypeKind::Simple(base) | TypeKind::Alias(base) => self.decode_content(element, base),
        }
    }
}

/// Arguments without a schema: `SoapVar`s name their own element, anything
/// else becomes `param{index}`. Document style has no wrapper to position
/// plain arguments in, so every argument must be a named `SoapVar`.
fn encode_untyped(
    function: &FunctionDescriptor,
    args: &[Value],
    encoding: Encoding<'_>,
) -> Result<Vec<Element>, MarshalError> {
    let mut children = Vec::with_capacity(args.len());

    for (index, arg) in args.iter().enumerate() {
        let element = match arg {
            Value::Var(var) if var.node_name.is_some() => Element::new(
                var.node_namespace.as_deref(),
                var.node_name.clone().unwrap_or_default(),
            ),

            _ if function.style == Style::Document => {
                return Err(MarshalError::UntypedArgument(index))
            }

            _ => Element::new(None, format!("param{}", index)),
        };

        children.push(generic::encode_value(element, arg, encoding)?);
    }

    Ok(match function.style {
        Style::Rpc => {
            let mut wrapper = Element::new(function.namespace.as_deref(), function.name.as_str());
            for child in children {
                wrapper.push(child);
            }
            vec![wrapper]
        }
        Style::Document => children,
    })
}

/// Response read from its own shape. A wrapper with a single child is
/// unwrapped.
fn decode_untyped(body: &[Element], class_map: &ClassMap) -> Result<Value, MarshalError> {
    let wrapper = match body.first() {
        Some(wrapper) => wrapper,
        None => return Ok(Value::Null),
    };

    let mut children = wrapper.elements();

    match (children.next(), children.next()) {
        (Some(only), None) => generic::decode_value(only, class_map),
        _ => generic::decode_value(wrapper, class_map),
    }
}

fn find_child<'e>(elements: &[&'e Element], name: &str, index: usize) -> Option<&'e Element> {
    elements
        .iter()
        .find(|element| element.name == name)
        .or_else(|| elements.get(index))
        .copied()
}

fn collect_parts(parts: &[Part], mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Record(
            parts
                .iter()
                .map(|part| part.name.clone())
                .zip(values)
                .collect(),
        ),
    }
}

impl ContractModel {
    /// Builds the request envelope for a call to `function`.
    pub fn encode_call(
        &self,
        function: &FunctionDescriptor,
        args: &[Value],
        headers: &[SoapHeader],
    ) -> Result<Envelope, MarshalError> {
        let version = function.version;
        let encoded = function.input_use == Use::Encoded;
        let encoding = Encoding {
            encoded,
            encoding_namespace: version.encoding_namespace(),
        };

        let mut envelope = Envelope::new(version);
        envelope.encoded = encoded;

        for header in headers {
            envelope.headers.push(header.to_element(version, encoded)?);
        }

        let definition = match self.definition() {
            Some(definition) => definition,
            None => {
                envelope.body = encode_untyped(function, args, encoding)?;
                return Ok(envelope);
            }
        };

        if args.len() != function.input.len() {
            return Err(MarshalError::Arity {
                function: function.name.clone(),
                expected: function.input.len(),
                got: args.len(),
            });
        }

        let schema = Schema {
            definition,
            encoding,
            class_map: self.class_map(),
        };

        let parts = function
            .input
            .iter()
            .zip(args)
            .map(|(part, arg)| schema.encode_part(part, arg))
            .collect::<Result<Vec<_>, _>>()?;

        envelope.body = match function.style {
            Style::Document => parts,
            Style::Rpc => {
                let mut wrapper =
                    Element::new(function.namespace.as_deref(), function.name.as_str());
                for part in parts {
                    wrapper.push(part);
                }
                vec![wrapper]
            }
        };

        Ok(envelope)
    }

    /// Reads the result of `function` out of a fault-free response envelope.
    /// Functions the contract does not know are decoded from the response
    /// shape alone.
    pub fn decode_response(&self, function: &str, envelope: &Envelope) -> Result<Value, MarshalError> {
        let class_map = self.class_map();

        let (definition, function) = match (self.definition(), self.find_function(function)) {
            (Some(definition), Some(function)) => (definition, function),
            _ => {
                trace!(function, "decoding response without schema");
                return decode_untyped(&envelope.body, class_map);
            }
        };

        let encoding = Encoding {
            encoded: function.output_use == Use::Encoded,
            encoding_namespace: function.version.encoding_namespace(),
        };

        let schema = Schema {
            definition,
            encoding,
            class_map,
        };

        let elements: Vec<&Element> = match function.style {
            Style::Document => envelope.body.iter().collect(),
            Style::Rpc => match envelope.body.first() {
                Some(wrapper) => wrapper.elements().collect(),
                None => Vec::new(),
            },
        };

        let mut values = Vec::with_capacity(function.output.len());

        for (index, part) in function.output.iter().enumerate() {
            let name = match (&part.kind, function.style) {
                (PartKind::Element(element), Style::Document) => element.name.as_str(),
                _ => part.name.as_str(),
            };

            let element = find_child(&elements, name, index)
                .ok_or_else(|| MarshalError::MissingPart(part.name.clone()))?;

            values.push(schema.decode_part(element, part)?);
        }

        Ok(collect_parts(&function.output, values))
    }
}
