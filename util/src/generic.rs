//! Marshalling without a schema: values are written and read purely from
//! their own shape, with optional `xsi:type` hints under SOAP encoding.

use std::collections::HashMap;

use crate::{
    classmap::ClassMap,
    error::MarshalError,
    value::{Record, Value},
    xml::{Element, XSD_NS, XSI_NS},
};

/// How untyped values are annotated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding<'a> {
    /// `use="encoded"`: emit `xsi:type` hints.
    pub encoded: bool,
    pub encoding_namespace: &'a str,
}

fn scalar_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("boolean"),
        Value::Int(_) => Some("int"),
        Value::Float(_) => Some("float"),
        Value::String(_) => Some("string"),
        _ => None,
    }
}

/// Writes `value` as the content of `element`.
pub fn encode_value(
    element: Element,
    value: &Value,
    encoding: Encoding<'_>,
) -> Result<Element, MarshalError> {
    let mut element = element;

    match value {
        Value::Null => {
            element = element.with_attribute(Some(XSI_NS), "nil", "true");
        }

        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
            if encoding.encoded {
                if let Some(ty) = scalar_type(value) {
                    element = element.with_qname_attribute(Some(XSI_NS), "type", Some(XSD_NS), ty);
                }
            }

            if let Some(text) = value.to_text() {
                element = element.with_text(text);
            }
        }

        Value::List(values) => {
            if encoding.encoded {
                element = element.with_qname_attribute(
                    Some(XSI_NS),
                    "type",
                    Some(encoding.encoding_namespace),
                    "Array",
                );
            }

            for value in values {
                element.push(encode_value(Element::new(None, "item"), value, encoding)?);
            }
        }

        Value::Record(record) => element = encode_record(element, record, encoding)?,

        Value::Object(object) => element = encode_record(element, object.record(), encoding)?,

        Value::Var(var) => {
            if let (true, Some(ty)) = (encoding.encoded, &var.type_name) {
                let inner = encode_value(element, &var.value, Encoding { encoded: false, ..encoding })?;
                return Ok(inner.with_qname_attribute(
                    Some(XSI_NS),
                    "type",
                    var.type_namespace.as_deref(),
                    ty,
                ));
            }

            element = encode_value(element, &var.value, encoding)?;
        }
    }

    Ok(element)
}

fn encode_record(
    mut element: Element,
    record: &Record,
    encoding: Encoding<'_>,
) -> Result<Element, MarshalError> {
    if encoding.encoded {
        element = element.with_qname_attribute(
            Some(XSI_NS),
            "type",
            Some(encoding.encoding_namespace),
            "Struct",
        );
    }

    for (name, value) in record.iter() {
        // repeated fields travel as lists
        match value {
            Value::List(values) if !encoding.encoded => {
                for value in values {
                    element.push(encode_value(Element::new(None, name), value, encoding)?);
                }
            }
            _ => element.push(encode_value(Element::new(None, name), value, encoding)?),
        }
    }

    Ok(element)
}

/// Parses scalar text according to an XSD built-in type name.
pub fn parse_scalar(ty: &str, text: &str) -> Result<Value, MarshalError> {
    let invalid = || MarshalError::InvalidScalar {
        ty: ty.to_owned(),
        value: text.to_owned(),
    };

    let trimmed = text.trim();

    match ty {
        "int" | "integer" | "long" | "short" | "byte" | "unsignedInt" | "unsignedShort"
        | "unsignedByte" | "unsignedLong" | "positiveInteger" | "negativeInteger"
        | "nonNegativeInteger" | "nonPositiveInteger" => {
            trimmed.parse().map(Value::Int).map_err(|_| invalid())
        }

        "float" | "double" | "decimal" => match trimmed {
            "INF" => Ok(Value::Float(f64::INFINITY)),
            "-INF" => Ok(Value::Float(f64::NEG_INFINITY)),
            "NaN" => Ok(Value::Float(f64::NAN)),
            _ => trimmed.parse().map(Value::Float).map_err(|_| invalid()),
        },

        "boolean" => match trimmed {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },

        _ => Ok(Value::String(text.to_owned())),
    }
}

/// Reads `element` from its own shape. Leaf elements become scalars (typed
/// when `xsi:type` names an XSD built-in), elements with children become
/// records; a child name seen more than once becomes a list.
pub fn decode_value(element: &Element, class_map: &ClassMap) -> Result<Value, MarshalError> {
    if element.is_nil() {
        return Ok(Value::Null);
    }

    let xsi_type = element.xsi_type();

    if !element.has_elements() {
        return match xsi_type {
            Some((Some(XSD_NS), ty)) => parse_scalar(ty, &element.text()),
            _ => Ok(Value::String(element.text())),
        };
    }

    if let Some((_, "Array")) = xsi_type {
        return element
            .elements()
            .map(|child| decode_value(child, class_map))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }

    let mut record = match xsi_type {
        Some((_, ty)) if ty != "Struct" => Record::typed(ty),
        _ => Record::new(),
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for child in element.elements() {
        *counts.entry(child.name.as_str()).or_default() += 1;
    }

    for child in element.elements() {
        let value = decode_value(child, class_map)?;

        if counts[child.name.as_str()] > 1 {
            match record.get_mut(&child.name) {
                Some(Value::List(values)) => values.push(value),
                _ => record.insert(child.name.clone(), Value::List(vec![value])),
            }
        } else {
            record.insert(child.name.clone(), value);
        }
    }

    hydrate(record, class_map)
}

/// Hydrates `record` through `class_map` when its type name is mapped.
pub fn hydrate(record: Record, class_map: &ClassMap) -> Result<Value, MarshalError> {
    match record.type_name.clone() {
        Some(schema_type) if class_map.contains(&schema_type) => class_map
            .hydrate(&schema_type, record)
            .map_err(|source| MarshalError::Hydrate {
                schema_type,
                source,
            }),
        _ => Ok(Value::Record(record)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value::SoapVar, xml};

    const ENCODED: Encoding<'static> = Encoding {
        encoded: true,
        encoding_namespace: "http://schemas.xmlsoap.org/soap/encoding/",
    };

    const LITERAL: Encoding<'static> = Encoding {
        encoded: false,
        encoding_namespace: "http://schemas.xmlsoap.org/soap/encoding/",
    };

    #[test]
    fn encoded_scalars_carry_xsi_type() {
        let element = encode_value(Element::new(None, "param0"), &Value::Int(10), ENCODED).unwrap();

        assert_eq!(element.xsi_type(), Some((Some(XSD_NS), "int")));
        assert_eq!(element.text(), "10");
    }

    #[test]
    fn literal_var_has_no_type_hint() {
        let var = SoapVar::new("12070000").with_type(XSD_NS, "string");
        let element = encode_value(Element::new(None, "blz"), &var.into(), LITERAL).unwrap();

        assert!(element.attributes.is_empty());
        assert_eq!(element.text(), "12070000");
    }

    #[test]
    fn repeated_children_decode_as_list() {
        let element = xml::parse("<r><item>a</item><item>b</item><single>c</single></r>").unwrap();
        let value = decode_value(&element, &ClassMap::new()).unwrap();

        assert_eq!(
            value.get("item"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(value.get("single"), Some(&Value::from("c")));
    }

    #[test]
    fn typed_leaves_are_parsed() {
        let element = xml::parse(
            r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
                <n xsi:type="xsd:int">7</n><b xsi:type="xsd:boolean">true</b><z xsi:nil="true"/>
            </r>"#,
        )
        .unwrap();
        let value = decode_value(&element, &ClassMap::new()).unwrap();

        assert_eq!(value.get("n"), Some(&Value::Int(7)));
        assert_eq!(value.get("b"), Some(&Value::Bool(true)));
        assert_eq!(value.get("z"), Some(&Value::Null));
    }

    #[test]
    fn invalid_typed_scalar_is_rejected() {
        assert!(matches!(
            parse_scalar("int", "seven"),
            Err(MarshalError::InvalidScalar { .. })
        ));
    }
}
