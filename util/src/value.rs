use std::{any::Any, fmt, sync::Arc};

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Native representation of a marshalled SOAP value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),
    /// A record hydrated into a registered Rust type, see [`crate::ClassMap`].
    Object(Object),
    /// Explicitly typed and named value, overriding what the contract would
    /// otherwise infer.
    Var(SoapVar),
}

/// Ordered field/value pairs, optionally tagged with the schema type they
/// were decoded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub type_name: Option<String>,
    fields: Vec<(String, Value)>,
}

#[derive(Clone)]
pub struct Object {
    type_name: String,
    record: Record,
    inner: Arc<dyn Any + Send + Sync>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoapVar {
    pub value: Box<Value>,
    pub type_namespace: Option<String>,
    pub type_name: Option<String>,
    pub node_namespace: Option<String>,
    pub node_name: Option<String>,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            Value::Var(var) => var.value.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Var(var) => var.value.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            Value::Var(var) => var.value.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Var(var) => var.value.as_bool(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            Value::Var(var) => var.value.as_list(),
            _ => None,
        }
    }

    /// The underlying record of a record, a hydrated object or a wrapped var.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            Value::Object(object) => Some(&object.record),
            Value::Var(var) => var.value.as_record(),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_record()?.get(field)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref(),
            _ => None,
        }
    }

    /// Text rendering of a scalar, as it appears in element content.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(value) => Some(value.to_string()),
            Value::Int(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::String(value) => Some(value.clone()),
            Value::Var(var) => var.value.to_text(),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Object(_) => "object",
            Value::Var(_) => "var",
        }
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed<S: Into<String>>(type_name: S) -> Self {
        Self {
            type_name: Some(type_name.into()),
            fields: Vec::new(),
        }
    }

    pub fn with<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Replaces an existing field of the same name, otherwise appends.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();

        for (name, value) in iter {
            record.insert(name, value);
        }

        record
    }
}

impl Object {
    pub fn new<T: Any + Send + Sync>(record: Record, inner: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>().to_owned(),
            record,
            inner: Arc::new(inner),
        }
    }

    /// Rust type name of the hydrated value.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .field("record", &self.record)
            .finish()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.record == other.record
    }
}

impl SoapVar {
    pub fn new<V: Into<Value>>(value: V) -> Self {
        Self {
            value: Box::new(value.into()),
            type_namespace: None,
            type_name: None,
            node_namespace: None,
            node_name: None,
        }
    }

    /// Schema type, written as `xsi:type` when the call uses SOAP encoding.
    pub fn with_type(mut self, namespace: &str, name: &str) -> Self {
        self.type_namespace = Some(namespace.to_owned());
        self.type_name = Some(name.to_owned());
        self
    }

    /// Element name (and namespace) the value is written as.
    pub fn with_node(mut self, namespace: Option<&str>, name: &str) -> Self {
        self.node_namespace = namespace.map(ToOwned::to_owned);
        self.node_name = Some(name.to_owned());
        self
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<SoapVar> for Value {
    fn from(var: SoapVar) -> Self {
        Value::Var(var)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Value::Record(record) => record.serialize(serializer),
            Value::Object(object) => object.record.serialize(serializer),
            Value::Var(var) => var.value.serialize(serializer),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", "two");
        record.insert("a", 3);

        let fields: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(fields, ["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn var_accessors_see_through_wrapper() {
        let value = Value::from(SoapVar::new("12070000").with_node(None, "blz"));
        assert_eq!(value.as_str(), Some("12070000"));
        assert_eq!(value.to_text().as_deref(), Some("12070000"));
    }

    #[test]
    fn serializes_as_plain_json() {
        let value = Value::Record(
            Record::new()
                .with("name", "x")
                .with("tags", vec![Value::from("a"), Value::from("b")])
                .with("missing", Value::Null),
        );

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"name":"x","tags":["a","b"],"missing":null}"#
        );
    }
}
