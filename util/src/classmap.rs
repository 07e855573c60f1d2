use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use serde::de::DeserializeOwned;

use crate::value::{Object, Record, Value};

type Hydrate = dyn Fn(&Record) -> Result<Object, serde_json::Error> + Send + Sync;

/// Maps schema type names onto Rust types that decoded records are hydrated
/// into. Hydration goes through serde, so the target type only needs to
/// implement `Deserialize` with field names matching the schema.
#[derive(Clone, Default)]
pub struct ClassMap {
    entries: HashMap<String, Arc<Hydrate>>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, schema_type: &str) -> Self
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        self.insert::<T>(schema_type);
        self
    }

    pub fn insert<T>(&mut self, schema_type: &str)
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        let hydrate = |record: &Record| -> Result<Object, serde_json::Error> {
            let json = serde_json::to_value(record)?;
            let inner: T = serde_json::from_value(json)?;
            Ok(Object::new(record.clone(), inner))
        };

        self.entries.insert(schema_type.to_owned(), Arc::new(hydrate));
    }

    pub fn contains(&self, schema_type: &str) -> bool {
        self.entries.contains_key(schema_type)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hydrates `record` if `schema_type` is mapped, otherwise hands the
    /// record back unchanged.
    pub fn hydrate(&self, schema_type: &str, record: Record) -> Result<Value, serde_json::Error> {
        match self.entries.get(schema_type) {
            Some(hydrate) => {
                tracing::trace!(schema_type, "hydrating mapped type");
                Ok(Value::Object(hydrate(&record)?))
            }
            None => Ok(Value::Record(record)),
        }
    }
}

impl fmt::Debug for ClassMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Details {
        bic: String,
        plz: Option<String>,
    }

    #[test]
    fn hydrates_mapped_types() {
        let class_map = ClassMap::new().with::<Details>("detailsType");
        let record = Record::typed("detailsType").with("bic", "DEUTDEBB160");

        let value = class_map.hydrate("detailsType", record).unwrap();
        let details = value.downcast_ref::<Details>().unwrap();

        assert_eq!(details.bic, "DEUTDEBB160");
        assert_eq!(details.plz, None);
        assert_eq!(value.get("bic").and_then(Value::as_str), Some("DEUTDEBB160"));
    }

    #[test]
    fn leaves_unmapped_types_alone() {
        let value = ClassMap::new()
            .hydrate("other", Record::new().with("a", 1))
            .unwrap();

        assert!(matches!(value, Value::Record(_)));
    }

    #[test]
    fn reports_shape_mismatch() {
        let class_map = ClassMap::new().with::<Details>("detailsType");
        assert!(class_map.hydrate("detailsType", Record::new()).is_err());
    }
}
