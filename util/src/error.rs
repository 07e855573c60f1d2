use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("Violation of encoding rules: {value:?} is not a valid {ty}")]
    InvalidScalar { ty: String, value: String },

    #[error("object has no '{0}' property")]
    MissingProperty(String),

    #[error("expected {expected} value, got {got}")]
    UnexpectedKind {
        expected: &'static str,
        got: &'static str,
    },

    #[error("function {function} expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("argument {0} needs an explicit SoapVar element name")]
    UntypedArgument(usize),

    #[error("unknown schema type {0}")]
    UnknownType(String),

    #[error("response has no element for part {0}")]
    MissingPart(String),

    #[error("unable to hydrate {schema_type}")]
    Hydrate {
        schema_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error writing XML")]
    XmlError(#[from] crate::xml::Error),
}
