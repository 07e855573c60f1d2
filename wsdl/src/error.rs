use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Invalid XML attribute")]
    AttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error(transparent)]
    Xml(#[from] suds_util::xml::Error),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{element}> has invalid {attribute} value {value:?}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Missing <definitions> root element")]
    MissingDefinitions,

    #[error("Unexpected end of WSDL document")]
    UnexpectedEof,

    #[error("Unknown type {0}")]
    UnknownType(String),

    #[error("Type {0} is derived from itself")]
    CyclicType(String),

    #[error("Unknown element {0}")]
    UnknownElement(String),

    #[error("Unknown message {0}")]
    UnknownMessage(String),

    #[error("Unknown binding {0}")]
    UnknownBinding(String),

    #[error("Unknown port type {0}")]
    UnknownPortType(String),

    #[error("Unknown operation {operation} in port type {port_type}")]
    UnknownOperation {
        port_type: String,
        operation: String,
    },

    #[error("'location' option is required in nonWSDL mode")]
    MissingLocation,

    #[error("'uri' option is required in nonWSDL mode")]
    MissingNamespace,

    #[error("No endpoint location for function {0}")]
    NoEndpoint(String),

    #[error("Function (\"{0}\") is not a valid method for this service")]
    UnknownFunction(String),

    #[error("Unknown function index {0}")]
    UnknownFunctionIndex(usize),

    #[error("Invalid endpoint URL")]
    InvalidUrl(#[from] url::ParseError),
}
