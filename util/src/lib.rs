pub mod classmap;
pub mod error;
pub mod generic;
pub mod soap;
pub mod value;
pub mod xml;

pub use classmap::ClassMap;
pub use error::MarshalError;
pub use soap::{Envelope, Fault, SoapHeader, SoapVersion};
pub use value::{Object, Record, SoapVar, Value};
