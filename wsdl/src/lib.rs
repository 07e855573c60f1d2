mod marshal;
mod parser;

pub mod contract;
pub mod error;
pub mod types;

pub use contract::{ContractModel, ContractOptions, FunctionDescriptor, FunctionRef, TypeDescriptor};
pub use error::Error;
pub use types::{Style, Use};

/// Parses WSDL text into its raw definition, without resolving references.
pub fn parse<S: AsRef<str>>(wsdl: S) -> Result<types::Definition, error::Error> {
    parser::parse(wsdl.as_ref())
}

#[cfg(test)]
mod tests;
