use suds_util::{soap::Fault, MarshalError};
use thiserror::Error;

use super::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Contract(#[from] suds_wsdl::Error),

    #[error(transparent)]
    Encode(#[from] EncodeFault),

    #[error(transparent)]
    Soap(#[from] Fault),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Arguments that do not fit the function they were passed to. Raised before
/// anything is sent.
#[derive(Debug, Error)]
#[error("SOAP-ERROR: Encoding: {source}")]
pub struct EncodeFault {
    pub function: String,
    #[source]
    pub source: MarshalError,
}

impl EncodeFault {
    pub fn new<E: Into<MarshalError>>(function: &str, source: E) -> Self {
        Self {
            function: function.to_owned(),
            source: source.into(),
        }
    }
}
