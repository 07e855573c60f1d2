//! Non-blocking SOAP client.
//!
//! Calls are encoded into [`WireRequest`]s and responses decoded without any
//! I/O; only the [`Transport`] touches the network.

mod client;
mod decoder;
mod encoder;
pub mod error;
pub mod transport;

pub use client::Client;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{EncodeFault, Error};
pub use transport::{ReqwestTransport, Transport, TransportError, WireRequest, WireResponse};

pub use suds_util::{
    soap::{Fault, SoapHeader, SoapVersion},
    ClassMap, Object, Record, SoapVar, Value,
};
pub use suds_wsdl::{ContractModel, ContractOptions, FunctionRef, Style, Use};
pub use tokio_util::sync::CancellationToken;
