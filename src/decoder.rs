use std::sync::Arc;

use bytes::Bytes;
use suds_util::{
    soap::{Envelope, Fault},
    Value,
};
use suds_wsdl::ContractModel;
use tracing::debug;

/// Turns response bodies into results or faults. Never touches the network.
#[derive(Debug, Clone)]
pub struct Decoder {
    contract: Arc<ContractModel>,
}

impl Decoder {
    pub fn new(contract: Arc<ContractModel>) -> Self {
        Self { contract }
    }

    pub fn decode(&self, function: &str, response: &[u8]) -> Result<Value, Fault> {
        let attach = |fault: Fault| {
            fault
                .with_function(function)
                .with_response(Bytes::copy_from_slice(response))
        };

        let envelope = Envelope::from_response(response).map_err(attach)?;

        if let Some(fault) = envelope.fault(self.contract.class_map()) {
            debug!(function, code = %fault.code, "server fault");
            return Err(attach(fault));
        }

        self.contract
            .decode_response(function, &envelope)
            .map_err(|err| attach(Fault::client(err.to_string())))
    }
}
