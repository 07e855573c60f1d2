use std::{fmt, sync::Arc};

use bytes::Bytes;
use suds_util::{soap::SoapHeader, Value};
use suds_wsdl::{ContractModel, ContractOptions, FunctionRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    decoder::Decoder,
    encoder::Encoder,
    error::Error,
    transport::{ReqwestTransport, Transport, TransportError, WireResponse},
};

/// SOAP client for one service. Cloning is cheap: clones share the contract
/// and the transport.
#[derive(Clone)]
pub struct Client {
    encoder: Encoder,
    decoder: Decoder,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// WSDL-mode client over the default HTTP transport.
    pub fn new(wsdl: &str) -> Result<Self, Error> {
        Self::with_options(Some(wsdl), ContractOptions::new())
    }

    /// `wsdl` of `None` selects non-WSDL mode, in which `options` must name
    /// a location and a uri.
    pub fn with_options(wsdl: Option<&str>, options: ContractOptions) -> Result<Self, Error> {
        let contract = ContractModel::new(wsdl, options)?;
        Ok(Self::with_transport(Arc::new(contract), ReqwestTransport::new()?))
    }

    pub fn with_transport<T: Transport + 'static>(contract: Arc<ContractModel>, transport: T) -> Self {
        Self {
            encoder: Encoder::new(contract.clone()),
            decoder: Decoder::new(contract),
            transport: Arc::new(transport),
        }
    }

    pub fn contract(&self) -> &ContractModel {
        self.encoder.contract()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub async fn call(&self, function: &str, args: &[Value]) -> Result<Value, Error> {
        self.call_with_headers(function, args, &[]).await
    }

    pub async fn call_with_headers(
        &self,
        function: &str,
        args: &[Value],
        headers: &[SoapHeader],
    ) -> Result<Value, Error> {
        let request = self.encoder.encode(function, args, headers)?;
        let body = request.body.clone();

        let response = self.transport.send(request).await?;
        self.finish(function, body, response)
    }

    /// Like [`Client::call_with_headers`], but gives up with
    /// [`TransportError::Cancelled`] once `token` is cancelled. A token
    /// cancelled before the call means nothing is sent.
    pub async fn call_cancellable(
        &self,
        function: &str,
        args: &[Value],
        headers: &[SoapHeader],
        token: &CancellationToken,
    ) -> Result<Value, Error> {
        let request = self.encoder.encode(function, args, headers)?;
        let body = request.body.clone();

        if token.is_cancelled() {
            debug!(function, "cancelled before dispatch");
            return Err(TransportError::Cancelled.into());
        }

        let response = tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(function, "cancelled in flight");
                return Err(TransportError::Cancelled.into());
            }

            response = self.transport.send(request) => response?,
        };

        self.finish(function, body, response)
    }

    fn finish(&self, function: &str, request: Bytes, response: WireResponse) -> Result<Value, Error> {
        if response.is_redirect() {
            warn!(function, status = response.status, "refusing redirect");

            return Err(TransportError::Redirect {
                status: response.status,
                location: response.header("location").map(ToOwned::to_owned),
            }
            .into());
        }

        debug!(function, status = response.status, "decoding response");

        self.decoder
            .decode(function, &response.body)
            .map_err(|fault| Error::Soap(fault.with_request(request)))
    }

    pub fn list_functions(&self) -> Option<Vec<String>> {
        self.contract().list_functions()
    }

    pub fn list_types(&self) -> Option<Vec<String>> {
        self.contract().list_types()
    }

    /// Endpoint a call to `function` is sent to, by name or by position in
    /// [`Client::list_functions`].
    pub fn location_of<'a, F: Into<FunctionRef<'a>>>(&self, function: F) -> Result<String, Error> {
        let location = self.contract().resolve_location(function)?;

        Ok(match self.encoder.location() {
            Some(location) => location.to_owned(),
            None => location,
        })
    }

    /// A client sending every call to `location`. `self` keeps its endpoint.
    pub fn with_location<S: Into<String>>(&self, location: S) -> Self {
        Self {
            encoder: self.encoder.with_location(location),
            decoder: self.decoder.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("wsdl", &self.contract().is_wsdl())
            .field("location", &self.encoder.location())
            .finish_non_exhaustive()
    }
}
