use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use suds::{Transport, TransportError, WireRequest, WireResponse};

pub const BLZ_WSDL: &str = include_str!("../fixtures/blz.wsdl");
pub const ECHO_WSDL: &str = include_str!("../fixtures/echo.wsdl");
pub const BLZ_RESPONSE: &str = include_str!("../fixtures/blz_response.xml");
pub const BLZ_FAULT: &str = include_str!("../fixtures/blz_fault.xml");
pub const SOAP12_FAULT: &str = include_str!("../fixtures/soap12_fault.xml");

#[derive(Debug, Clone)]
pub enum Reply {
    /// Sends the request body straight back.
    Echo,
    Respond(WireResponse),
    Timeout,
    /// Never answers.
    Hang,
}

/// Transport that records every request it is handed.
#[derive(Debug, Clone)]
pub struct MockTransport {
    reply: Reply,
    requests: Arc<Mutex<Vec<WireRequest>>>,
}

impl MockTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Arc::default(),
        }
    }

    pub fn responding(status: u16, body: &str) -> Self {
        Self::new(Reply::Respond(WireResponse::new(status, body.to_owned())))
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match &self.reply {
            Reply::Echo => Ok(WireResponse::new(200, request.body)),
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Timeout => Err(TransportError::Timeout),
            Reply::Hang => std::future::pending().await,
        }
    }
}
