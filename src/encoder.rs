use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use suds_util::{soap::SoapHeader, xml, SoapVersion, Value};
use suds_wsdl::ContractModel;
use tracing::debug;
use url::Url;

use super::{
    error::{EncodeFault, Error},
    transport::WireRequest,
};

/// Turns calls into wire requests. Never touches the network.
#[derive(Debug, Clone)]
pub struct Encoder {
    contract: Arc<ContractModel>,
    location: Option<String>,
}

impl Encoder {
    pub fn new(contract: Arc<ContractModel>) -> Self {
        Self {
            contract,
            location: None,
        }
    }

    /// Same contract, every request sent to `location` instead.
    pub fn with_location<S: Into<String>>(&self, location: S) -> Self {
        Self {
            contract: self.contract.clone(),
            location: Some(location.into()),
        }
    }

    pub fn contract(&self) -> &Arc<ContractModel> {
        &self.contract
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn encode(
        &self,
        function: &str,
        args: &[Value],
        headers: &[SoapHeader],
    ) -> Result<WireRequest, Error> {
        let descriptor = self.contract.function(function)?;

        let location = match &self.location {
            Some(location) => location.clone(),
            None => self.contract.resolve_location(function)?,
        };
        let uri = Url::parse(&location).map_err(suds_wsdl::Error::from)?;

        let envelope = self
            .contract
            .encode_call(&descriptor, args, headers)
            .map_err(|err| EncodeFault::new(function, err))?;

        let document = envelope
            .to_request()
            .map_err(|err| EncodeFault::new(function, err))?;
        let document = String::from_utf8_lossy(&document);
        let body = Bytes::from(xml::repair_cdata(&document).into_owned());

        let version = descriptor.version;
        let mut request_headers = vec![(
            "Content-Type".to_owned(),
            version.content_type(&descriptor.action),
        )];

        if version == SoapVersion::V1_1 {
            request_headers.push(("SOAPAction".to_owned(), format!("\"{}\"", descriptor.action)));
        }

        debug!(function, %uri, action = %descriptor.action, "encoded request");

        Ok(WireRequest {
            method: Method::POST,
            uri,
            headers: request_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use suds_util::{soap::SoapHeader, Record, SoapVersion, Value};
    use suds_wsdl::{ContractModel, ContractOptions};

    use super::*;

    const BLZ: &str = include_str!("../tests/fixtures/blz.wsdl");

    fn non_wsdl(version: SoapVersion) -> Encoder {
        let options = ContractOptions::new()
            .location("http://localhost/soap.php")
            .uri("demo")
            .soap_version(version);

        Encoder::new(Arc::new(ContractModel::non_wsdl(options).unwrap()))
    }

    #[test]
    fn soap11_sends_quoted_action_header() {
        let request = non_wsdl(SoapVersion::V1_1)
            .encode("add", &[10.into(), 20.into()], &[])
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.uri.as_str(), "http://localhost/soap.php");
        assert_eq!(request.header("Content-Type"), Some("text/xml; charset=utf-8"));
        assert_eq!(request.header("SOAPAction"), Some("\"demo#add\""));
    }

    #[test]
    fn soap12_carries_action_in_content_type() {
        let request = non_wsdl(SoapVersion::V1_2)
            .encode("add", &[10.into(), 20.into()], &[])
            .unwrap();

        assert_eq!(
            request.header("Content-Type"),
            Some("application/soap+xml; charset=utf-8; action=demo#add")
        );
        assert_eq!(request.header("SOAPAction"), None);

        let body = std::str::from_utf8(&request.body).unwrap();
        assert!(body.contains("env:encodingStyle=\"http://www.w3.org/2003/05/soap-encoding\""));
    }

    #[test]
    fn encoding_is_deterministic() {
        let encoder = Encoder::new(Arc::new(
            ContractModel::from_wsdl(BLZ, ContractOptions::new()).unwrap(),
        ));
        let args = [Value::from(Record::new().with("blz", "12070000"))];
        let headers = [SoapHeader::new("urn:auth", "token", "secret")];

        assert_eq!(
            encoder.encode("getBank", &args, &headers).unwrap(),
            encoder.encode("getBank", &args, &headers).unwrap()
        );
    }

    #[test]
    fn location_override_only_changes_uri() {
        let encoder = Encoder::new(Arc::new(
            ContractModel::from_wsdl(BLZ, ContractOptions::new()).unwrap(),
        ));
        let args = [Value::from(Record::new().with("blz", "12070000"))];

        let original = encoder.encode("getBank", &args, &[]).unwrap();
        let moved = encoder
            .with_location("http://localhost:8080/blz")
            .encode("getBank", &args, &[])
            .unwrap();

        assert_eq!(original.uri.as_str(), "http://www.thomas-bayer.com/axis2/services/BLZService");
        assert_eq!(moved.uri.as_str(), "http://localhost:8080/blz");
        assert_eq!(original.headers, moved.headers);
        assert_eq!(original.body, moved.body);
    }

    #[test]
    fn unknown_function_is_contract_error() {
        let encoder = Encoder::new(Arc::new(
            ContractModel::from_wsdl(BLZ, ContractOptions::new()).unwrap(),
        ));

        let err = encoder.encode("doesNotExist", &[], &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function (\"doesNotExist\") is not a valid method for this service"
        );
        assert!(matches!(
            err,
            Error::Contract(suds_wsdl::Error::UnknownFunction(name)) if name == "doesNotExist"
        ));
    }

    #[test]
    fn cdata_markers_survive_encoding() {
        let request = non_wsdl(SoapVersion::V1_1)
            .encode("note", &["<![CDATA[<b>bold</b>]]>".into()], &[])
            .unwrap();

        let body = std::str::from_utf8(&request.body).unwrap();
        assert!(body.contains("<![CDATA[<b>bold</b>]]>"));
    }
}
