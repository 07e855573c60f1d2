mod blz {
    suds_macro::suds!("../tests/fixtures/blz.wsdl");
}

#[test]
fn exposes_function_table() {
    assert_eq!(
        blz::blz_service::FUNCTIONS,
        ["getBankResponseType getBank(getBankType $parameters)"]
    );
    assert!(blz::blz_service::WSDL.contains("BLZService"));
}

#[test]
fn proxy_wraps_client() {
    let proxy = blz::blz_service::Proxy::new().unwrap();

    assert_eq!(proxy.client().list_functions().map(|functions| functions.len()), Some(2));
    assert_eq!(
        proxy.client().location_of("getBank").unwrap(),
        "http://www.thomas-bayer.com/axis2/services/BLZService"
    );
}

#[tokio::test]
async fn proxy_methods_encode_before_sending() {
    let proxy = blz::blz_service::Proxy::new().unwrap();

    let err = proxy.get_bank("not a record".into()).await.unwrap_err();
    assert!(matches!(err, suds::Error::Encode(_)));
}
