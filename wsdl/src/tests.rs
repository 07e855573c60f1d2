use suds_util::{
    soap::{Envelope, SoapHeader},
    xml::{self, XSD_NS},
    ClassMap, MarshalError, Record, SoapVar, SoapVersion, Value,
};

use super::{ContractModel, ContractOptions, Error, FunctionRef, Style, Use};

const BLZ: &str = include_str!("../../tests/fixtures/blz.wsdl");
const INVENTORY: &str = include_str!("../../tests/fixtures/inventory.wsdl");
const BLZ_LOCATION: &str = "http://www.thomas-bayer.com/axis2/services/BLZService";

fn blz() -> ContractModel {
    ContractModel::from_wsdl(BLZ, ContractOptions::new()).unwrap()
}

fn inventory() -> ContractModel {
    ContractModel::from_wsdl(INVENTORY, ContractOptions::new()).unwrap()
}

fn request_text(envelope: &Envelope) -> String {
    String::from_utf8(envelope.to_request().unwrap()).unwrap()
}

#[test]
fn lists_one_function_per_soap_binding() {
    let functions = blz().list_functions().unwrap();

    assert_eq!(
        functions,
        vec![
            "getBankResponseType getBank(getBankType $parameters)",
            "getBankResponseType getBank(getBankType $parameters)",
        ]
    );
}

#[test]
fn lists_named_types() {
    let types = blz().list_types().unwrap();

    assert_eq!(types.len(), 3);
    assert_eq!(types[0], "struct getBankType {\n string blz;\n}");
    assert_eq!(
        types[2],
        "struct detailsType {\n string bezeichnung;\n string bic;\n string ort;\n string plz;\n}"
    );
}

#[test]
fn prefers_binding_of_configured_version() {
    let contract = blz();
    assert_eq!(contract.find_function("getBank").unwrap().version, SoapVersion::V1_1);

    let contract = ContractModel::from_wsdl(
        BLZ,
        ContractOptions::new().soap_version(SoapVersion::V1_2),
    )
    .unwrap();
    assert_eq!(contract.find_function("getBank").unwrap().version, SoapVersion::V1_2);
}

#[test]
fn resolves_location_by_name_and_index() {
    let contract = blz();

    assert_eq!(contract.resolve_location("getBank").unwrap(), BLZ_LOCATION);
    assert_eq!(
        contract.resolve_location(0usize).unwrap(),
        contract.resolve_location("getBank").unwrap()
    );
    assert_eq!(
        contract.resolve_location(FunctionRef::Index(1)).unwrap(),
        BLZ_LOCATION
    );
}

#[test]
fn unknown_functions_do_not_resolve() {
    let contract = blz();

    assert!(matches!(
        contract.resolve_location("unknown"),
        Err(Error::UnknownFunction(name)) if name == "unknown"
    ));
    assert!(matches!(
        contract.resolve_location(100usize),
        Err(Error::UnknownFunctionIndex(100))
    ));
}

#[test]
fn location_option_is_returned_as_is() {
    let contract =
        ContractModel::from_wsdl(BLZ, ContractOptions::new().location("http://example.com/"))
            .unwrap();

    assert_eq!(contract.resolve_location(0usize).unwrap(), "http://example.com/");
    assert!(contract.resolve_location("unknown").is_err());
}

#[test]
fn non_wsdl_requires_location_and_uri() {
    assert!(matches!(
        ContractModel::non_wsdl(ContractOptions::new().uri("demo")),
        Err(Error::MissingLocation)
    ));
    assert!(matches!(
        ContractModel::non_wsdl(ContractOptions::new().location("http://example.com/soap")),
        Err(Error::MissingNamespace)
    ));
    assert!(matches!(
        ContractModel::new(None, ContractOptions::new()),
        Err(Error::MissingLocation)
    ));
}

#[test]
fn non_wsdl_resolves_any_function() {
    let contract = ContractModel::non_wsdl(
        ContractOptions::new()
            .location("http://example.com/soap")
            .uri("demo"),
    )
    .unwrap();

    assert_eq!(contract.list_functions(), None);
    assert_eq!(contract.list_types(), None);
    assert_eq!(contract.resolve_location("add").unwrap(), "http://example.com/soap");
    assert_eq!(contract.resolve_location("anything").unwrap(), "http://example.com/soap");
    assert!(contract.resolve_location(0usize).is_err());

    let function = contract.function("add").unwrap();
    assert_eq!(function.action, "demo#add");
    assert_eq!(function.style, Style::Rpc);
    assert_eq!(function.input_use, Use::Encoded);
}

#[test]
fn rejects_invalid_documents() {
    assert!(ContractModel::from_wsdl("invalid", ContractOptions::new()).is_err());
    assert!(ContractModel::from_wsdl("<definitions><types></definitions>", ContractOptions::new()).is_err());
    assert!(matches!(
        ContractModel::from_wsdl("<schema/>", ContractOptions::new()),
        Err(Error::MissingDefinitions)
    ));
}

#[test]
fn rejects_unknown_references() {
    let wsdl = BLZ.replace(r#"type="tns:detailsType""#, r#"type="tns:missingType""#);
    assert!(matches!(
        ContractModel::from_wsdl(&wsdl, ContractOptions::new()),
        Err(Error::UnknownType(name)) if name.ends_with("missingType")
    ));

    let wsdl = BLZ.replace(
        r#"binding="tns:BLZServiceSOAP12Binding""#,
        r#"binding="tns:NoSuchBinding""#,
    );
    assert!(matches!(
        ContractModel::from_wsdl(&wsdl, ContractOptions::new()),
        Err(Error::UnknownBinding(_))
    ));

    let wsdl = BLZ.replace(r#"<wsdl:part name="parameters" element="tns:getBank"/>"#, r#"<wsdl:part element="tns:getBank"/>"#);
    assert!(matches!(
        ContractModel::from_wsdl(&wsdl, ContractOptions::new()),
        Err(Error::MissingAttribute { element: "part", attribute: "name" })
    ));
}

#[test]
fn rejects_cyclic_restrictions() {
    let wsdl = INVENTORY.replace(
        r#"<xsd:restriction base="xsd:string">"#,
        r#"<xsd:restriction base="tns:Code">"#,
    );
    let wsdl = wsdl.replace(
        r#"<xsd:complexType name="Item">"#,
        r#"<xsd:simpleType name="Code">
                <xsd:restriction base="tns:Sku"/>
            </xsd:simpleType>
            <xsd:complexType name="Item">"#,
    );

    assert!(matches!(
        ContractModel::from_wsdl(&wsdl, ContractOptions::new()),
        Err(Error::CyclicType(name)) if name.ends_with("Sku")
    ));

    let wsdl = INVENTORY.replace(
        r#"<xsd:restriction base="xsd:string">"#,
        r#"<xsd:restriction base="tns:Sku">"#,
    );
    assert!(matches!(
        ContractModel::from_wsdl(&wsdl, ContractOptions::new()),
        Err(Error::CyclicType(_))
    ));
}

#[test]
fn describes_rpc_contract() {
    let contract = inventory();

    assert_eq!(
        contract.list_functions().unwrap(),
        vec![
            "int addItem(Sku $sku, PricedItem $item)",
            "list(ArrayOfString $tags, int $total) listTags(string $category)",
            "void ping()",
            "searchResponse search(search $parameters)",
        ]
    );

    assert_eq!(
        contract.list_types().unwrap(),
        vec![
            "string Sku",
            "struct Item {\n string name;\n int quantity;\n}",
            "struct PricedItem {\n string name;\n int quantity;\n double price;\n string note;\n}",
            "string ArrayOfString[]",
            "struct search {\n string term;\n int limit;\n}",
            "struct searchResponse {\n string result;\n}",
        ]
    );

    let add_item = contract.find_function("addItem").unwrap();
    assert_eq!(add_item.action, "urn:inventory#addItem");
    assert_eq!(add_item.style, Style::Rpc);
    assert_eq!(add_item.input_use, Use::Encoded);
    assert_eq!(add_item.namespace.as_deref(), Some("urn:inventory"));
    assert_eq!(add_item.documentation.as_deref(), Some("Adds stock for an item."));

    assert_eq!(contract.find_function("search").unwrap().style, Style::Document);
}

#[test]
fn encodes_document_literal_call() {
    let contract = blz();
    let function = contract.function("getBank").unwrap();
    let args = [Value::from(Record::new().with("blz", "12070000"))];

    let envelope = contract.encode_call(&function, &args, &[]).unwrap();

    assert_eq!(
        request_text(&envelope),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" xmlns:ns1=\"http://thomas-bayer.com/blz/\">\
         <SOAP-ENV:Body><ns1:getBank><ns1:blz>12070000</ns1:blz></ns1:getBank></SOAP-ENV:Body></SOAP-ENV:Envelope>\n"
    );
}

#[test]
fn encodes_soap12_envelope() {
    let contract = ContractModel::from_wsdl(
        BLZ,
        ContractOptions::new().soap_version(SoapVersion::V1_2),
    )
    .unwrap();
    let function = contract.function("getBank").unwrap();
    let args = [Value::from(Record::new().with("blz", "12070000"))];

    let text = request_text(&contract.encode_call(&function, &args, &[]).unwrap());

    assert!(text.contains("<env:Envelope xmlns:env=\"http://www.w3.org/2003/05/soap-envelope\""));
    assert!(text.contains("<env:Body><ns1:getBank>"));
}

#[test]
fn encodes_rpc_encoded_call() {
    let contract = inventory();
    let function = contract.function("addItem").unwrap();
    let item = Record::new()
        .with("name", "bolt")
        .with("quantity", 12)
        .with("price", 0.25);

    let envelope = contract
        .encode_call(&function, &["ABC-1".into(), item.into()], &[])
        .unwrap();
    let request = xml::parse(&request_text(&envelope)).unwrap();

    let body = request.child("Body").unwrap();
    let wrapper = body.child("addItem").unwrap();
    assert_eq!(wrapper.namespace.as_deref(), Some("urn:inventory"));

    let sku = wrapper.child("sku").unwrap();
    assert_eq!(sku.namespace, None);
    assert_eq!(sku.xsi_type(), Some((Some("urn:inventory"), "Sku")));
    assert_eq!(sku.text(), "ABC-1");

    let item = wrapper.child("item").unwrap();
    assert_eq!(item.xsi_type(), Some((Some("urn:inventory"), "PricedItem")));
    let names: Vec<_> = item.elements().map(|child| child.name.as_str()).collect();
    assert_eq!(names, ["name", "quantity", "price"]);
    assert_eq!(item.child("quantity").unwrap().xsi_type(), Some((Some(XSD_NS), "int")));
}

#[test]
fn encodes_headers_before_body() {
    let contract = blz();
    let function = contract.function("getBank").unwrap();
    let args = [Value::from(Record::new().with("blz", "12070000"))];
    let headers = [SoapHeader::new("urn:auth", "token", "secret").must_understand()];

    let text = request_text(&contract.encode_call(&function, &args, &headers).unwrap());

    assert!(text.contains(
        "<SOAP-ENV:Header><ns1:token SOAP-ENV:mustUnderstand=\"1\">secret</ns1:token></SOAP-ENV:Header><SOAP-ENV:Body>"
    ));
}

#[test]
fn rejects_mismatched_arguments() {
    let contract = inventory();
    let add_item = contract.function("addItem").unwrap();

    assert!(matches!(
        contract.encode_call(&add_item, &["ABC-1".into()], &[]),
        Err(MarshalError::Arity { expected: 2, got: 1, .. })
    ));

    let incomplete = Record::new().with("name", "bolt").with("price", 1.5);
    assert!(matches!(
        contract.encode_call(&add_item, &["ABC-1".into(), incomplete.into()], &[]),
        Err(MarshalError::MissingProperty(field)) if field == "quantity"
    ));

    let wrong = Record::new()
        .with("name", "bolt")
        .with("quantity", "many")
        .with("price", 1.5);
    assert!(matches!(
        contract.encode_call(&add_item, &["ABC-1".into(), wrong.into()], &[]),
        Err(MarshalError::InvalidScalar { .. })
    ));

    assert!(matches!(
        contract.encode_call(&add_item, &["ABC-1".into(), "not a record".into()], &[]),
        Err(MarshalError::UnexpectedKind { expected: "record", .. })
    ));
}

#[test]
fn encodes_non_wsdl_rpc_call() {
    let contract = ContractModel::non_wsdl(
        ContractOptions::new()
            .location("http://example.com/soap")
            .uri("demo"),
    )
    .unwrap();
    let function = contract.function("add").unwrap();

    let text = request_text(&contract.encode_call(&function, &[10.into(), 20.into()], &[]).unwrap());

    assert!(text.contains("SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\""));
    assert!(text.contains(
        "<ns1:add><param0 xsi:type=\"xsd:int\">10</param0><param1 xsi:type=\"xsd:int\">20</param1></ns1:add>"
    ));
}

#[test]
fn encodes_non_wsdl_literal_soap_var() {
    let contract = ContractModel::non_wsdl(
        ContractOptions::new()
            .location(BLZ_LOCATION)
            .uri("http://thomas-bayer.com/blz/")
            .body_use(Use::Literal),
    )
    .unwrap();
    let function = contract.function("getBank").unwrap();
    let blz = SoapVar::new("12070000")
        .with_type(XSD_NS, "string")
        .with_node(Some("http://thomas-bayer.com/blz/"), "blz");

    let envelope = contract.encode_call(&function, &[blz.into()], &[]).unwrap();

    assert_eq!(
        request_text(&envelope),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" xmlns:ns1=\"http://thomas-bayer.com/blz/\">\
         <SOAP-ENV:Body><ns1:getBank><ns1:blz>12070000</ns1:blz></ns1:getBank></SOAP-ENV:Body></SOAP-ENV:Envelope>\n"
    );
}

#[test]
fn non_wsdl_document_style_needs_named_vars() {
    let contract = ContractModel::non_wsdl(
        ContractOptions::new()
            .location("http://example.com/soap")
            .uri("demo")
            .style(Style::Document),
    )
    .unwrap();
    let function = contract.function("add").unwrap();

    assert!(matches!(
        contract.encode_call(&function, &[10.into()], &[]),
        Err(MarshalError::UntypedArgument(0))
    ));
}

const BLZ_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns1:getBankResponse xmlns:ns1="http://thomas-bayer.com/blz/">
      <ns1:details>
        <ns1:bezeichnung>Deutsche Bank</ns1:bezeichnung>
        <ns1:bic>DEUTDEBB160</ns1:bic>
        <ns1:ort>Potsdam</ns1:ort>
        <ns1:plz>14405</ns1:plz>
      </ns1:details>
    </ns1:getBankResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

#[test]
fn decodes_document_literal_response() {
    let envelope = Envelope::from_response(BLZ_RESPONSE.as_bytes()).unwrap();
    let value = blz().decode_response("getBank", &envelope).unwrap();

    assert_eq!(value.as_record().unwrap().type_name.as_deref(), Some("getBankResponseType"));
    let details = value.get("details").unwrap();
    assert_eq!(details.get("bic"), Some(&Value::from("DEUTDEBB160")));
    assert_eq!(details.get("plz"), Some(&Value::from("14405")));
}

#[derive(Debug, serde::Deserialize)]
struct BankResponse {
    details: Details,
}

#[derive(Debug, serde::Deserialize)]
struct Details {
    bic: String,
}

#[test]
fn hydrates_class_mapped_response() {
    let contract = ContractModel::from_wsdl(
        BLZ,
        ContractOptions::new().class_map(ClassMap::new().with::<BankResponse>("getBankResponseType")),
    )
    .unwrap();
    let envelope = Envelope::from_response(BLZ_RESPONSE.as_bytes()).unwrap();

    let value = contract.decode_response("getBank", &envelope).unwrap();
    let response = value.downcast_ref::<BankResponse>().unwrap();

    assert_eq!(response.details.bic, "DEUTDEBB160");
}

#[test]
fn unknown_function_decodes_from_shape() {
    let envelope = Envelope::from_response(BLZ_RESPONSE.as_bytes()).unwrap();
    let value = blz().decode_response("somethingElse", &envelope).unwrap();

    assert!(value.get("details").is_none());
    assert_eq!(value.get("bic"), Some(&Value::from("DEUTDEBB160")));
}

#[test]
fn decodes_rpc_response_with_several_parts() {
    let response = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
        xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xmlns:xsd="http://www.w3.org/2001/XMLSchema">
      <SOAP-ENV:Body>
        <ns1:listTagsResponse xmlns:ns1="urn:inventory">
          <tags xsi:type="SOAP-ENC:Array" SOAP-ENC:arrayType="xsd:string[2]">
            <item xsi:type="xsd:string">red</item>
            <item xsi:type="xsd:string">blue</item>
          </tags>
          <total xsi:type="xsd:int">2</total>
        </ns1:listTagsResponse>
      </SOAP-ENV:Body>
    </SOAP-ENV:Envelope>"#;

    let envelope = Envelope::from_response(response.as_bytes()).unwrap();
    let value = inventory().decode_response("listTags", &envelope).unwrap();

    assert_eq!(
        value.get("tags"),
        Some(&Value::List(vec!["red".into(), "blue".into()]))
    );
    assert_eq!(value.get("total"), Some(&Value::Int(2)));
}

#[test]
fn decodes_repeated_fields_as_list() {
    let response = r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
      <env:Body>
        <s:searchResponse xmlns:s="urn:inventory:search">
          <s:result>bolt</s:result>
        </s:searchResponse>
      </env:Body>
    </env:Envelope>"#;

    let envelope = Envelope::from_response(response.as_bytes()).unwrap();
    let value = inventory().decode_response("search", &envelope).unwrap();

    assert_eq!(value.get("result"), Some(&Value::List(vec!["bolt".into()])));
}

#[test]
fn decodes_scalar_rpc_result() {
    let response = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
      <SOAP-ENV:Body>
        <ns1:addItemResponse xmlns:ns1="urn:inventory"><return>42</return></ns1:addItemResponse>
      </SOAP-ENV:Body>
    </SOAP-ENV:Envelope>"#;

    let envelope = Envelope::from_response(response.as_bytes()).unwrap();

    assert_eq!(inventory().decode_response("addItem", &envelope).unwrap(), Value::Int(42));
}
