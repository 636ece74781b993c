//! Unit tests for the ASOS response envelope parser

use asos_downloader::fetcher::asos_parser::{parse_envelope, UNKNOWN_ERROR};
use asos_downloader::fetcher::FetcherError;

#[test]
fn test_single_item_object_is_one_record() {
    let text = r#"{"response":{"header":{"resultCode":"00","resultMsg":"NORMAL_SERVICE"},
        "body":{"items":{"item":{"tm":"2021-03-31 23:00","stnId":"99","ta":"4.2"}},
        "totalCount":1,"pageNo":1,"numOfRows":50}}}"#;

    let body = parse_envelope(text).unwrap().body.unwrap();
    assert_eq!(body.items.len(), 1);
    assert_eq!(body.items[0]["stnId"], "99");
}

#[test]
fn test_empty_items_string_means_no_records() {
    let text = r#"{"response":{"header":{"resultCode":"00","resultMsg":"NORMAL_SERVICE"},
        "body":{"items":"","totalCount":0,"pageNo":1,"numOfRows":50}}}"#;

    let body = parse_envelope(text).unwrap().body.unwrap();
    assert!(body.items.is_empty());
    assert_eq!(body.total_count, 0);
}

#[test]
fn test_total_count_as_string() {
    let text = r#"{"response":{"header":{"resultCode":"00"},
        "body":{"items":{"item":[]},"totalCount":"2184"}}}"#;

    let body = parse_envelope(text).unwrap().body.unwrap();
    assert_eq!(body.total_count, 2184);
}

#[test]
fn test_field_order_preserved() {
    let text = r#"{"response":{"body":{"items":{"item":[
        {"tm":"2021-01-01 00:00","rnum":"1","stnId":"108","stnNm":"서울","ta":"-8.1"}
    ]},"totalCount":1}}}"#;

    let body = parse_envelope(text).unwrap().body.unwrap();
    let keys: Vec<&str> = body.items[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["tm", "rnum", "stnId", "stnNm", "ta"]);
}

#[test]
fn test_missing_body_reports_result_msg() {
    let text = r#"{"response":{"header":{"resultCode":"03","resultMsg":"NO_DATA"}}}"#;

    let envelope = parse_envelope(text).unwrap();
    assert!(envelope.body.is_none());
    assert_eq!(envelope.failure_message(), "NO_DATA");
}

#[test]
fn test_missing_response_uses_unknown_error() {
    let envelope = parse_envelope("{}").unwrap();
    assert!(envelope.body.is_none());
    assert_eq!(envelope.failure_message(), UNKNOWN_ERROR);
}

#[test]
fn test_empty_body_object_counts_as_missing() {
    let envelope = parse_envelope(r#"{"response":{"header":{"resultCode":"00"},"body":{}}}"#).unwrap();
    assert!(envelope.body.is_none());
}

#[test]
fn test_xml_error_is_malformed() {
    let xml = "<OpenAPI_ServiceResponse><cmmMsgHeader><errMsg>SERVICE ERROR</errMsg>\
               <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>\
               </cmmMsgHeader></OpenAPI_ServiceResponse>";

    match parse_envelope(xml) {
        Err(FetcherError::Parse(msg)) => assert!(msg.contains("OpenAPI_ServiceResponse")),
        other => panic!("Expected Parse error, got {:?}", other),
    }
}

#[test]
fn test_no_data_header_detected() {
    let text = r#"{"response":{"header":{"resultCode":"03","resultMsg":"NO_DATA"}}}"#;

    let envelope = parse_envelope(text).unwrap();
    assert!(envelope.body.is_none());
    assert!(envelope.is_no_data());

    let ok = parse_envelope(r#"{"response":{"header":{"resultCode":"00"}}}"#).unwrap();
    assert!(!ok.is_no_data());
}
