//! Integration tests for `HttpStkGateway` against a mock payments API.

use serde_json::json;
use soko_core::{Currency, Price, StoreError};
use soko_mpesa::{HttpStkGateway, MpesaConfig, PaymentStatus, PhoneNumber, StkGateway};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> HttpStkGateway {
    HttpStkGateway::new(MpesaConfig::new(server.uri()))
}

#[tokio::test]
async fn initiate_push_sends_camel_case_payload_and_decodes_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/mpesa/stk-push"))
        .and(body_json(json!({
            "orderId": "ord_42",
            "phoneNumber": "254712345678",
            "amount": 308400
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "checkoutRequestId": "ws_CO_260820261530"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let phone = PhoneNumber::normalize("0712345678").unwrap();
    let id = gateway(&server)
        .initiate_push("ord_42", &phone, &Price::from_cents(308400, Currency::KES))
        .await
        .unwrap();

    assert_eq!(id, "ws_CO_260820261530");
}

#[tokio::test]
async fn rejected_push_surfaces_server_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/mpesa/stk-push"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Subscriber not reachable"
        })))
        .mount(&server)
        .await;

    let phone = PhoneNumber::normalize("0712345678").unwrap();
    let err = gateway(&server)
        .initiate_push("ord_42", &phone, &Price::from_cents(1000, Currency::KES))
        .await
        .unwrap_err();

    assert!(
        matches!(err, StoreError::PaymentDeclined { ref reason } if reason == "Subscriber not reachable")
    );
}

#[tokio::test]
async fn status_poll_decodes_payment_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/status/ord_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentStatus": "completed"
        })))
        .mount(&server)
        .await;

    let status = gateway(&server).payment_status("ord_42").await.unwrap();
    assert_eq!(status, PaymentStatus::Completed);
}

#[tokio::test]
async fn status_poll_failure_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/status/ord_42"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = gateway(&server).payment_status("ord_42").await.unwrap_err();
    assert!(err.is_retryable());
}
