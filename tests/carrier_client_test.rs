use rust_decimal_macros::dec;
use shopcore_api::carriers::{
    CarrierClient, CarrierError, GuideRequest, HttpCarrierClient, RateRequest,
};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rate_request() -> RateRequest {
    RateRequest {
        shipment_id: Uuid::new_v4(),
        recipient_name: "Jamie Tester".to_string(),
        address: "1 Test Street, Testville".to_string(),
        service_level: Some("express".to_string()),
    }
}

#[tokio::test]
async fn quote_rate_parses_the_provider_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/rates"))
        .and(header("authorization", "Bearer carrier-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rate_id": "rate_8842",
            "amount": "18.40",
            "currency": "USD",
            "carrier": "TestExpress"
        })))
        .mount(&server)
        .await;

    let client =
        HttpCarrierClient::new(&server.uri(), Some("carrier-key".to_string())).unwrap();
    let quote = client.quote_rate(&rate_request()).await.unwrap();

    assert_eq!(quote.rate_id, "rate_8842");
    assert_eq!(quote.amount, dec!(18.40));
    assert_eq!(quote.carrier, "TestExpress");
}

#[tokio::test]
async fn provider_rejection_carries_the_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/rates"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "destination postal code not serviced"
        })))
        .mount(&server)
        .await;

    let client = HttpCarrierClient::new(&server.uri(), None).unwrap();
    let err = client.quote_rate(&rate_request()).await.unwrap_err();
    assert!(err.is_provider_rejection());

    match err {
        CarrierError::Provider { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "destination postal code not serviced");
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn provider_error_without_json_body_falls_back_to_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/guides"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = HttpCarrierClient::new(&server.uri(), None).unwrap();
    let err = client
        .create_guide(&GuideRequest {
            shipment_id: Uuid::new_v4(),
            rate_id: "rate_1".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        CarrierError::Provider { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn create_guide_sends_the_rate_reference() {
    let server = MockServer::start().await;
    let shipment_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/v1/guides"))
        .and(body_partial_json(serde_json::json!({
            "rate_id": "rate_77"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "guide_id": "guide_311",
            "tracking_number": "TRK0001122",
            "label_url": "https://labels.test/guide_311.pdf"
        })))
        .mount(&server)
        .await;

    let client = HttpCarrierClient::new(&server.uri(), None).unwrap();
    let guide = client
        .create_guide(&GuideRequest {
            shipment_id,
            rate_id: "rate_77".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(guide.guide_id, "guide_311");
    assert_eq!(guide.tracking_number, "TRK0001122");
    assert!(guide.label_url.ends_with(".pdf"));
}
