use super::{MockNetwork, RecordingBreaker, key};
use serde_json::json;
use service_transport::{
    JsonSerializer, NetworkError, NetworkFaultKind, SerializationFaultCategory, ServiceError,
    ServiceErrorKind, ServiceTransport,
};
use std::error::Error as _;
use std::sync::Arc;

fn guarded(
    network: MockNetwork,
    breaker: &Arc<RecordingBreaker>,
) -> ServiceTransport<MockNetwork, JsonSerializer> {
    ServiceTransport::builder(network)
        .circuit_breaker(Arc::clone(breaker))
        .serializer(JsonSerializer::new())
        .build()
}

#[tokio::test]
async fn transport_unavailable_reports_failure_and_chains_fault() {
    let breaker = Arc::new(RecordingBreaker::default());
    let transport = guarded(
        MockNetwork::failing(NetworkFaultKind::TransportUnavailable),
        &breaker,
    );

    let err = transport.retrieve("/posts/1", None).await.unwrap_err();

    assert!(matches!(
        &err,
        ServiceError::ServiceUnavailable {
            endpoint,
            source: Some(_)
        } if endpoint == "/posts/1"
    ));
    assert!(!err.is_circuit_open());
    assert_eq!(
        err.network_fault(),
        Some(NetworkFaultKind::TransportUnavailable)
    );
    assert_eq!(err.to_string(), "unreachable service at endpoint /posts/1");
    assert_eq!(
        err.source().map(ToString::to_string),
        Some("transport unavailable: /posts/1 refused".to_string())
    );

    assert_eq!(breaker.failures(), vec![key("/posts/1")]);
    assert!(breaker.successes().is_empty());
}

#[tokio::test]
async fn not_found_is_service_logic_without_report() {
    let breaker = Arc::new(RecordingBreaker::default());
    let transport = guarded(MockNetwork::failing(NetworkFaultKind::NotFound), &breaker);

    let err = transport.delete("/posts/10", None).await.unwrap_err();

    assert_eq!(err.kind(), ServiceErrorKind::ServiceLogic);
    assert!(err.is_not_found());
    assert!(!err.is_forbidden());
    assert!(breaker.failures().is_empty());
    assert!(breaker.successes().is_empty());
}

#[tokio::test]
async fn forbidden_is_service_logic_but_distinguishable() {
    let breaker = Arc::new(RecordingBreaker::default());
    let transport = guarded(MockNetwork::failing(NetworkFaultKind::Forbidden), &breaker);

    let err = transport
        .create("/posts", None, Some(&json!({"title": "t"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ServiceErrorKind::ServiceLogic);
    assert!(err.is_forbidden());
    assert!(!err.is_not_found());
    assert_eq!(
        err.network_error().and_then(NetworkError::status),
        Some(403)
    );
    assert!(breaker.failures().is_empty());
    assert!(breaker.successes().is_empty());
}

#[tokio::test]
async fn undecodable_response_is_unexpected_without_report() {
    let breaker = Arc::new(RecordingBreaker::default());
    let transport = guarded(MockNetwork::replying(r#"{"id": 1"#), &breaker);

    let err = transport.retrieve("/posts/1", None).await.unwrap_err();

    assert_eq!(err.kind(), ServiceErrorKind::UnexpectedResponse);
    assert_eq!(err.to_string(), "bad response from endpoint /posts/1");
    let cause = err.serialization_error().unwrap();
    assert_eq!(cause.category(), SerializationFaultCategory::Eof);
    assert_eq!(cause.line(), 1);

    assert!(breaker.failures().is_empty());
    assert!(breaker.successes().is_empty());
    assert_eq!(transport.transport().calls(), 1);
}

#[tokio::test]
async fn status_classification_drives_the_mapping() {
    let cases = [
        (404, ServiceErrorKind::ServiceLogic, 0),
        (403, ServiceErrorKind::ServiceLogic, 0),
        (401, ServiceErrorKind::ServiceLogic, 0),
        (400, ServiceErrorKind::ServiceLogic, 0),
        (422, ServiceErrorKind::ServiceLogic, 0),
        (408, ServiceErrorKind::ServiceUnavailable, 1),
        (500, ServiceErrorKind::ServiceUnavailable, 1),
        (503, ServiceErrorKind::ServiceUnavailable, 1),
        (429, ServiceErrorKind::ServiceUnavailable, 1),
    ];

    for (status, expected, failures) in cases {
        let breaker = Arc::new(RecordingBreaker::default());
        let transport = guarded(
            MockNetwork::new(move |_| Err(NetworkError::from_status(status, "stubbed"))),
            &breaker,
        );

        let err = transport.retrieve("/posts", None).await.unwrap_err();
        assert_eq!(err.kind(), expected, "status {status}");
        assert_eq!(breaker.failures().len(), failures, "status {status}");
    }
}

#[tokio::test]
async fn disabled_breaker_propagates_network_faults() {
    let transport = ServiceTransport::builder(MockNetwork::failing(NetworkFaultKind::NotFound))
        .serializer(JsonSerializer::<serde_json::Value>::new())
        .build();

    let err = transport.retrieve("/posts/10", None).await.unwrap_err();

    match err {
        ServiceError::Network(fault) => assert_eq!(fault.kind(), NetworkFaultKind::NotFound),
        other => panic!("expected raw network fault, got {other:?}"),
    }
}

#[tokio::test]
async fn disabled_breaker_propagates_decode_faults() {
    let transport = ServiceTransport::builder(MockNetwork::replying("<html>"))
        .serializer(JsonSerializer::<serde_json::Value>::new())
        .build();

    let err = transport.retrieve("/posts/1", None).await.unwrap_err();

    assert_eq!(err.kind(), ServiceErrorKind::Serialization);
    assert_eq!(err.endpoint(), None);
    assert_eq!(
        err.serialization_error().map(|e| e.category()),
        Some(SerializationFaultCategory::Syntax)
    );
}
