use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_connect_reports_missing_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = CdpClient::connect(&server.uri()).await;
    assert!(matches!(result, Err(CdpError::BrowserNotAvailable(_))));
}

#[tokio::test]
async fn test_connect_follows_version_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Browser": "HeadlessChrome/120.0",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://127.0.0.1:1/devtools/browser/none"
        })))
        .mount(&server)
        .await;

    // The advertised socket does not exist, so the failure must come from
    // the WebSocket step rather than discovery.
    let result = CdpClient::connect(&server.uri()).await;
    assert!(matches!(result, Err(CdpError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_connect_ws_rejects_bad_url() {
    let result = CdpClient::connect_ws("not a url").await;
    assert!(matches!(result, Err(CdpError::ConnectionFailed(_))));
}
