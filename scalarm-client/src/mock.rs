//! In-process stand-in for the information service and experiment manager

use axum::Router;
use axum::http::{HeaderMap, header};

use crate::{Credentials, ExperimentManagerClient};

pub const LOGIN: &str = "alice";
pub const PASSWORD: &str = "secret";

/// `Basic base64("alice:secret")`
const EXPECTED_AUTHORIZATION: &str = "Basic YWxpY2U6c2VjcmV0";

/// Serves `router` on an ephemeral local port and returns its `host:port`
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    address.to_string()
}

/// Client pointed at a mock experiment manager over plain HTTP
pub fn client(address: &str) -> ExperimentManagerClient {
    ExperimentManagerClient::new(Credentials::new(LOGIN, PASSWORD), "http")
        .unwrap()
        .with_service_address(address)
}

pub fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(EXPECTED_AUTHORIZATION)
}
