//! Availability probes clients hit before opening a WebSocket.

use std::time::Duration;

use axum::extract::{Form, FromRequest, Request, State};
use axum::http::header;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tether_common::TetherError;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::hub::HubHandle;

pub const BAD_PARAMS: &str = "ERROR_BAD_PARAMS";

#[derive(Clone)]
pub struct ProbeState {
    pub hub: HubHandle,
    pub session_delay: Duration,
}

#[derive(Deserialize)]
struct WakeParams {
    identifier: Option<Value>,
}

#[derive(Deserialize)]
struct SessionParams {
    id: Option<Value>,
}

pub fn router(state: ProbeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/wake", post(handle_wake))
        .route("/session", post(handle_session))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(listener: TcpListener, state: ProbeState) -> Result<(), TetherError> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_root() -> &'static str {
    "Server Online!"
}

async fn handle_wake(request: Request) -> String {
    let identifier = extract_params::<WakeParams>(request)
        .await
        .and_then(|params| params.identifier);
    param_text(identifier).unwrap_or_else(|| BAD_PARAMS.to_string())
}

async fn handle_session(State(state): State<ProbeState>, request: Request) -> &'static str {
    let id = extract_params::<SessionParams>(request)
        .await
        .and_then(|params| params.id);

    tokio::time::sleep(state.session_delay).await;

    let Some(key) = param_text(id) else {
        return BAD_PARAMS;
    };
    match state.hub.session_exists(&key).await {
        Ok(true) => "VALID",
        Ok(false) => "INVALID",
        Err(e) => {
            tracing::warn!(error = %e, "Session probe failed");
            "INVALID"
        }
    }
}

/// Parse a urlencoded form or JSON body. Anything else yields `None`.
async fn extract_params<T: DeserializeOwned + Send>(request: Request) -> Option<T> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        Form::<T>::from_request(request, &()).await.ok().map(|Form(params)| params)
    } else {
        Json::<T>::from_request(request, &()).await.ok().map(|Json(params)| params)
    }
}

/// Text form of a request parameter. Missing, null, false, zero, and empty
/// values count as absent.
pub(crate) fn param_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub;
    use serde_json::json;

    #[test]
    fn param_text_echoes_strings_and_numbers() {
        assert_eq!(param_text(Some(json!("host-42"))), Some("host-42".into()));
        assert_eq!(param_text(Some(json!(42))), Some("42".into()));
        assert_eq!(param_text(Some(json!(true))), Some("true".into()));
    }

    #[test]
    fn param_text_treats_falsy_as_missing() {
        assert_eq!(param_text(None), None);
        assert_eq!(param_text(Some(Value::Null)), None);
        assert_eq!(param_text(Some(json!(""))), None);
        assert_eq!(param_text(Some(json!(0))), None);
        assert_eq!(param_text(Some(json!(false))), None);
    }

    async fn start_probes(hub: HubHandle) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = ProbeState {
            hub,
            session_delay: Duration::ZERO,
        };
        tokio::spawn(serve(listener, state));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn root_reports_online() {
        let base = start_probes(hub::spawn(Duration::from_secs(5))).await;
        let body = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "Server Online!");
    }

    #[tokio::test]
    async fn wake_echoes_identifier() {
        let base = start_probes(hub::spawn(Duration::from_secs(5))).await;
        let client = reqwest::Client::new();

        let body = client
            .post(format!("{base}/wake"))
            .json(&json!({"identifier": "desk-7"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "desk-7");

        let body = client
            .post(format!("{base}/wake"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("identifier=desk-8")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "desk-8");
    }

    #[tokio::test]
    async fn wake_without_identifier_is_bad_params() {
        let base = start_probes(hub::spawn(Duration::from_secs(5))).await;
        let client = reqwest::Client::new();

        let body = client
            .post(format!("{base}/wake"))
            .json(&json!({}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, BAD_PARAMS);

        let body = client
            .post(format!("{base}/wake"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, BAD_PARAMS);
    }

    #[tokio::test]
    async fn session_probe_reports_unknown_key() {
        let base = start_probes(hub::spawn(Duration::from_secs(5))).await;
        let client = reqwest::Client::new();

        let body = client
            .post(format!("{base}/session"))
            .json(&json!({"id": "ABC"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "INVALID");

        let body = client
            .post(format!("{base}/session"))
            .json(&json!({}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, BAD_PARAMS);
    }

    #[tokio::test]
    async fn session_probe_sees_live_session() {
        let hub = hub::spawn(Duration::from_secs(5));
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let host = tether_common::ConnectionId::from("host");
        hub.connect(host.clone(), tx).await.unwrap();
        let frame = serde_json::from_value(json!({"type": "create_session", "seq": 1, "key": "ABC"}))
            .unwrap();
        hub.frame(host, frame).await.unwrap();
        assert!(rx.recv().await.unwrap().contains("\"ok\":true"));

        let base = start_probes(hub).await;
        let body = reqwest::Client::new()
            .post(format!("{base}/session"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("id=ABC")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "VALID");
    }
}
