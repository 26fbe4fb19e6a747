//! # Message Loop
//!
//! The GUI shell spawns the backend and talks to it over stdin/stdout, one
//! JSON document per line.
//!
//! ```text
//! stdin  → {"id":"42","command":"sales.process","payload":{…}}
//! stdout ← {"id":"42","ok":true,"data":{"saleId":7,"ticketNumber":"V-20261017-0003"}}
//!
//! stdin  → {"command":"sales.process","payload":{…}}
//! stdout ← {"id":"<uuid v4>","ok":false,"error":{"code":"INSUFFICIENT_STOCK",…}}
//! ```
//!
//! Requests are handled one at a time, in arrival order. Logs go to
//! stderr; stdout carries responses only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::commands;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<String>,
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    fn success(id: String, data: Value) -> Self {
        Response {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(id: String, error: ApiError) -> Self {
        Response {
            id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Handles one request line.
pub async fn handle_line(state: &AppState, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            let id = Uuid::new_v4().to_string();
            warn!(request_id = %id, error = %e, "Unparseable request");
            return Response::failure(id, ApiError::validation(format!("Invalid request: {}", e)));
        }
    };

    let id = request
        .id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!("request", request_id = %id, command = %request.command);

    async move {
        debug!("Handling request");
        match commands::dispatch(state, &request.command, request.payload).await {
            Ok(data) => Response::success(id, data),
            Err(error) => {
                warn!(code = ?error.code, message = %error.message, "Command failed");
                Response::failure(id, error)
            }
        }
    }
    .instrument(span)
    .await
}

/// Reads requests until EOF, writing one response line per request.
/// Blank lines are skipped.
pub async fn run<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(state, &line).await;
        let mut out = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use serde_json::json;

    #[tokio::test]
    async fn test_id_is_echoed() {
        let state = testing::state().await;
        let response = handle_line(&state, r#"{"id":"42","command":"system.health"}"#).await;
        assert_eq!(response.id, "42");
        assert!(response.ok);
        assert_eq!(response.data.unwrap()["database"], true);
    }

    #[tokio::test]
    async fn test_generated_id_is_uuid() {
        let state = testing::state().await;
        let response = handle_line(&state, r#"{"command":"clients.debtors"}"#).await;
        assert!(Uuid::parse_str(&response.id).is_ok());
        assert!(response.ok);
    }

    #[tokio::test]
    async fn test_garbage_line() {
        let state = testing::state().await;
        let response = handle_line(&state, "not json").await;
        assert!(!response.ok);
        assert_eq!(
            response.error.unwrap().code,
            crate::error::ErrorCode::ValidationError
        );
    }

    #[tokio::test]
    async fn test_run_answers_each_line_in_order() {
        let state = testing::state().await;
        let input = [
            json!({ "id": "a", "command": "system.health" }).to_string(),
            String::new(),
            json!({ "id": "b", "command": "products.get", "payload": { "id": 999 } }).to_string(),
            json!({ "id": "c", "command": "nope" }).to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        run(&state, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], "a");
        assert_eq!(responses[0]["ok"], true);
        assert_eq!(responses[1]["error"]["code"], "NOT_FOUND");
        assert_eq!(responses[2]["error"]["code"], "VALIDATION_ERROR");
    }
}
