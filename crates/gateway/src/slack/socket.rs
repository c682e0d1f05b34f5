//! Slack Socket Mode connection.
//!
//! An outbound WebSocket to Slack's servers: no inbound port, only the
//! app-level token. Envelopes are acked immediately (Slack redelivers
//! unacked events), payloads are normalized and handed to the
//! dispatcher, and the connection loop reconnects on any failure.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hive_domain::error::{Error, Result};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::dispatch::Dispatcher;
use crate::slack::events::normalize;

#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    envelope_type: String,
    payload: Option<serde_json::Value>,
}

/// Run the Socket Mode loop forever, reconnecting with a delay after
/// disconnects and errors.
pub async fn run_socket_mode(app_token: String, dispatcher: Arc<Dispatcher>) {
    loop {
        match connect_once(&app_token, &dispatcher).await {
            Ok(()) => {
                tracing::info!("Socket Mode connection closed, reconnecting in 5s");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Socket Mode error, reconnecting in 10s");
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }
    }
}

async fn connect_once(app_token: &str, dispatcher: &Arc<Dispatcher>) -> Result<()> {
    let wss_url = fetch_socket_url(app_token).await?;
    tracing::debug!(url = %wss_url, "Socket Mode WebSocket URL obtained");

    let (ws_stream, _) = connect_async(&wss_url)
        .await
        .map_err(|e| Error::Http(format!("WebSocket connect: {e}")))?;
    let (mut sink, mut stream) = ws_stream.split();

    tracing::info!("Socket Mode connected");

    while let Some(msg) = stream.next().await {
        let msg = msg.map_err(|e| Error::Http(format!("WebSocket read: {e}")))?;
        match msg {
            WsMessage::Text(text) => {
                let envelope: SocketEnvelope = match serde_json::from_str(&text) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(error = %e, "unparseable Socket Mode frame");
                        continue;
                    }
                };

                // Ack first: Slack redelivers anything left unacked, and
                // handling must never delay the transport.
                if let Some(envelope_id) = &envelope.envelope_id {
                    let ack = serde_json::json!({ "envelope_id": envelope_id });
                    let _ = sink.send(WsMessage::Text(ack.to_string())).await;
                }

                match envelope.envelope_type.as_str() {
                    "events_api" | "interactive" => {
                        if let Some(payload) = &envelope.payload {
                            if let Some(event) = normalize(&envelope.envelope_type, payload) {
                                let dispatcher = dispatcher.clone();
                                tokio::spawn(async move {
                                    dispatcher.handle_event(event).await;
                                });
                            }
                        }
                    }
                    "disconnect" => {
                        tracing::info!("Slack requested Socket Mode reconnect");
                        return Ok(());
                    }
                    "hello" => {
                        tracing::debug!("Socket Mode hello received");
                    }
                    other => {
                        tracing::debug!(envelope_type = other, "unhandled envelope type");
                    }
                }
            }
            WsMessage::Close(_) => return Ok(()),
            _ => {}
        }
    }

    Ok(())
}

/// Call `apps.connections.open` with the app token to get the WSS URL.
async fn fetch_socket_url(app_token: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .post("https://slack.com/api/apps.connections.open")
        .bearer_auth(app_token)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?
        .json::<serde_json::Value>()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    if resp.get("ok").and_then(|v| v.as_bool()) != Some(true) {
        let err = resp
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_error");
        return Err(Error::Slack {
            method: "apps.connections.open".into(),
            message: err.into(),
        });
    }

    resp.get("url")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::Slack {
            method: "apps.connections.open".into(),
            message: "no url in response".into(),
        })
}
