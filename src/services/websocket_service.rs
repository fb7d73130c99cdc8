use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dto::input::{InputError, InputEventDto},
    services::input_service,
    state::SharedState,
};

/// Serve one `/ws/input` connection: every text frame is an input event,
/// answered with the outcome of dispatching it.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps replies flowing while inbound frames are awaited.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    info!("input socket connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(payload = %text, "received input frame");
                let reply = handle_frame(&state, text.as_str()).await;
                if outbound_tx.send(reply).is_err() {
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!("input socket closed by client");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(error = %err, "input socket error");
                break;
            }
        }
    }

    info!("input socket disconnected");
    finalize(writer_task, outbound_tx).await;
}

async fn handle_frame(state: &SharedState, text: &str) -> Message {
    let event = match serde_json::from_str::<InputEventDto>(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "failed to parse input frame");
            return to_message(&InputError::new(format!("invalid input event: {err}")));
        }
    };
    if let Err(err) = event.validate() {
        warn!(error = %err, "input frame failed validation");
        return to_message(&InputError::new(format!("validation failed: {err}")));
    }

    match input_service::handle_input(state, event.into()).await {
        Ok(response) => to_message(&response),
        Err(err) => to_message(&InputError::new(err.to_string())),
    }
}

fn to_message(payload: &impl Serialize) -> Message {
    match serde_json::to_string(payload) {
        Ok(json) => Message::Text(json.into()),
        Err(err) => {
            warn!(error = %err, "failed to serialize input reply");
            Message::Text(r#"{"outcome":"error","message":"internal error"}"#.into())
        }
    }
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frames_get_an_error_reply() {
        let state = AppState::new(AppConfig::default());
        let reply = text(handle_frame(&state, "{\"type\":\"jump\"}").await);
        assert!(reply.contains("\"outcome\":\"error\""));

        let long = format!(
            "{{\"type\":\"speech\",\"transcript\":\"{}\"}}",
            "a".repeat(600)
        );
        let reply = text(handle_frame(&state, &long).await);
        assert!(reply.contains("validation failed"));
    }

    #[tokio::test]
    async fn frames_without_open_tournament_are_ignored() {
        let state = AppState::new(AppConfig::default());
        let reply = text(handle_frame(&state, "{\"type\":\"pointer\",\"side\":1}").await);
        assert!(reply.contains("\"outcome\":\"ignored\""));
    }
}
