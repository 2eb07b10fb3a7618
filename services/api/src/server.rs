use crate::bridge::MediaBridge;
use crate::protocol::{ClientMessage, ServerMessage};
use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use lecture_core::{Input, PresentationHandle, PresentationSnapshot};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub handle: PresentationHandle,
    pub bridge: Arc<MediaBridge>,
    /// Said to every renderer that connects before the lesson starts.
    pub greeting: String,
}

/// Builds the router: the renderer socket at `/ws`, a state probe at
/// `/state`, and the slide deck served from the root so the clip URLs the
/// presentation hands out resolve as-is.
pub fn router(state: AppState, assets_dir: &Path) -> Router {
    // The renderer may be served from a different origin during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/state", get(state_handler))
        .fallback_service(ServeDir::new(assets_dir))
        .layer(cors)
        .with_state(state)
}

async fn state_handler(State(state): State<AppState>) -> Json<PresentationSnapshot> {
    Json(state.handle.snapshot())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manages one renderer connection.
///
/// Outgoing media instructions, slides and state snapshots are forwarded by
/// a writer task; incoming messages are dispatched to the presentation here.
/// The newest connection owns the lesson: when it goes away nobody is left
/// to report playback completion, so the lesson is stopped. Older
/// connections that close later leave it alone.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let generation = state.bridge.connect_renderer();
    info!("Renderer {} connected", generation);
    let (mut sink, mut stream) = socket.split();

    let mut outbound = state.bridge.subscribe();
    let mut snapshots = state.handle.subscribe();
    snapshots.mark_changed();
    let mut slides = state.handle.subscribe_slides();
    slides.mark_changed();

    let greeting = (!snapshots.borrow().started).then(|| ServerMessage::Say {
        text: state.greeting.clone(),
    });
    let bridge = state.bridge.clone();

    let writer = tokio::spawn(async move {
        let opening = greeting.into_iter().chain(bridge.replay());
        for msg in opening {
            if send_json(&mut sink, &msg).await.is_err() {
                return;
            }
        }
        loop {
            let batch = tokio::select! {
                msg = outbound.recv() => match msg {
                    Ok(msg) => vec![msg],
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Renderer lagged behind, {} messages dropped. Resending current media.",
                            skipped
                        );
                        bridge.replay()
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    vec![ServerMessage::State(snapshot)]
                }
                changed = slides.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let slide = slides.borrow_and_update().clone();
                    slide.map(ServerMessage::ShowSlide).into_iter().collect()
                }
            };
            for msg in &batch {
                if send_json(&mut sink, msg).await.is_err() {
                    // Client disconnected.
                    return;
                }
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(msg) => {
                    if let Err(e) = dispatch(&state, msg).await {
                        tracing::error!("Failed to forward renderer message: {:#}", e);
                        break;
                    }
                }
                Err(e) => tracing::warn!("Ignoring malformed renderer message: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                info!("WebSocket error: {}", e);
                break;
            }
        }
    }

    writer.abort();
    if !state.bridge.is_current_renderer(generation) {
        info!("Renderer {} disconnected after being replaced.", generation);
        return;
    }
    info!("Renderer {} disconnected, stopping the lesson.", generation);
    if let Err(e) = state.handle.send(Input::Stop).await {
        tracing::debug!("Could not stop the lesson: {:#}", e);
    }
}

async fn dispatch(state: &AppState, msg: ClientMessage) -> Result<()> {
    match msg {
        ClientMessage::Start => state.handle.send(Input::Start).await,
        ClientMessage::Stop => state.handle.send(Input::Stop).await,
        ClientMessage::Question { text } => state.handle.send(Input::Submit(text)).await,
        ClientMessage::MediaEnded { playback_id } => {
            state.bridge.media_ended(playback_id);
            Ok(())
        }
    }
}

async fn send_json<S>(sink: &mut S, msg: &ServerMessage) -> Result<()>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    let text = serde_json::to_string(msg)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}
