use crate::SignalingService;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let connection = service.connect(tx);
    info!(
        "New WebSocket connection: {} as {}",
        connection.id(),
        connection.user_id()
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let json = match envelope.encode() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // The receive side is stopped between frames, never while an envelope
    // is being handled, so a half-finished join cannot outlive the socket.
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let connection = connection.clone();

        async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|stop| *stop) => break,
                    msg = receiver.next() => msg,
                };
                let Some(Ok(msg)) = msg else { break };

                match msg {
                    Message::Text(text) => service.handle_text(&connection, text.as_str()).await,
                    Message::Binary(_) => {
                        warn!("Binary frame from {} ignored", connection.id());
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    let mut shutdown = service.shutdown_signal();

    let recv_finished = tokio::select! {
        _ = (&mut send_task) => false,
        _ = (&mut recv_task) => true,
        _ = shutdown.wait_for(|stop| *stop) => false,
    };

    if !recv_finished {
        stop_tx.send_replace(true);
        if let Err(e) = recv_task.await {
            error!("Receive task for {} failed: {}", connection.id(), e);
        }
    }
    send_task.abort();

    service.connection_closed(&connection).await;
    info!("WebSocket disconnected: {}", connection.id());
}
