use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use futures_util::{FutureExt, SinkExt, StreamExt};
use log::{debug, error};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::router::EventRouter;
use crate::store::{CommunityStore, InMemoryStore};

#[derive(Clone)]
pub struct Server {
    router: EventRouter,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }
}

impl Server {
    pub fn new(store: Arc<dyn CommunityStore>) -> Self {
        Server {
            router: EventRouter::new(store),
        }
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Runs one socket until it closes. Frames from this socket are handled
    /// strictly in arrival order; the write pump drains the session's outbox.
    pub async fn handle_connection(&self, ws: WebSocket) {
        let session_id = Uuid::new_v4().to_string();
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        self.router.connect(&session_id, tx).await;

        let writer_id = session_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = ws_tx.send(Message::text(frame)).await {
                    error!("Failed to send WebSocket message to {writer_id}: {e}");
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(msg) => {
                    if let Ok(text) = msg.to_str() {
                        // Rejections are already reported to the client. A panic
                        // drops the connection but still runs the cleanup below.
                        let handled = AssertUnwindSafe(self.router.handle_frame(&session_id, text))
                            .catch_unwind()
                            .await;
                        if handled.is_err() {
                            error!("Handler panicked on a frame from {session_id}, closing");
                            break;
                        }
                    } else {
                        debug!("Ignoring non-text frame from {session_id}");
                    }
                }
                Err(e) => {
                    error!("WebSocket error on {session_id}: {e}");
                    break;
                }
            }
        }

        // Dropping the registry's sender ends the write pump.
        self.router.disconnect(&session_id).await;
        let _ = writer.await;
    }
}
