//! WebSocket reader feeding the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::event_system::{EventBus, PushEvent};
use super::TransportError;
use crate::config::ServerConfig;

pub struct SocketChannel {
    url: String,
    reconnect_delay: Duration,
    bus: Arc<EventBus>,
}

impl SocketChannel {
    pub fn new(config: &ServerConfig, bus: Arc<EventBus>) -> Self {
        Self {
            url: config.socket_url.clone(),
            reconnect_delay: config.reconnect_delay(),
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Read one connection to completion. Returns the number of events
    /// dispatched before the server closed the stream.
    pub async fn run_once(&self) -> Result<usize, TransportError> {
        tracing::info!("Connecting to push channel {}", self.url);
        let (mut stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tracing::info!("Push channel connected");

        let mut delivered = 0;
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if handle_frame(&self.bus, &text) {
                        delivered += 1;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Binary(_))
                | Ok(Message::Ping(_))
                | Ok(Message::Pong(_))
                | Ok(Message::Frame(_)) => {}
                Err(e) => {
                    tracing::error!("Push channel stream error: {}", e);
                    return Err(TransportError::Request(e.to_string()));
                }
            }
        }
        tracing::info!("Push channel closed after {} events", delivered);
        Ok(delivered)
    }

    /// Keep the channel connected until the task is aborted.
    pub async fn run(self) {
        loop {
            if let Err(e) = self.run_once().await {
                tracing::warn!("Push channel disconnected: {}", e);
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Decode one text frame and dispatch it. Unknown or malformed frames are
/// logged and skipped.
pub fn handle_frame(bus: &EventBus, text: &str) -> bool {
    match PushEvent::from_frame(text) {
        Ok(event) => {
            tracing::debug!("Push event {}", event.kind());
            bus.dispatch(&event);
            true
        }
        Err(e) => {
            tracing::warn!("Skipping push frame: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::event_system::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handle_frame_skips_garbage() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = bus.subscribe(EventKind::StatusUpdate, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!handle_frame(&bus, "not json"));
        assert!(!handle_frame(&bus, r#"{"event":"status_update","data":{"status":"ready"}}"#));
        assert!(handle_frame(
            &bus,
            r#"{"event":"status_update","data":{"printer_id":2,"status":"ready"}}"#
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
