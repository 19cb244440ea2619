//! Domain accessors: one async method per remote operation.
//!
//! Every accessor makes a single attempt and reports its outcome through
//! the [`Notifier`]:
//! - transport fault: logged, one generic error notification, `None`;
//! - empty/falsy or undecodable reply: one "unexpected response" error,
//!   `None`;
//! - `{success, message}` envelope: one success or error notification
//!   carrying the server's message, envelope returned;
//! - `{success: false, message}` in place of a payload: one error
//!   notification carrying the message, `None`.

pub mod jobs;
pub mod ports;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::communication::{is_falsy, ApiRequest, Transport};
use crate::file_manager::FileManager;
use crate::models::Envelope;
use crate::notify::Notifier;

/// User-facing wording for one operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Op {
    /// Shown when the transport fails outright.
    pub fault: &'static str,
    /// Shown when the reply is empty or has the wrong shape.
    pub unexpected: &'static str,
}

#[derive(Clone)]
pub struct FleetApi {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    files: FileManager,
}

impl FleetApi {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>, files: FileManager) -> Self {
        Self {
            transport,
            notifier,
            files,
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Perform the call; `None` means the fault was already reported.
    async fn send(&self, request: ApiRequest, op: Op) -> Option<Option<Value>> {
        let action = request.action.clone();
        match self.transport.request(request).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::error!("{} failed: {}", action, e);
                self.notifier.error(op.fault);
                None
            }
        }
    }

    /// Raw-payload operation: decode the reply into `T`.
    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest, op: Op) -> Option<T> {
        let action = request.action.clone();
        let reply = self.send(request, op).await?;
        let value = match reply {
            Some(value) if !is_falsy(&value) => value,
            _ => {
                tracing::error!("{}: response is undefined or null", action);
                self.notifier.error(op.unexpected);
                return None;
            }
        };
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
            tracing::error!("{}: rejected by server: {}", action, message);
            self.notifier
                .error(if message.is_empty() { op.unexpected } else { message });
            return None;
        }
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::error!("{}: unexpected response shape: {}", action, e);
                self.notifier.error(op.unexpected);
                None
            }
        }
    }

    /// Envelope operation: surface the server's verdict.
    async fn command(&self, request: ApiRequest, op: Op) -> Option<Envelope> {
        let action = request.action.clone();
        let reply = self.send(request, op).await?;
        let value = match reply {
            Some(value) if !is_falsy(&value) => value,
            _ => {
                tracing::error!("{}: response is undefined or null", action);
                self.notifier.error(op.unexpected);
                return None;
            }
        };
        let Some(success) = value.get("success").and_then(Value::as_bool) else {
            tracing::error!("{}: unexpected response: {}", action, value);
            self.notifier.error(op.unexpected);
            return None;
        };
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match (success, message.is_empty()) {
            (true, _) => self.notifier.success(&message),
            (false, false) => self.notifier.error(&message),
            (false, true) => self.notifier.error(op.unexpected),
        }
        Some(Envelope { success, message })
    }
}
