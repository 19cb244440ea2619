#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use printfleet::file_manager::FileManager;
use printfleet::notify::MemoryNotifier;
use printfleet::{ApiRequest, FleetApi, Transport, TransportError};
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Empty,
    Fault,
}

/// Transport answering from a script; the last reply repeats once the
/// script runs out.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(vec![reply])
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("no request recorded")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self.last.lock().unwrap().clone().unwrap_or(Reply::Fault),
        };
        match reply {
            Reply::Json(value) => Ok(Some(value)),
            Reply::Empty => Ok(None),
            Reply::Fault => Err(TransportError::Request("connection refused".to_string())),
        }
    }
}

pub fn api_with(transport: Arc<ScriptedTransport>) -> (FleetApi, MemoryNotifier) {
    api_with_downloads(transport, std::env::temp_dir().join("printfleet-tests"))
}

pub fn api_with_downloads(
    transport: Arc<ScriptedTransport>,
    downloads: std::path::PathBuf,
) -> (FleetApi, MemoryNotifier) {
    let notifier = MemoryNotifier::new();
    let api = FleetApi::new(transport, Arc::new(notifier.clone()), FileManager::new(downloads));
    (api, notifier)
}
