//! HTTP implementation of [`Transport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part as FormPart};
use reqwest::Client;
use serde_json::Value;

use super::{ApiRequest, Body, Method, Part, Transport, TransportError};
use crate::config::ServerConfig;

static HTTP_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub struct HttpTransport {
    client: Client,
    base_url: String,
    io_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Result<Self, TransportError> {
        if config.base_url.trim().is_empty() {
            return Err(TransportError::InvalidUrl("base_url is empty".to_string()));
        }
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            io_timeout: config.io_timeout(),
        })
    }

    fn url_for(&self, action: &str) -> String {
        format!("{}/{}", self.base_url, action.trim_start_matches('/'))
    }
}

fn multipart_form(parts: Vec<Part>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| match part {
        Part::Text { name, value } => form.text(name, value),
        Part::File { name, file_name, contents } => {
            form.part(name, FormPart::bytes(contents).file_name(file_name))
        }
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>, TransportError> {
        let request_id = HTTP_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let url = self.url_for(&request.action);
        tracing::debug!("http {:?}#{} {}", request.method, request_id, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder
            .header(ACCEPT, "application/json")
            .timeout(self.io_timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Some(Body::Json(value)) => builder.json(&value),
            Some(Body::Multipart(parts)) => builder.multipart(multipart_form(parts)),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!(
                "http #{} {} failed (timeout={} connect={}): {}",
                request_id,
                request.action,
                e.is_timeout(),
                e.is_connect(),
                e
            );
            TransportError::Request(e.to_string())
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tracing::debug!(
            "http #{} status={} content-type={} body_len={}",
            request_id,
            status,
            content_type,
            body.len()
        );
        if status / 100 != 2 {
            // A JSON error body is still a reply; the accessors judge its shape.
            if let Ok(value) = serde_json::from_str::<Value>(&body) {
                tracing::warn!("http #{} {} returned status {}: {}", request_id, request.action, status, value);
                return Ok(Some(value));
            }
            tracing::error!("http #{} {} returned status {}", request_id, request.action, status);
            return Err(TransportError::Status { action: request.action, status });
        }
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_normalizes_slashes() {
        let config = ServerConfig {
            base_url: "http://farm:8000/api/".to_string(),
            ..ServerConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.url_for("getjobs"), "http://farm:8000/api/getjobs");
        assert_eq!(transport.url_for("/register"), "http://farm:8000/api/register");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = ServerConfig {
            base_url: "  ".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
