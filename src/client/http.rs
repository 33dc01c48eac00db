use super::transport::EntityTransport;
use crate::assign::{ChairDeviceAssignment, SeatAssignment};
use crate::config::DeskConfig;
use crate::core::{DeskError, Entity, EntityId, Result};
use crate::patch::{PATCH_CONTENT_TYPE, PatchOperation};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{Level, event};

pub const SEAT_ASSIGNMENTS_PATH: &str = "/bulk/seat-assignments";
pub const SEAT_PLAN_PATH: &str = "/bulk/seat-plan";

/// Transport speaking to the console REST API over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &DeskConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| DeskError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn entity_url(&self, kind: &str, id: &EntityId) -> String {
        self.url(&format!("/api/{}/{}", kind, id))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| DeskError::Transport(err.to_string()))?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| DeskError::Serialization(err.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    event!(Level::WARN, status = status.as_u16(), "request rejected by server");
    Err(error_from_response(
        status.as_u16(),
        status.canonical_reason(),
        &body,
    ))
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Message a server error surfaces to the user.
///
/// A JSON `{"error": ...}` body yields its message, any other non-empty
/// body is used verbatim, and an empty body falls back to the status.
pub fn error_message(status: u16, reason: Option<&str>, body: &str) -> String {
    if body.trim().is_empty() {
        return match reason {
            Some(reason) => format!("{} {}", status, reason),
            None => format!("Request failed with status {}", status),
        };
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.to_string(),
    }
}

pub fn error_from_response(status: u16, reason: Option<&str>, body: &str) -> DeskError {
    let message = error_message(status, reason, body);
    match status {
        400 | 422 => DeskError::Validation(message),
        401 => DeskError::Unauthorized(message),
        403 => DeskError::Forbidden(message),
        404 => DeskError::NotFound(message),
        415 => DeskError::UnsupportedMediaType(message),
        _ => DeskError::Remote { status, message },
    }
}

#[async_trait]
impl EntityTransport for HttpTransport {
    async fn fetch(&self, kind: &str, id: &EntityId) -> Result<Entity> {
        self.send(self.client.get(self.entity_url(kind, id))).await
    }

    async fn list(&self, kind: &str) -> Result<Vec<Entity>> {
        self.send(self.client.get(self.url(&format!("/api/{}", kind))))
            .await
    }

    async fn patch(&self, kind: &str, id: &EntityId, ops: &[PatchOperation]) -> Result<Entity> {
        let body = serde_json::to_vec(ops)?;
        event!(Level::DEBUG, kind, id = %id, operations = ops.len(), "sending patch");
        self.send(
            self.client
                .patch(self.entity_url(kind, id))
                .header(CONTENT_TYPE, PATCH_CONTENT_TYPE)
                .body(body),
        )
        .await
    }

    async fn assign_seats(&self, records: &[SeatAssignment]) -> Result<Vec<Entity>> {
        self.send(self.client.post(self.url(SEAT_ASSIGNMENTS_PATH)).json(records))
            .await
    }

    async fn assign_chair_devices(&self, records: &[ChairDeviceAssignment]) -> Result<Vec<Entity>> {
        self.send(self.client.post(self.url(SEAT_PLAN_PATH)).json(records))
            .await
    }
}
