//! HTTP client for the backend-of-record

use super::{BackendError, BackendOfRecord, BackendResult};
use crate::core::EditorConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::ApiResponse;
use shared::ticket::{BatchModifyRequest, BatchModifyResponse, SessionStatus, SourceOrderRecord};
use std::time::Duration;

/// HTTP client for making requests to the backend-of-record
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Create from editor configuration
    pub fn from_config(config: &EditorConfig) -> BackendResult<Self> {
        let backend = Self::new(config.backend_url.clone(), config.request_timeout())?;
        Ok(match &config.backend_token {
            Some(token) => backend.with_token(token.clone()),
            None => backend,
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let mut request = self.client.get(self.url(path));

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> BackendResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response and unwrap the `ApiResponse` envelope
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> BackendResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
                StatusCode::NOT_FOUND => Err(BackendError::NotFound(text)),
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(BackendError::Validation(text))
                }
                _ => Err(BackendError::Internal(text)),
            };
        }

        let body = response.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        if !envelope.is_success() {
            return Err(BackendError::Validation(format!(
                "{}: {}",
                envelope.code, envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| BackendError::InvalidResponse("Missing response data".to_string()))
    }
}

#[async_trait]
impl BackendOfRecord for HttpBackend {
    async fn session_status(&self, table_id: &str) -> BackendResult<SessionStatus> {
        self.get(&format!("api/tables/{}/session-status", table_id))
            .await
    }

    async fn batch_modify(
        &self,
        table_id: &str,
        request: &BatchModifyRequest,
    ) -> BackendResult<BatchModifyResponse> {
        tracing::debug!(
            table_id = %table_id,
            additions = request.additions.len(),
            removals = request.removals.len(),
            "Submitting batch-modify"
        );
        self.post(&format!("api/tables/{}/batch-modify", table_id), request)
            .await
    }

    async fn active_orders(&self, table_id: &str) -> BackendResult<Vec<SourceOrderRecord>> {
        self.get(&format!("api/tables/{}/active-orders", table_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Utc;
    use shared::ticket::{OrderLine, OrderSource, SourceItem};
    use std::collections::BTreeMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(url, Duration::from_secs(5))
            .unwrap()
            .with_token("test-token")
    }

    #[tokio::test]
    async fn test_active_orders_unwraps_envelope() {
        let app = Router::new().route(
            "/api/tables/{id}/active-orders",
            get(|Path(id): Path<String>| async move {
                let mut items = BTreeMap::new();
                items.insert(
                    "Rice".to_string(),
                    SourceItem {
                        menu_id: Some("m-rice".into()),
                        quantity: 2,
                        unit_price: 2000,
                    },
                );
                Json(ApiResponse::ok(vec![SourceOrderRecord {
                    order_id: format!("order-{}", id),
                    source: OrderSource::Terminal,
                    items,
                    created_at: Utc::now(),
                }]))
            }),
        );
        let url = serve(app).await;

        let orders = backend(&url).active_orders("7").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, "order-7");
        assert_eq!(orders[0].items["Rice"].quantity, 2);
    }

    #[tokio::test]
    async fn test_batch_modify_posts_diff() {
        let app = Router::new().route(
            "/api/tables/{id}/batch-modify",
            post(|Json(req): Json<BatchModifyRequest>| async move {
                let lines = req
                    .additions
                    .iter()
                    .map(|(name, qty)| OrderLine::new(name.clone(), name.clone(), 100, *qty))
                    .collect();
                Json(ApiResponse::ok(BatchModifyResponse {
                    success: true,
                    updated_lines: lines,
                    message: None,
                }))
            }),
        );
        let url = serve(app).await;

        let mut request = BatchModifyRequest::default();
        request.additions.insert("Fried Chicken".into(), 1);
        let resp = backend(&url).batch_modify("7", &request).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.updated_lines.len(), 1);
        assert_eq!(resp.updated_lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_status_codes_are_mapped() {
        let app = Router::new()
            .route(
                "/api/tables/{id}/session-status",
                get(|| async { (AxumStatus::UNAUTHORIZED, "no token") }),
            )
            .route(
                "/api/tables/{id}/batch-modify",
                post(|| async { (AxumStatus::BAD_REQUEST, "quantity below served count") }),
            );
        let url = serve(app).await;
        let client = backend(&url);

        let err = client.session_status("7").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized));

        let err = client
            .batch_modify("7", &BatchModifyRequest::default())
            .await
            .unwrap_err();
        match err {
            BackendError::Validation(msg) => assert!(msg.contains("served")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_envelope_is_validation_error() {
        let app = Router::new().route(
            "/api/tables/{id}/session-status",
            get(|| async {
                Json(ApiResponse::<SessionStatus>::from_code(
                    shared::ErrorCode::ConflictUnresolved,
                ))
            }),
        );
        let url = serve(app).await;

        let err = backend(&url).session_status("99").await.unwrap_err();
        assert!(matches!(err, BackendError::Validation(ref m) if m.contains("E7301")));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{}", addr))
            .active_orders("1")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
        assert_eq!(err.code(), shared::ErrorCode::NetworkError);
    }
}
