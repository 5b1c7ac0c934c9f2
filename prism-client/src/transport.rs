//! Fetch capability
//!
//! The engine consumes the backend through [`ApiTransport`]; the reqwest
//! implementation below is the production transport. Tests substitute
//! their own.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use shared::client::{ApiResponse, TransformOutcome};
use shared::models::{Image, Transformation, UploadResponse};
use shared::query::{ImageQuery, PaginatedResponse};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// An upload about to be sent
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Request/response transport to the backend
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn list_images(&self, query: &ImageQuery) -> ClientResult<PaginatedResponse<Image>>;

    async fn upload_image(&self, upload: UploadRequest) -> ClientResult<Image>;

    async fn delete_image(&self, image_id: &str) -> ClientResult<()>;

    async fn delete_transformed_image(&self, transformed_id: &str) -> ClientResult<()>;

    /// `liked = true` inserts the current user's like, `false` removes it
    async fn set_like(&self, image_id: &str, liked: bool) -> ClientResult<()>;

    async fn set_visibility(&self, image_id: &str, is_public: bool) -> ClientResult<()>;

    async fn record_download(&self, image_id: &str) -> ClientResult<()>;

    async fn request_transformation(
        &self,
        image_id: &str,
        transformation: &Transformation,
    ) -> ClientResult<TransformOutcome>;
}

/// HTTP transport for making network requests to the gallery server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        request
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Internal(text)),
            };
        }

        response.json().await.map_err(Into::into)
    }

    async fn expect_data<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> ClientResult<T> {
        Self::handle_response::<ApiResponse<T>>(response)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse(format!("Missing {what} data")))
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn list_images(&self, query: &ImageQuery) -> ClientResult<PaginatedResponse<Image>> {
        let response = self
            .request(reqwest::Method::GET, "/api/images")
            .query(query)
            .send()
            .await?;
        Self::expect_data(response, "image list").await
    }

    async fn upload_image(&self, upload: UploadRequest) -> ClientResult<Image> {
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| ClientError::Internal(format!("Failed to create multipart: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .request(reqwest::Method::POST, "/api/images")
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::expect_data(response, "upload").await?;
        Ok(uploaded.image)
    }

    async fn delete_image(&self, image_id: &str) -> ClientResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/images/{image_id}"))
            .send()
            .await?;
        Self::handle_response::<ApiResponse<()>>(response).await?;
        Ok(())
    }

    async fn delete_transformed_image(&self, transformed_id: &str) -> ClientResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/api/images/transformed/{transformed_id}"),
            )
            .send()
            .await?;
        Self::handle_response::<ApiResponse<()>>(response).await?;
        Ok(())
    }

    async fn set_like(&self, image_id: &str, liked: bool) -> ClientResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/api/images/{image_id}/like"))
            .json(&serde_json::json!({ "liked": liked }))
            .send()
            .await?;
        Self::handle_response::<ApiResponse<()>>(response).await?;
        Ok(())
    }

    async fn set_visibility(&self, image_id: &str, is_public: bool) -> ClientResult<()> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/api/images/{image_id}/visibility"),
            )
            .json(&serde_json::json!({ "is_public": is_public }))
            .send()
            .await?;
        Self::handle_response::<ApiResponse<()>>(response).await?;
        Ok(())
    }

    async fn record_download(&self, image_id: &str) -> ClientResult<()> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/api/images/{image_id}/download"),
            )
            .send()
            .await?;
        Self::handle_response::<ApiResponse<()>>(response).await?;
        Ok(())
    }

    async fn request_transformation(
        &self,
        image_id: &str,
        transformation: &Transformation,
    ) -> ClientResult<TransformOutcome> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/api/images/{image_id}/transform"),
            )
            .json(transformation)
            .send()
            .await?;
        Self::expect_data(response, "transform outcome").await
    }
}
