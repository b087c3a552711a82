use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::backend::{Backend, Credential};
use super::error::ApiError;
use super::types::{
    SampleProfileResponse, StartApplicationRequest, StartApplicationResponse, StatusResponse,
};
use crate::profile::PersonalInfo;
use crate::resume::ResumeData;
use crate::session::{ApplicationId, StatusSnapshot};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// HTTP implementation of [`Backend`] against the auto-filler REST API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(builder: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
        match credential {
            Some(cred) => builder.bearer_auth(cred.token()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let body = Self::success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn success_body(response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn start_application(
        &self,
        request: &StartApplicationRequest<'_>,
        credential: Option<&Credential>,
    ) -> Result<ApplicationId, ApiError> {
        debug!(url = request.url, "starting application");
        let builder = self
            .client
            .post(self.url("/api/start-application"))
            .json(request);
        let resp: StartApplicationResponse = Self::send(Self::authorized(builder, credential)).await?;
        Ok(resp.into())
    }

    async fn application_status(
        &self,
        id: &ApplicationId,
        credential: Option<&Credential>,
    ) -> Result<StatusSnapshot, ApiError> {
        let builder = self
            .client
            .get(self.url(&format!("/api/application-status/{id}")));
        let resp: StatusResponse = Self::send(Self::authorized(builder, credential)).await?;
        Ok(resp.into())
    }

    async fn parse_resume(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        credential: Option<&Credential>,
    ) -> Result<ResumeData, ApiError> {
        debug!(file_name, size = bytes.len(), "uploading resume");
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let builder = self
            .client
            .post(self.url("/api/parse-resume"))
            .multipart(form);
        Self::send(Self::authorized(builder, credential)).await
    }

    async fn load_profile(&self, credential: &Credential) -> Result<Option<PersonalInfo>, ApiError> {
        let builder = self
            .client
            .get(self.url("/api/me/personal-info"))
            .bearer_auth(credential.token());
        let value: serde_json::Value = Self::send(builder).await?;
        let empty = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn save_profile(
        &self,
        profile: &PersonalInfo,
        credential: &Credential,
    ) -> Result<(), ApiError> {
        let builder = self
            .client
            .post(self.url("/api/me/personal-info"))
            .bearer_auth(credential.token())
            .json(profile);
        let response = builder.send().await?;
        Self::success_body(response).await?;
        Ok(())
    }

    async fn sample_profile(&self) -> Result<PersonalInfo, ApiError> {
        let builder = self.client.get(self.url("/api/sample-personal-info"));
        let resp: SampleProfileResponse = Self::send(builder).await?;
        Ok(resp.personal_info)
    }
}
