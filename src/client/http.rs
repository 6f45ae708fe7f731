//! Built-in HTTP connector.
//!
//! # Responsibilities
//! - Build a `reqwest` client bounded by the service's connect/read timeouts
//! - Validate it with one GET against `endpoint + health_path`
//! - Classify failures: connection errors, timeouts, 429 and 5xx are
//!   transient; other 4xx responses and bad URLs are permanent

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

use crate::client::connector::{ConnectContext, ServiceConnector};
use crate::client::handle::ClientHandle;
use crate::error::{ClientError, ClientResult};
use crate::resilience::Timeouts;

/// Connected HTTP client for one service.
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    service: String,
    region: String,
    base_url: Url,
    timeouts: Timeouts,
    params: BTreeMap<String, String>,
    client: reqwest::Client,
}

impl HttpServiceClient {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Constructor parameter from the descriptor.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url.join(path).map_err(|e| {
            ClientError::InvalidArgument(format!("{}: bad path '{path}': {e}", self.service))
        })
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .map_err(|e| classify_transport(&self.service, self.timeouts, e))?;
        decode(&self.service, response).await
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(&self.service, self.timeouts, e))?;
        decode(&self.service, response).await
    }
}

async fn decode<T: DeserializeOwned>(service: &str, response: reqwest::Response) -> ClientResult<T> {
    check_status(service, response.status())?;
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Permanent(format!("{service}: undecodable response: {e}")))
}

/// Map a response status onto the error taxonomy.
pub fn check_status(service: &str, status: StatusCode) -> ClientResult<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(ClientError::Transient(format!("{service}: HTTP {status}")))
    } else {
        Err(ClientError::Permanent(format!("{service}: HTTP {status}")))
    }
}

fn classify_transport(service: &str, timeouts: Timeouts, err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            service: service.to_string(),
            after: timeouts.total(),
        }
    } else if err.is_builder() {
        ClientError::Permanent(format!("{service}: {err}"))
    } else {
        ClientError::Transient(format!("{service}: {err}"))
    }
}

/// Connector for services declared with `kind = "http"`.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn build(ctx: ConnectContext) -> ClientResult<ClientHandle> {
        let service = ctx.descriptor.name.clone();
        let endpoint = ctx.descriptor.endpoint.as_deref().ok_or_else(|| {
            ClientError::Permanent(format!("{service}: no endpoint configured"))
        })?;
        let base_url = Url::parse(endpoint)
            .map_err(|e| ClientError::Permanent(format!("{service}: invalid endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .connect_timeout(ctx.timeouts.connect)
            .timeout(ctx.timeouts.read)
            .user_agent(concat!("resilient-clients/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Permanent(format!("{service}: {e}")))?;

        let probe = base_url
            .join(&ctx.descriptor.health_path)
            .map_err(|e| ClientError::Permanent(format!("{service}: invalid health path: {e}")))?;

        let response = client
            .get(probe)
            .send()
            .await
            .map_err(|e| classify_transport(&service, ctx.timeouts, e))?;
        check_status(&service, response.status())?;

        tracing::debug!(service = %service, url = %base_url, "HTTP client validated");

        Ok(ClientHandle::new(
            &service,
            HttpServiceClient {
                service: service.clone(),
                region: ctx.region,
                base_url,
                timeouts: ctx.timeouts,
                params: ctx.descriptor.params.clone(),
                client,
            },
        ))
    }
}

impl ServiceConnector for HttpConnector {
    fn connect(&self, ctx: ConnectContext) -> BoxFuture<'static, ClientResult<ClientHandle>> {
        Self::build(ctx).boxed()
    }
}
