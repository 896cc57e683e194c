use async_trait::async_trait;
use serde_json::Value;

use crate::health::{Probe, ProbeError};

enum Request {
    Get,
    PostJson(Value),
}

/// Bearer-authenticated reachability check against an external HTTP API.
///
/// Healthy iff the response status is 2xx; the aggregator bounds the call.
pub struct HttpApiProbe {
    name: String,
    client: reqwest::Client,
    url: String,
    request: Request,
    bearer: Option<String>,
}

impl HttpApiProbe {
    /// `GET url`.
    pub fn get(name: impl Into<String>, url: impl Into<String>, bearer: Option<String>) -> Self {
        Self::build(name.into(), url.into(), Request::Get, bearer)
    }

    /// `POST url` with a JSON body.
    pub fn post_json(
        name: impl Into<String>,
        url: impl Into<String>,
        body: Value,
        bearer: Option<String>,
    ) -> Self {
        Self::build(name.into(), url.into(), Request::PostJson(body), bearer)
    }

    fn build(name: String, url: String, request: Request, bearer: Option<String>) -> Self {
        Self {
            name,
            client: reqwest::Client::new(),
            url,
            request,
            bearer,
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpApiProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let mut req = match &self.request {
            Request::Get => self.client.get(&self.url),
            Request::PostJson(body) => self.client.post(&self.url).json(body),
        };
        if let Some(ref token) = self.bearer {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .await
            .map_err(|error| ProbeError::Unreachable(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::HttpStatus(status.as_u16()))
        }
    }
}
