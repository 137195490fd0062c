//! Executes built requests over the network.
//!
//! One attempt per request: no retries and no timeout beyond what the
//! supplied transport client is configured with.

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Send `request` with reqwest and collect the full response as text.
///
/// Non-2xx statuses are returned as data; only transport failures are errors.
pub async fn execute(http: &reqwest::Client, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let method = match request.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };
    debug!(method = %request.method, url = %request.url, "sending miniflux request");

    let mut builder = http.request(method, request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let response = builder.body(request.body.unwrap_or_default()).send().await?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.text().await?;
    debug!(status, bytes = body.len(), "received miniflux response");

    Ok(HttpResponse { status, headers, body })
}

/// Blocking counterpart of [`execute`] built on ureq.
#[cfg(feature = "blocking")]
pub mod blocking {
    use tracing::debug;

    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// An agent that reports 4xx/5xx as responses instead of errors, so the
    /// status can be interpreted by `MinifluxClient::parse_*`.
    pub fn agent() -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent()
    }

    pub fn execute(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending miniflux request");
        let body = request.body.unwrap_or_default();
        let url = request.url.as_str();

        let mut response = match request.method {
            HttpMethod::Get => {
                let mut req = agent.get(url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.call()?
            }
            HttpMethod::Delete => {
                let mut req = agent.delete(url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.call()?
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut req = if request.method == HttpMethod::Post {
                    agent.post(url)
                } else {
                    agent.put(url)
                };
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.send(body.as_bytes())?
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;
        debug!(status, bytes = body.len(), "received miniflux response");

        Ok(HttpResponse { status, headers, body })
    }
}
