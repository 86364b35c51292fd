use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Certificate, Url};
use searchlink_core::{Config, Context, HttpResponse, Request, Response, ResponseBody, Transport, TransportError};

use crate::{ClientError, Result};

/// Transport over `reqwest`
///
/// Relative request paths are resolved against the first configured address,
/// keeping its path prefix; absolute URLs are used as they are. Credentials
/// are only sent to the configured address's origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let address = config
            .addresses
            .first()
            .ok_or_else(|| ClientError::Config("no addresses configured".to_string()))?;
        let base_url = Url::parse(address)
            .map_err(|e| ClientError::Config(format!("invalid address {address}: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout());

        if config.insecure_skip_verify {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if !config.ca_cert_path.is_empty() {
            let pem = std::fs::read(&config.ca_cert_path).map_err(|e| {
                ClientError::Config(format!("failed to read CA certificate {}: {e}", config.ca_cert_path))
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                ClientError::Config(format!("invalid CA certificate {}: {e}", config.ca_cert_path))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(base_url = %base_url, "HTTP transport ready");

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, uri: &http::Uri) -> std::result::Result<Url, TransportError> {
        if uri.scheme().is_some() {
            return Url::parse(&uri.to_string()).map_err(|e| TransportError::InvalidUrl(e.to_string()));
        }

        let mut url = self.base_url.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), uri.path());
        url.set_path(&path);
        url.set_query(uri.query());
        Ok(url)
    }

    fn credentials_for(&self, url: &Url) -> Option<(&str, Option<&str>)> {
        let username = self.username.as_deref()?;
        if url.origin() != self.base_url.origin() {
            tracing::debug!(url = %url, "not sending credentials to a foreign origin");
            return None;
        }
        Some((username, self.password.as_deref()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    async fn perform(&self, ctx: &Context, request: Request) -> std::result::Result<Box<dyn Response>, TransportError> {
        let url = self.resolve(request.uri())?;
        let credentials = self.credentials_for(&url);
        let (parts, body) = request.into_parts();

        let mut builder = self.client.request(parts.method, url).headers(parts.headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some((username, password)) = credentials {
            builder = builder.basic_auth(username, password);
        }

        let response = ctx
            .run(builder.send())
            .await?
            .map_err(|e| TransportError::Connection(Box::new(e)))?;

        tracing::debug!(status = %response.status(), "received response");
        Ok(Box::new(into_response(ctx, response)))
    }
}

/// The body keeps honouring `ctx` after the headers have arrived
fn into_response(ctx: &Context, response: reqwest::Response) -> HttpResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes_stream().map(|chunk| chunk.map_err(std::io::Error::other));

    HttpResponse::new(status)
        .with_headers(headers)
        .with_body(ResponseBody::from_stream(ctx.bind_stream(body)))
}
