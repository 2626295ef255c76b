use std::sync::Arc;

use reqwest::{
    Client, RequestBuilder, Response, Url,
    cookie::{CookieStore, Jar},
    header::{COOKIE, SET_COOKIE},
};

use crate::{
    classify::Failure,
    config::{CONNECT_TIMEOUT, ClientConfig, Credentials},
    error::{ClientError, Result},
};

/// Per-request transport settings, passed explicitly at each call site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub credentials: Credentials,
}

impl RequestOptions {
    pub fn omit_credentials() -> Self {
        Self {
            credentials: Credentials::Omit,
        }
    }
}

/// HTTP client for the analysis service. Cheap to clone; clones share the cookie jar.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    jar: Arc<Jar>,
    defaults: RequestOptions,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::RequestSetup {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            jar: Arc::new(Jar::default()),
            defaults: RequestOptions {
                credentials: config.credentials,
            },
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Options used when a caller doesn't pass its own.
    pub fn default_request(&self) -> RequestOptions {
        self.defaults
    }

    /// Base URL plus percent-encoded path segments.
    pub(crate) fn endpoint<I>(&self, segments: I) -> std::result::Result<Url, Failure>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Failure::Setup(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url)
    }

    /// Sends one request. Non-2xx replies come back as [`Failure::Status`] with the
    /// raw body, whatever its content type.
    pub(crate) async fn send(
        &self,
        builder: RequestBuilder,
        options: RequestOptions,
    ) -> std::result::Result<Response, Failure> {
        let mut request = builder.build()?;
        let url = request.url().clone();

        if options.credentials == Credentials::Include {
            if let Some(cookies) = self.jar.cookies(&url) {
                request.headers_mut().insert(COOKIE, cookies);
            }
        }

        tracing::debug!(method = %request.method(), %url, "sending request");
        let response = self.http.execute(request).await?;

        if options.credentials == Credentials::Include {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            self.jar.set_cookies(&mut set_cookies, &url);
        }

        let status = response.status();
        tracing::debug!(%status, %url, "received response");

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(Failure::Status { status, body });
        }

        Ok(response)
    }
}
