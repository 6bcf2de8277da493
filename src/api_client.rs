use std::sync::Arc;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::token_store::TokenStore;

/// JSON client for the REST API.
///
/// Sends the bearer token from the shared [`TokenStore`] when one is live and
/// omits `Authorization` otherwise. Non-2xx responses become
/// [`Error::RequestFailed`]; nothing is retried or refreshed here.
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: Url, tokens: Arc<TokenStore>) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
            tokens,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a request to `path` (appended verbatim to the base URL).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the joined URL does not parse.
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, Error> {
        let url: Url = format!("{}{path}", self.base_url.as_str().trim_end_matches('/')).parse()?;

        let builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");

        Ok(match self.tokens.read() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// # Errors
    ///
    /// [`Error::RequestFailed`] on non-2xx, [`Error::Http`] on transport or
    /// body decoding failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = Self::send(self.request(Method::GET, path)?).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus [`Error::Json`] if `body` fails to serialize.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// # Errors
    ///
    /// Same as [`post`](Self::post).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    /// # Errors
    ///
    /// [`Error::RequestFailed`] on non-2xx, [`Error::Http`] on transport failure.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        Self::send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        let response = Self::send(self.request(method, path)?.body(body)).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %response.url(), "API request failed");
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
