//! HTTP transport for the NetEase web API.
//!
//! The [`Transport`] trait is the seam between the orchestrator/providers and
//! the network: production code uses [`HttpTransport`] (reqwest), tests
//! script replies against the same trait. POSTs carry the weapi crypto
//! envelope; GETs hit the unencrypted `/api/` endpoints with sorted query
//! parameters.

use std::future::Future;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::{
    config,
    netease::{CSRF_COOKIE, EXTRA_COOKIES, RawReply, TransportResult, crypto},
    utils,
};

pub trait Transport: Send + Sync + 'static {
    /// POST to a `/weapi/` endpoint, body wrapped in the crypto envelope.
    fn post_api(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = TransportResult> + Send;

    /// Plain GET against an `/api/` endpoint.
    fn get_api(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = TransportResult> + Send;

    /// Fetch raw bytes from an absolute URL (album covers).
    fn get_bytes(&self, url: &str) -> impl Future<Output = TransportResult> + Send;
}

/// Production transport bound to one session's cookie set.
///
/// The cookie set is read-only here; only the authenticator writes it.
pub struct HttpTransport {
    client: Client,
    cookies: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(cookies: Vec<(String, String)>) -> Self {
        Self {
            client: Client::new(),
            cookies,
        }
    }

    fn cookie_header(&self) -> String {
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        pairs.extend(EXTRA_COOKIES.iter().map(|extra| extra.to_string()));
        pairs.join("; ")
    }

    fn csrf_token(&self) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(name, _)| name == CSRF_COOKIE)
            .map(|(_, value)| value.as_str())
    }

    async fn read_reply(response: Result<reqwest::Response, reqwest::Error>) -> TransportResult {
        let response = response.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let mimetype = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = response.bytes().await.map_err(|e| e.to_string())?.to_vec();
        Ok(RawReply {
            status,
            mimetype,
            body,
        })
    }
}

impl Transport for HttpTransport {
    async fn post_api(&self, path: &str, params: &[(String, String)]) -> TransportResult {
        let mut url = format!("{}{}", config::netease_webapiurl(), path);
        if let Some(token) = self.csrf_token() {
            url.push_str(&format!("?csrf={}", urlencoding::encode(token)));
        }

        let mut payload = Map::new();
        for (name, value) in params {
            payload.insert(name.clone(), Value::String(value.clone()));
        }
        let envelope = crypto::weapi(&Value::Object(payload))?;

        let body = format!(
            "params={}&encSecKey={}",
            urlencoding::encode(&envelope.params),
            urlencoding::encode(&envelope.enc_sec_key)
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Referer", "https://music.163.com")
            .header("User-Agent", utils::random_user_agent())
            .header("Cookie", self.cookie_header())
            .body(body)
            .send()
            .await;

        Self::read_reply(response).await
    }

    async fn get_api(&self, path: &str, query: &[(String, String)]) -> TransportResult {
        let url = format!("{}{}", config::netease_apiurl(), path);

        let mut sorted = query.to_vec();
        sorted.sort();

        let response = self
            .client
            .get(&url)
            .query(&sorted)
            .header("Accept", "*/*")
            .header("User-Agent", utils::random_user_agent())
            .header("Cookie", self.cookie_header())
            .send()
            .await;

        Self::read_reply(response).await
    }

    async fn get_bytes(&self, url: &str) -> TransportResult {
        let response = self
            .client
            .get(url)
            .header("User-Agent", utils::random_user_agent())
            .send()
            .await;

        Self::read_reply(response).await
    }
}
