pub mod config;
mod error;
pub mod model;
mod usage_limit;

pub use config::{Config, Settings};
pub use error::Error;
pub use usage_limit::UsageLimit;

use model::{Conversation, ErrorResponse, Message, Page, Post, Profile};

use futures::{
    stream::{iter, try_unfold, LocalBoxStream},
    StreamExt, TryStreamExt,
};
use reqwest::Client as RClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tryhard::RetryPolicy;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

const PROFILE_FIELDS: &str = "id,name";
const FEED_FIELDS: &str = "id,created_time,updated_time,from,to,message,story,type,status_type,link,name,caption,description,picture,place,privacy";
const CONVERSATION_FIELDS: &str = "id,updated_time,message_count,participants,snippet";
const MESSAGE_FIELDS: &str = "id,created_time,from,to,message,attachments";

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// A Graph API client bound to a single access token.
pub struct Client {
    underlying: RClient,
    settings: Settings,
    token: String,
    usage: UsageLimit,
}

impl Client {
    pub fn new(token: &str, settings: Settings) -> Result<Client> {
        let underlying = RClient::builder()
            .tcp_keepalive(Some(Duration::from_secs(20)))
            .build()?;
        let usage = UsageLimit::new(settings.rate_limit_delay);

        Ok(Client {
            underlying,
            settings,
            token: token.to_string(),
            usage,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up the account the token belongs to.
    ///
    /// This doubles as token verification: an invalid or expired token fails
    /// here before any export work starts.
    pub async fn me(&self) -> Result<Profile> {
        let url = self.endpoint("me", PROFILE_FIELDS, None)?;

        self.get_with_retries(url).await
    }

    pub fn feed(&self) -> LocalBoxStream<Result<Post>> {
        self.collection("me/feed", FEED_FIELDS)
    }

    pub fn conversations(&self) -> LocalBoxStream<Result<Conversation>> {
        self.collection("me/conversations", CONVERSATION_FIELDS)
    }

    pub fn messages(&self, conversation_id: &str) -> LocalBoxStream<Result<Message>> {
        self.collection(&format!("{}/messages", conversation_id), MESSAGE_FIELDS)
    }

    fn endpoint(&self, path: &str, fields: &str, limit: Option<u32>) -> Result<Url> {
        let base = format!(
            "{}/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.api_version,
            path
        );
        let mut params = vec![("fields", fields.to_string())];

        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        params.push((ACCESS_TOKEN_PARAM, self.token.clone()));

        Ok(Url::parse_with_params(&base, &params)?)
    }

    /// Stream every item of a paginated collection, following `paging.next`.
    fn collection<T: DeserializeOwned + 'static>(
        &self,
        path: &str,
        fields: &str,
    ) -> LocalBoxStream<Result<T>> {
        let first = self.endpoint(path, fields, Some(self.settings.page_size));
        let label = path.to_string();

        try_unfold(Some(first), move |next| self.load_page(next, label.clone()))
            .map_ok(|items| iter(items).map(Ok))
            .try_flatten()
            .boxed_local()
    }

    async fn load_page<T: DeserializeOwned>(
        &self,
        next: Option<Result<Url>>,
        label: String,
    ) -> Result<Option<(Vec<T>, Option<Result<Url>>)>> {
        let url = match next {
            Some(url) => url?,
            None => return Ok(None),
        };

        let page = self.get_with_retries::<Page<T>>(url).await?;
        log::info!("Retrieved {} items from {}", page.data.len(), label);

        let next = page
            .next_url()
            .map(|next| Url::parse(next).map_err(Error::from));

        Ok(Some((page.data, next)))
    }

    async fn get_with_retries<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let retry_delay = self.settings.retry_delay;
        let rate_limit_delay = self.settings.rate_limit_delay;

        tryhard::retry_fn(|| self.get(url.clone()))
            .retries(self.settings.retries)
            .custom_backoff(move |attempt: u32, error: &Error| {
                if error.is_rate_limited() {
                    log::warn!("Rate limited ({}), waiting {:?}", error, rate_limit_delay);
                    RetryPolicy::Delay(rate_limit_delay)
                } else if error.is_transient() {
                    let delay = retry_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
                    log::warn!("Request failed ({}), retrying in {:?}", error, delay);
                    RetryPolicy::Delay(delay)
                } else {
                    RetryPolicy::Break
                }
            })
            .await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        if let Some(delay) = self.usage.delay() {
            log::info!(
                "App usage at {}%, waiting {:?}",
                self.usage.percentage(),
                delay
            );
            sleep(delay).await;
            self.usage.reset();
        }

        log::debug!("GET {}", redact(&url));

        let response = self.underlying.get(url).send().await?;
        self.usage.update_from_headers(response.headers());

        let status = response.status();
        let bytes = response.bytes().await?;

        // Graph errors may arrive with any status code.
        if let Ok(response) = serde_json::from_slice::<ErrorResponse>(&bytes) {
            return Err(Error::Graph(response.error));
        }

        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Hide the access token when a URL is logged.
fn redact(url: &Url) -> Url {
    let pairs = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == ACCESS_TOKEN_PARAM {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };

            (key.into_owned(), value)
        })
        .collect::<Vec<_>>();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            base_url: server.base_url(),
            api_version: "v2.3".to_string(),
            page_size: 2,
            retries: 2,
            retry_delay: Duration::from_millis(1),
            rate_limit_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn redact_access_token() {
        let url =
            Url::parse("https://graph.facebook.com/v2.3/me?fields=id&access_token=SECRET").unwrap();

        assert_eq!(
            redact(&url).as_str(),
            "https://graph.facebook.com/v2.3/me?fields=id&access_token=REDACTED"
        );
    }

    #[tokio::test]
    async fn me_sends_token() {
        let server = MockServer::start_async().await;
        let me_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2.3/me")
                .query_param("access_token", "TOKEN123")
                .query_param("fields", "id,name");
            then.status(200)
                .json_body(json!({ "id": "100", "name": "Jo Example" }));
        });

        let client = Client::new("TOKEN123", settings_for(&server)).unwrap();
        let me = client.me().await.unwrap();

        assert_eq!(me.id, "100");
        assert_eq!(me.name.as_deref(), Some("Jo Example"));
        me_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn feed_follows_next_links() {
        let server = MockServer::start_async().await;
        let next = server.url("/v2.3/me/feed?access_token=TOKEN123&after=c1");

        let first_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2.3/me/feed")
                .query_param("access_token", "TOKEN123")
                .query_param("limit", "2");
            then.status(200).json_body(json!({
                "data": [
                    { "id": "1_1", "created_time": "2014-03-02T12:00:00+0000" },
                    { "id": "1_2", "created_time": "2014-03-01T12:00:00+0000" }
                ],
                "paging": { "cursors": { "after": "c1" }, "next": next }
            }));
        });
        let second_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2.3/me/feed")
                .query_param("after", "c1");
            then.status(200).json_body(json!({
                "data": [
                    { "id": "1_3", "created_time": "2014-02-28T12:00:00+0000" }
                ],
                "paging": { "cursors": { "before": "c1" } }
            }));
        });

        let client = Client::new("TOKEN123", settings_for(&server)).unwrap();
        let posts = client.feed().try_collect::<Vec<_>>().await.unwrap();
        let ids = posts.iter().map(|post| post.id.as_str()).collect::<Vec<_>>();

        assert_eq!(ids, vec!["1_1", "1_2", "1_3"]);
        first_mock.assert_calls(1);
        second_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn invalid_token_is_not_retried() {
        let server = MockServer::start_async().await;
        let me_mock = server.mock(|when, then| {
            when.method(GET).path("/v2.3/me");
            then.status(400).json_body(json!({
                "error": {
                    "message": "Invalid OAuth access token.",
                    "type": "OAuthException",
                    "code": 190,
                    "fbtrace_id": "AbC"
                }
            }));
        });

        let client = Client::new("BAD", settings_for(&server)).unwrap();
        let result = client.me().await;

        match result {
            Err(Error::Graph(error)) => assert_eq!(error.code, 190),
            other => panic!("Unexpected result: {:?}", other),
        }
        me_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn rate_limited_requests_are_retried() {
        let server = MockServer::start_async().await;
        let me_mock = server.mock(|when, then| {
            when.method(GET).path("/v2.3/me");
            then.status(400).json_body(json!({
                "error": {
                    "message": "Application request limit reached",
                    "type": "OAuthException",
                    "code": 4
                }
            }));
        });

        let client = Client::new("TOKEN123", settings_for(&server)).unwrap();
        let result = client.me().await;

        assert!(matches!(result, Err(ref error) if error.is_rate_limited()));
        me_mock.assert_calls(3);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start_async().await;
        let me_mock = server.mock(|when, then| {
            when.method(GET).path("/v2.3/me");
            then.status(502).body("Bad Gateway");
        });

        let client = Client::new("TOKEN123", settings_for(&server)).unwrap();
        let result = client.me().await;

        assert!(matches!(result, Err(Error::UnexpectedStatus(502))));
        me_mock.assert_calls(3);
    }

    #[tokio::test]
    async fn usage_header_is_tracked() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v2.3/me");
            then.status(200)
                .header(
                    "X-App-Usage",
                    r#"{"call_count":97,"total_time":5,"total_cputime":5}"#,
                )
                .json_body(json!({ "id": "100" }));
        });

        let client = Client::new("TOKEN123", settings_for(&server)).unwrap();
        client.me().await.unwrap();

        assert_eq!(client.usage.percentage(), 97);
        assert_eq!(client.usage.delay(), Some(Duration::from_millis(1)));
    }
}
