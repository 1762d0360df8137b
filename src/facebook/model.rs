//! Graph API response types.
//!
//! Entities keep every field the API returns: the ones the exporter needs are
//! typed, and the rest are collected into `extra` so that written files are
//! lossless.

use chrono::{DateTime, FixedOffset};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

pub type Fields = Map<String, Value>;

/// One page of a Graph API collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub paging: Option<Paging>,
}

impl<T> Page<T> {
    /// The URL of the following page, if the API reports one and this page wasn't empty.
    pub fn next_url(&self) -> Option<&str> {
        if self.data.is_empty() {
            None
        } else {
            self.paging.as_ref().and_then(|paging| paging.next.as_deref())
        }
    }
}

#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct Paging {
    pub cursors: Option<Cursors>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct Cursors {
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    #[serde(with = "graph_time")]
    pub created_time: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Conversation {
    pub id: String,
    #[serde(with = "graph_time")]
    pub updated_time: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    #[serde(with = "graph_time")]
    pub created_time: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: GraphError,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct GraphError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: i64,
    pub error_subcode: Option<i64>,
    pub is_transient: Option<bool>,
    pub fbtrace_id: Option<String>,
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} (code {}", self.message, self.code)?;
        if let Some(subcode) = self.error_subcode {
            write!(f, ", subcode {}", subcode)?;
        }
        if let Some(error_type) = &self.error_type {
            write!(f, ", {}", error_type)?;
        }
        write!(f, ")")
    }
}

/// The `X-App-Usage` header: percentages of the app's rate budget.
#[derive(Debug, Default, Deserialize, Eq, PartialEq)]
pub struct AppUsage {
    #[serde(default)]
    pub call_count: u32,
    #[serde(default)]
    pub total_time: u32,
    #[serde(default)]
    pub total_cputime: u32,
}

impl AppUsage {
    pub fn max_percentage(&self) -> u32 {
        self.call_count.max(self.total_time).max(self.total_cputime)
    }
}

/// Graph timestamps look like `2014-03-01T12:00:00+0000`.
pub mod graph_time {
    use chrono::{DateTime, FixedOffset};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn parse(input: &str) -> chrono::ParseResult<DateTime<FixedOffset>> {
        DateTime::parse_from_str(input, FORMAT)
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let input = String::deserialize(deserializer)?;
        parse(&input).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_feed_page() {
        let input = json!({
            "data": [
                {
                    "id": "100_200",
                    "created_time": "2014-03-01T12:00:00+0000",
                    "message": "Hello",
                    "from": { "id": "100", "name": "Jo" }
                }
            ],
            "paging": {
                "previous": "https://graph.facebook.com/v19.0/me/feed?since=1",
                "next": "https://graph.facebook.com/v19.0/me/feed?until=2"
            }
        });

        let page = serde_json::from_value::<Page<Post>>(input).unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "100_200");
        assert_eq!(page.data[0].created_time.timestamp(), 1393675200);
        assert_eq!(page.data[0].extra["message"], json!("Hello"));
        assert_eq!(
            page.next_url(),
            Some("https://graph.facebook.com/v19.0/me/feed?until=2")
        );
    }

    #[test]
    fn empty_page_has_no_next_url() {
        let input = json!({
            "data": [],
            "paging": { "next": "https://graph.facebook.com/v19.0/me/feed?until=2" }
        });

        let page = serde_json::from_value::<Page<Post>>(input).unwrap();

        assert_eq!(page.next_url(), None);
    }

    #[test]
    fn post_keeps_unknown_fields() {
        let input = json!({
            "id": "1",
            "created_time": "2014-03-01T12:00:00+0000",
            "story": "Jo shared a link.",
            "likes": { "data": [] }
        });

        let post = serde_json::from_value::<Post>(input.clone()).unwrap();

        assert_eq!(serde_json::to_value(&post).unwrap(), input);
    }

    #[test]
    fn decode_graph_error() {
        let input = json!({
            "error": {
                "message": "Error validating access token",
                "type": "OAuthException",
                "code": 190,
                "error_subcode": 463,
                "fbtrace_id": "AbC"
            }
        });

        let error = serde_json::from_value::<ErrorResponse>(input).unwrap().error;

        assert_eq!(error.code, 190);
        assert_eq!(
            error.to_string(),
            "Error validating access token (code 190, subcode 463, OAuthException)"
        );
    }

    #[test]
    fn app_usage_max_percentage() {
        let usage = serde_json::from_str::<AppUsage>(
            r#"{"call_count":28,"total_time":96,"total_cputime":25}"#,
        )
        .unwrap();

        assert_eq!(usage.max_percentage(), 96);
    }
}
