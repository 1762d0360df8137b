use super::model::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Graph API error: {0}")]
    Graph(GraphError),
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("response decoding error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    // Application, user, page and custom rate limit codes.
    const RATE_LIMIT_CODES: [i64; 4] = [4, 17, 32, 613];

    /// Whether the Graph API asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::Graph(error) => Self::RATE_LIMIT_CODES.contains(&error.code),
            _ => false,
        }
    }

    /// Whether the request may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Error::UnexpectedStatus(status) => *status >= 500,
            Error::Graph(error) => error.is_transient.unwrap_or(false),
            _ => false,
        }
    }
}

impl From<GraphError> for Error {
    fn from(error: GraphError) -> Self {
        Error::Graph(error)
    }
}
