use super::model::AppUsage;

use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Rate budget information reported by the Graph API for the current app.
#[derive(Debug)]
pub struct UsageLimit {
    percentage: AtomicU32,
    cooldown: Duration,
}

impl UsageLimit {
    pub const HEADER_NAME: &'static str = "x-app-usage";

    // Leave a little headroom, since the header lags behind the real count.
    const THRESHOLD_PERCENTAGE: u32 = 95;

    // Not very performance-sensitive so let's just be safe.
    const DEFAULT_ORDERING: Ordering = Ordering::SeqCst;

    pub fn new(cooldown: Duration) -> UsageLimit {
        UsageLimit {
            percentage: AtomicU32::new(0),
            cooldown,
        }
    }

    /// The highest usage percentage seen in the latest response.
    pub fn percentage(&self) -> u32 {
        self.percentage.load(Self::DEFAULT_ORDERING)
    }

    pub fn update(&self, usage: &AppUsage) {
        self.percentage
            .store(usage.max_percentage(), Self::DEFAULT_ORDERING);
    }

    /// Update from response headers, ignoring a missing or malformed usage header.
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let usage = headers
            .get(Self::HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| serde_json::from_str::<AppUsage>(value).ok());

        match usage {
            Some(usage) => self.update(&usage),
            None => log::trace!("No usage information in response"),
        }
    }

    /// How long to wait before the next request, if we're close to the limit.
    pub fn delay(&self) -> Option<Duration> {
        if self.percentage() >= Self::THRESHOLD_PERCENTAGE {
            Some(self.cooldown)
        } else {
            None
        }
    }

    /// Forget the last reading once we've waited out the cooldown.
    pub fn reset(&self) {
        self.percentage.store(0, Self::DEFAULT_ORDERING);
    }
}
