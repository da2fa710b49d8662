//! HTTP page fetching
//!
//! Every outbound request goes through a [`RateLimiter`] so a single
//! service never sees more than one request per interval. Throttled
//! responses (429) are waited out and retried; outages surface as
//! [`Error::ServiceUnavailable`].

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fetches the body of a page as text
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Enforces a minimum spacing between consecutive calls
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Block until the next call is allowed, then claim the slot
    pub fn wait(&self) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Build a blocking client from the network settings
pub fn build_client(network: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .user_agent(&network.user_agent)
        .timeout(Duration::from_secs(network.timeout_secs))
        .build()
        .map_err(Error::Http)
}

/// Send a GET through the limiter, retrying while the service throttles us
///
/// Shared by the page fetcher and the geocoder.
pub fn get_with_retry(
    client: &Client,
    limiter: &RateLimiter,
    url: &str,
    max_retries: u32,
) -> Result<Response> {
    let mut attempt = 0;
    loop {
        limiter.wait();
        debug!(url, attempt, "GET");

        let response = client.get(url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                Error::ServiceUnavailable(format!("{}: {}", url, e))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if attempt >= max_retries {
                return Err(Error::ServiceUnavailable(format!(
                    "{} still throttled after {} retries",
                    url, max_retries
                )));
            }
            let delay = retry_delay(&response, limiter.min_interval(), attempt);
            warn!(url, ?delay, "throttled, waiting before retry");
            thread::sleep(delay);
            attempt += 1;
            continue;
        }
        if status.is_server_error() {
            return Err(Error::ServiceUnavailable(format!("{} returned {}", url, status)));
        }
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned {}", url, status)));
        }
        return Ok(response);
    }
}

/// Honor Retry-After when present, otherwise back off linearly
fn retry_delay(response: &Response, base: Duration, attempt: u32) -> Duration {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| backoff(base, attempt))
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.max(Duration::from_secs(1)) * (attempt + 1)
}

/// Rate-limited page fetcher for the forum
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    limiter: RateLimiter,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(network)?,
            limiter: RateLimiter::new(Duration::from_millis(network.min_interval_ms)),
            max_retries: network.max_retries,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = get_with_retry(&self.client, &self.limiter, url, self.max_retries)?;
        response.text().map_err(Error::Http)
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory fetcher for tests

    use super::Fetch;
    use crate::error::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MapFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetch for MapFetcher {
        fn fetch(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Fetch(format!("{} returned 404 Not Found", url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_spaces_calls() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_rate_limiter_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_grows() {
        let base = Duration::from_millis(200);
        assert_eq!(backoff(base, 0), Duration::from_secs(1));
        assert_eq!(backoff(base, 2), Duration::from_secs(3));
        assert_eq!(backoff(Duration::from_secs(2), 1), Duration::from_secs(4));
    }

    #[test]
    fn test_http_fetcher_creation() {
        let fetcher = HttpFetcher::new(&NetworkConfig::default()).unwrap();
        assert_eq!(fetcher.limiter.min_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_map_fetcher() {
        let fetcher = testing::MapFetcher::new().with_page("http://a", "body");
        assert_eq!(fetcher.fetch("http://a").unwrap(), "body");
        assert!(fetcher.fetch("http://b").is_err());
        assert_eq!(fetcher.requests(), vec!["http://a", "http://b"]);
    }
}
