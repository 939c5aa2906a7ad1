// HTTP client configuration and request helpers

use playhead_core::{PlayerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which a backoff wait notices cancellation
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// HTTP settings for remote media
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    /// Retries of a failed request, with exponential backoff
    pub max_retries: u32,
    /// Base delay of the backoff; doubled per attempt
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            user_agent: format!("playhead/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    config: HttpConfig,
    cancel: Arc<AtomicBool>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .user_agent(&config.user_agent)
            .redirects(10)
            .build();
        Self {
            agent,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Give up before the next request or retry once `cancel` is set.
    /// A request already on the wire still runs to its own timeout.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn cancelled(what: &str) -> PlayerError {
        PlayerError::Network(format!("{} cancelled", what))
    }

    /// Sleep for `delay` unless cancelled first; returns `false` on cancel
    fn wait(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            if self.is_cancelled() {
                return false;
            }
            std::thread::sleep(left.min(CANCEL_POLL));
        }
        !self.is_cancelled()
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `request` until it succeeds or the retry budget is spent
    fn with_retries(
        &self,
        what: &str,
        request: impl Fn(&ureq::Agent) -> std::result::Result<ureq::Response, ureq::Error>,
    ) -> Result<ureq::Response> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if self.is_cancelled() {
                return Err(Self::cancelled(what));
            }
            match request(&self.agent) {
                Ok(response) => return Ok(response),
                // Client errors will not improve with retries
                Err(ureq::Error::Status(code, _)) if (400..500).contains(&code) => {
                    return Err(PlayerError::Network(format!("{} failed: HTTP {}", what, code)));
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                    if attempt < self.config.max_retries {
                        let delay = self.backoff(attempt);
                        log::warn!("{} failed (attempt {}), retrying after {:?}", what, attempt + 1, delay);
                        if !self.wait(delay) {
                            return Err(Self::cancelled(what));
                        }
                    }
                }
            }
        }

        Err(PlayerError::Network(format!(
            "{} failed after {} attempts: {}",
            what,
            self.config.max_retries + 1,
            last_error.unwrap_or_default()
        )))
    }

    pub fn head(&self, url: &str) -> Result<ureq::Response> {
        self.with_retries("HTTP HEAD", |agent| agent.head(url).call())
    }

    /// GET `bytes=start-end` (inclusive)
    pub fn get_range(&self, url: &str, start: u64, end: u64) -> Result<ureq::Response> {
        let range = format!("bytes={}-{}", start, end);
        self.with_retries("HTTP Range GET", |agent| agent.get(url).set("Range", &range).call())
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

/// Total resource size from a `Content-Range: bytes 0-0/12345` header
pub fn parse_total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse::<u64>().ok()
}
