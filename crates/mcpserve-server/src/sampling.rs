//! The sampling controller.
//!
//! Mediates server→client LLM sampling: a tool handler hands the controller
//! a [`CreateMessageRequest`]; the controller validates it against the
//! session's limits and, if admitted, forwards it to the originating
//! session as a `sampling/createMessage` request and awaits the client's
//! response.
//!
//! Enforced limits, per session:
//!
//! - **Rate** — sliding one-minute window of admitted requests;
//! - **Concurrency** — gauge of in-flight requests;
//! - **Token budget** — the negotiated version's ceiling (or a configured
//!   override);
//! - **Content kinds** — the version's allow-set plus the client's declared
//!   sampling capability;
//! - **Priority** — 1..=10; with prioritization enabled, higher priority
//!   buys a monotonically larger timeout.
//!
//! With graceful degradation enabled, an over-budget request is retried
//! once as a clamped, floor-priority fallback instead of failing outright.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mcpserve_core::error::{McpError, SamplingRejection};
use mcpserve_core::types::{ContentKind, CreateMessageRequest, CreateMessageResult};
use mcpserve_core::version::ProtocolVersion;

use crate::session::{Session, SessionId};

/// Method name for server→client sampling.
const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Admitted requests per minute per session.
    pub requests_per_minute: u32,
    /// Maximum in-flight requests per session.
    pub max_concurrent: usize,
    /// Whether priority scales the per-request timeout.
    pub enable_prioritization: bool,
    /// Whether an over-budget request degrades instead of failing.
    pub graceful_degradation: bool,
    /// Timeout for a priority-5 request; scaling is relative to this.
    pub base_timeout: Duration,
    /// Per-version token-ceiling overrides; absent versions use their
    /// built-in default.
    pub token_caps: HashMap<ProtocolVersion, u32>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 120,
            max_concurrent: 10,
            enable_prioritization: false,
            graceful_degradation: false,
            base_timeout: Duration::from_secs(30),
            token_caps: HashMap::new(),
        }
    }
}

impl SamplingConfig {
    /// The token ceiling for a version.
    #[must_use]
    pub fn token_cap(&self, version: ProtocolVersion) -> u32 {
        self.token_caps
            .get(&version)
            .copied()
            .unwrap_or_else(|| version.max_sampling_tokens())
    }
}

/// Rolling per-session statistics.
#[derive(Debug, Clone, Default)]
pub struct SamplingStats {
    /// Completed round trips.
    pub completed: u64,
    /// Average round-trip time across completed requests.
    pub average_rtt: Option<Duration>,
}

#[derive(Default)]
struct SessionState {
    window: VecDeque<Instant>,
    in_flight: Arc<AtomicUsize>,
    total_rtt: Duration,
    completed: u64,
}

/// The sampling controller.
pub struct SamplingController {
    config: SamplingConfig,
    sessions: Mutex<HashMap<SessionId, SessionState>>,
}

impl SamplingController {
    /// Create a controller with the given configuration.
    #[must_use]
    pub fn new(config: SamplingConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The controller configuration.
    #[must_use]
    pub const fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Statistics for a session.
    #[must_use]
    pub fn stats(&self, session: SessionId) -> SamplingStats {
        let sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions
            .get(&session)
            .map(|state| SamplingStats {
                completed: state.completed,
                average_rtt: (state.completed > 0)
                    .then(|| state.total_rtt / u32::try_from(state.completed).unwrap_or(u32::MAX)),
            })
            .unwrap_or_default()
    }

    /// Drop a session's counters (session teardown).
    pub fn remove_session(&self, session: SessionId) {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&session);
    }

    /// Validate and forward a sampling request to the originating session.
    pub async fn request(
        &self,
        session: &Arc<Session>,
        mut request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, McpError> {
        let version = session.effective_version();

        if !(1..=10).contains(&request.priority) {
            return Err(McpError::sampling_rejected(
                SamplingRejection::InvalidPriority,
                format!("priority {} is outside 1..=10", request.priority),
            ));
        }

        if !session.client_caps().supports_sampling() {
            return Err(McpError::capability_not_supported("sampling"));
        }

        self.check_content_kinds(&request, version, session)?;

        let cap = self.config.token_cap(version);
        if request.max_tokens > cap {
            if self.config.graceful_degradation {
                tracing::debug!(
                    session_id = %session.id(),
                    requested = request.max_tokens,
                    cap,
                    "degrading over-budget sampling request"
                );
                request.max_tokens = cap;
                request.priority = 1;
            } else {
                return Err(McpError::sampling_rejected_with_suggestion(
                    SamplingRejection::TokenBudget,
                    format!(
                        "requested {} tokens, but version {version} allows at most {cap}",
                        request.max_tokens
                    ),
                    format!("retry with maxTokens <= {cap}"),
                ));
            }
        }

        let gauge = self.admit(session.id())?;
        let _release = GaugeGuard(gauge);

        let timeout = self.timeout_for(request.priority);
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            timeout,
            session.request(SAMPLING_CREATE_MESSAGE, request.to_wire_params()),
        )
        .await;

        let response = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(McpError::timeout(SAMPLING_CREATE_MESSAGE, timeout));
            }
        };

        self.record_rtt(session.id(), started.elapsed());

        let value = response.into_result().map_err(|err| {
            McpError::internal(format!(
                "client rejected sampling request: {} (code {})",
                err.message, err.code
            ))
        })?;
        serde_json::from_value(value)
            .map_err(|err| McpError::internal_with_source("malformed sampling result", err))
    }

    /// Reject any message whose content kind the version or the client
    /// cannot accept.
    fn check_content_kinds(
        &self,
        request: &CreateMessageRequest,
        version: ProtocolVersion,
        session: &Session,
    ) -> Result<(), McpError> {
        let client = session.client_caps().sampling.unwrap_or_default();
        for message in &request.messages {
            let kind = message.content.kind();
            if !version.allows_sampling_kind(kind) {
                return Err(McpError::sampling_rejected(
                    SamplingRejection::UnsupportedContent,
                    format!("version {version} does not allow {kind} sampling content"),
                ));
            }
            let client_ok = match kind {
                ContentKind::Text => client.text,
                ContentKind::Image => client.image,
                ContentKind::Audio => client.audio,
                // Links and blobs ride along with text support.
                ContentKind::Link | ContentKind::Blob => client.text,
            };
            if !client_ok {
                return Err(McpError::sampling_rejected(
                    SamplingRejection::UnsupportedContent,
                    format!("client did not declare {kind} sampling support"),
                ));
            }
        }
        Ok(())
    }

    /// Run the rate and concurrency gates; on admission the caller owns one
    /// unit of the returned gauge.
    fn admit(&self, session: SessionId) -> Result<Arc<AtomicUsize>, McpError> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let state = sessions.entry(session).or_default();

        let now = Instant::now();
        let horizon = now.checked_sub(Duration::from_secs(60));
        while state
            .window
            .front()
            .is_some_and(|t| horizon.is_some_and(|h| *t < h))
        {
            state.window.pop_front();
        }
        if state.window.len() >= self.config.requests_per_minute as usize {
            return Err(McpError::sampling_rejected(
                SamplingRejection::RateLimited,
                format!(
                    "more than {} sampling requests in the last minute",
                    self.config.requests_per_minute
                ),
            ));
        }

        let gauge = state.in_flight.clone();
        if gauge.fetch_add(1, Ordering::SeqCst) >= self.config.max_concurrent {
            gauge.fetch_sub(1, Ordering::SeqCst);
            return Err(McpError::sampling_rejected(
                SamplingRejection::ConcurrencyExceeded,
                format!(
                    "{} sampling requests already in flight",
                    self.config.max_concurrent
                ),
            ));
        }

        state.window.push_back(now);
        Ok(gauge)
    }

    /// Per-request timeout derived from priority.
    ///
    /// Monotonic in priority when prioritization is enabled: priority 5
    /// maps to the base timeout, 1 to 60% of it, 10 to 150%.
    fn timeout_for(&self, priority: u8) -> Duration {
        if !self.config.enable_prioritization {
            return self.config.base_timeout;
        }
        let percent = 50 + u64::from(priority) * 10;
        self.config.base_timeout * u32::try_from(percent).unwrap_or(100) / 100
    }

    fn record_rtt(&self, session: SessionId, rtt: Duration) {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(state) = sessions.get_mut(&session) {
            state.total_rtt += rtt;
            state.completed += 1;
        }
    }
}

impl Default for SamplingController {
    fn default() -> Self {
        Self::new(SamplingConfig::default())
    }
}

/// Decrements the concurrency gauge when the request settles, on every
/// path.
struct GaugeGuard(Arc<AtomicUsize>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
