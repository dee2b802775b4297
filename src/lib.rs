//! Chat proxy gateway for a generative-language upstream.
//!
//! One POST endpoint, a fixed pipeline per request: identify requester,
//! sanitize and validate, rate limit, cache lookup, assemble the persona
//! prompt, call upstream, cache the result. Each stage can short-circuit
//! with an error response; store failures degrade instead of failing the
//! request.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod limiter;
pub mod observability;
pub mod persona;
pub mod sanitize;
pub mod store;
pub mod upstream;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;

use cache::ResponseCache;
use limiter::RateLimiter;
use observability::Observability;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use http::{GatewayHttpState, router};
pub use persona::ChatMode;
pub use store::{KvStore, MemoryStore, RedisStore};
pub use upstream::{HttpUpstream, Upstream};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub mode: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub cached: bool,
}

pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0))
            .as_secs()
    }
}

pub struct Gateway {
    config: GatewayConfig,
    limiter: RateLimiter,
    cache: ResponseCache,
    upstream: Option<Arc<dyn Upstream>>,
    observability: Observability,
    clock: Arc<dyn Clock>,
    json_logs: bool,
}

impl Gateway {
    pub fn new(config: GatewayConfig, store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: GatewayConfig,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::new(store.clone(), config.rate_limit, config.rate_window_seconds);
        let cache = ResponseCache::new(store, config.cache_ttl_seconds);
        Self {
            config,
            limiter,
            cache,
            upstream: None,
            observability: Observability::default(),
            clock,
            json_logs: false,
        }
    }

    pub fn with_upstream(mut self, upstream: impl Upstream + 'static) -> Self {
        self.upstream = Some(Arc::new(upstream));
        self
    }

    pub fn with_json_logs(mut self) -> Self {
        self.json_logs = true;
        self
    }

    pub fn observability(&self) -> observability::ObservabilitySnapshot {
        self.observability.snapshot()
    }

    /// Runs the request pipeline. Stages execute strictly in order; the
    /// first failing stage terminates the request. Store failures never
    /// escape: rate limiting fails open, the cache degrades to a miss.
    pub async fn handle(&self, requester_key: &str, request: &ChatRequest) -> Result<ChatResponse> {
        self.observability.record_request();

        let mode = ChatMode::parse(&request.mode);
        let message = sanitize::sanitize(&request.message);
        if let Err(err) = sanitize::validate(
            &message,
            &request.history,
            self.config.max_history_items,
            self.config.max_message_chars,
        ) {
            self.observability.record_validation_rejected();
            return Err(GatewayError::InvalidRequest {
                reason: err.to_string(),
            });
        }

        let now = self.clock.now_epoch_seconds();
        match self.limiter.check(requester_key, now).await {
            Ok(true) => {}
            Ok(false) => {
                self.observability.record_rate_limited();
                return Err(GatewayError::RateLimited);
            }
            Err(err) => {
                // Fail-open: the limit is advisory and chat availability
                // outranks strict quota enforcement.
                self.observability.record_store_degraded();
                self.log_event(
                    "rate_limit_store_failed",
                    json!({"requester": requester_key, "error": err.to_string()}),
                );
            }
        }

        let cache_key = cache::cache_key(&message, &request.history, mode);
        match self.cache.lookup(&cache_key).await {
            Ok(Some(content)) => {
                self.observability.record_cache_hit();
                return Ok(ChatResponse {
                    content,
                    cached: true,
                });
            }
            Ok(None) => {}
            Err(err) => {
                self.observability.record_store_degraded();
                self.log_event("cache_lookup_failed", json!({"error": err.to_string()}));
            }
        }

        let Some(upstream) = self.upstream.as_ref() else {
            self.log_event(
                "server_misconfigured",
                json!({"reason": "upstream credential not configured"}),
            );
            return Err(GatewayError::Misconfigured);
        };

        let payload = persona::assemble(mode, &message, &request.history);
        self.observability.record_upstream_call();
        let content = match upstream.generate(&payload).await {
            Ok(content) => content,
            Err(err) => {
                self.observability.record_upstream_error();
                return Err(err);
            }
        };

        if let Err(err) = self.cache.store(&cache_key, &content).await {
            self.observability.record_store_degraded();
            self.log_event("cache_store_failed", json!({"error": err.to_string()}));
        }

        Ok(ChatResponse {
            content,
            cached: false,
        })
    }

    pub fn log_event(&self, event: &str, payload: serde_json::Value) {
        if !self.json_logs {
            return;
        }
        let record = json!({
            "ts_ms": SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|duration| duration.as_millis())
                .unwrap_or(0),
            "event": event,
            "payload": payload,
        });
        eprintln!("{record}");
    }
}
