//! Polling subscriptions.
//!
//! A subscription is a background task that GETs a resource's updates
//! endpoint on a fixed cadence. It is `Active` from creation until
//! `cancel` is called or the handle is dropped, then `Cancelled` for good:
//! no further requests are issued and the callback is never invoked again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn, Instrument};

use crate::client::RequestOptions;
use crate::endpoints;
use crate::http::HttpMethod;
use crate::service::ApiService;
use crate::transport::Transport;
use crate::types::Payload;

/// Floor applied to the polling period; `tokio::time::interval` panics on zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Cancelled,
}

#[derive(Debug)]
struct Shared {
    resource_id: String,
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl Shared {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.abort.abort();
        info!(resource_id = %self.resource_id, "update subscription cancelled");
    }
}

/// Handle to a running update poller.
///
/// Dropping the handle cancels the poller. Use `into_canceller` to keep it
/// running and hold only the cancel capability.
#[derive(Debug)]
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    shared: Arc<Shared>,
    cancel_on_drop: bool,
}

impl Subscription {
    pub(crate) fn spawn<T, F>(service: ApiService<T>, resource_id: &str, period: Duration, mut callback: F) -> Self
    where
        T: Transport,
        F: FnMut(Payload) + Send + 'static,
    {
        let period = if period.is_zero() {
            warn!(resource_id, "zero poll interval, using {MIN_POLL_INTERVAL:?}");
            MIN_POLL_INTERVAL
        } else {
            period
        };
        let cancelled = Arc::new(AtomicBool::new(false));
        let endpoint = endpoints::case_updates(resource_id);
        let id = resource_id.to_string();

        let flag = Arc::clone(&cancelled);
        let poller = async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                match service.execute(&endpoint, RequestOptions::new(HttpMethod::Get)).await {
                    Ok(payload) => {
                        if flag.load(Ordering::Acquire) {
                            break;
                        }
                        callback(payload);
                    }
                    Err(err) => warn!(resource_id = %id, endpoint = %endpoint, error = %err, "failed to fetch updates"),
                }
            }
        };
        let task = tokio::spawn(poller.in_current_span());

        info!(resource_id, interval_ms = period.as_millis() as u64, "update subscription started");
        Self {
            shared: Arc::new(Shared {
                resource_id: resource_id.to_string(),
                cancelled,
                abort: task.abort_handle(),
            }),
            cancel_on_drop: true,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.shared.resource_id
    }

    pub fn state(&self) -> SubscriptionState {
        if self.shared.cancelled.load(Ordering::Acquire) {
            SubscriptionState::Cancelled
        } else {
            SubscriptionState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// Stop polling. Takes effect immediately; calling it again is a no-op.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Give up the handle and keep the poller running, returning a
    /// zero-argument function that cancels it. The function is idempotent and
    /// may be cloned and called from any thread.
    pub fn into_canceller(mut self) -> impl Fn() + Clone + Send + Sync + 'static {
        self.cancel_on_drop = false;
        let shared = Arc::clone(&self.shared);
        move || shared.cancel()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.shared.cancel();
        }
    }
}
