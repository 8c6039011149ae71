//! Periodic metrics subscriptions.
//!
//! Each subscription is one spawned task that ticks at the requested
//! interval and publishes [`StreamEvent`]s into a bounded broadcast queue.
//! A slow reader loses the oldest updates rather than stalling the task.
//! The task ends, and its slot in the active count is released, on caller
//! cancellation, on router shutdown, or when the subscriber goes away.

mod types;

pub use types::*;

use crate::config::StreamingConfig;
use crate::insights::{InsightsAggregator, InsightsFilter, InsightsSnapshot, Sections};
use crate::scoring::RoutingError;
use chrono::Utc;
use futures::Stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Last snapshot computed for any subscription.
struct CachedSnapshot {
    at: Instant,
    scope: Vec<String>,
    sections: Sections,
    snapshot: Arc<InsightsSnapshot>,
}

/// State shared between the streamer and its subscription tasks.
struct StreamCore {
    insights: Arc<InsightsAggregator>,
    config: StreamingConfig,
    cache: Mutex<Option<CachedSnapshot>>,
}

impl StreamCore {
    fn build_update(&self, request: &StreamRequest, sequence: u64) -> MetricsUpdate {
        let types = request.effective_types();
        let snapshot = self.snapshot(&request.include_backends, MetricType::sections(&types));

        let mut metrics = MetricsPayload::default();
        for kind in types {
            match kind {
                MetricType::Weights => {
                    metrics.factor_weights = Some(snapshot.factor_weights.clone());
                }
                MetricType::SuccessRates => {
                    metrics.backend_success_rates = Some(snapshot.backend_success_rates.clone());
                }
                MetricType::Latency => metrics.latency_stats = Some(snapshot.latency_stats),
                MetricType::Usage => {
                    metrics.backend_usage_stats = Some(snapshot.backend_usage_stats.clone());
                }
                MetricType::ContentTypes => {
                    let mut distribution = snapshot.content_type_distribution.clone();
                    if !request.include_content_types.is_empty() {
                        distribution.retain(|kind, _| request.include_content_types.contains(kind));
                    }
                    metrics.content_type_distribution = Some(distribution);
                }
                MetricType::Scores => {
                    metrics.backend_scores = Some(snapshot.backend_scores.clone());
                }
            }
        }

        let aggregate = self.insights.aggregate_success_rate(&request.include_backends);
        metrics.aggregate_success_rate = aggregate;
        let status = SystemStatus::classify(
            aggregate,
            self.config.critical_threshold,
            self.config.warning_threshold,
        );

        MetricsUpdate {
            sequence,
            metrics,
            status,
            timestamp: Utc::now(),
        }
    }

    /// Reuse a recent snapshot covering at least `sections` for `scope`.
    fn snapshot(&self, scope: &[String], sections: Sections) -> Arc<InsightsSnapshot> {
        let window = Duration::from_millis(self.config.coalesce_window_ms);
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Snapshot cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if let Some(cached) = cache.as_ref() {
            if cached.at.elapsed() < window
                && cached.scope == scope
                && covers(cached.sections, sections)
            {
                return Arc::clone(&cached.snapshot);
            }
        }

        let snapshot = Arc::new(self.insights.collect_scoped(
            &InsightsFilter::default(),
            scope,
            sections,
        ));
        *cache = Some(CachedSnapshot {
            at: Instant::now(),
            scope: scope.to_vec(),
            sections,
            snapshot: Arc::clone(&snapshot),
        });
        snapshot
    }
}

fn covers(have: Sections, want: Sections) -> bool {
    (have.weights || !want.weights)
        && (have.success_rates || !want.success_rates)
        && (have.content_types || !want.content_types)
        && (have.usage || !want.usage)
        && (have.latency || !want.latency)
        && (have.scores || !want.scores)
}

/// Decrements the active-subscription count when the task ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("conduit_active_streams").set(now as f64);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let now = self.0.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::gauge!("conduit_active_streams").set(now as f64);
    }
}

/// Spawns and tracks metrics subscriptions.
pub struct MetricsStreamer {
    core: Arc<StreamCore>,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl MetricsStreamer {
    pub fn new(
        insights: Arc<InsightsAggregator>,
        config: StreamingConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            core: Arc::new(StreamCore {
                insights,
                config,
                cache: Mutex::new(None),
            }),
            shutdown,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a subscription. Must be called from within a Tokio runtime.
    ///
    /// After [`shutdown`](Self::shutdown) the subscription closes at once
    /// with [`CloseReason::Shutdown`].
    pub fn subscribe(&self, request: StreamRequest) -> Result<MetricsSubscription, RoutingError> {
        let config = &self.core.config;
        let interval = request.update_interval_seconds;
        if interval < config.min_interval_seconds || interval > config.max_interval_seconds {
            return Err(RoutingError::invalid(
                "update_interval_seconds",
                format!(
                    "must be between {} and {}, got {}",
                    config.min_interval_seconds, config.max_interval_seconds, interval
                ),
            ));
        }
        let (sender, receiver) = broadcast::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let guard = ActiveGuard::acquire(&self.active);

        tracing::debug!(
            interval_seconds = interval,
            metrics_types = ?request.metrics_types,
            "Metrics subscription started"
        );

        let handle = tokio::spawn(run_subscription(
            Arc::clone(&self.core),
            request,
            sender,
            cancel.clone(),
            self.shutdown.clone(),
            guard,
        ));

        Ok(MetricsSubscription {
            receiver,
            cancel,
            handle: Some(handle),
        })
    }

    /// Subscriptions whose task is still running.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// End every subscription with [`CloseReason::Shutdown`].
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

async fn run_subscription(
    core: Arc<StreamCore>,
    request: StreamRequest,
    sender: broadcast::Sender<StreamEvent>,
    cancel: CancellationToken,
    shutdown: CancellationToken,
    _guard: ActiveGuard,
) {
    let period = Duration::from_secs(request.update_interval_seconds);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence = 0u64;

    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break CloseReason::Cancelled,
            _ = shutdown.cancelled() => break CloseReason::Shutdown,
            _ = ticker.tick() => {
                sequence += 1;
                let update = core.build_update(&request, sequence);
                if sender.send(StreamEvent::Update(update)).is_err() {
                    // subscriber is gone
                    tracing::debug!(sequence, "Metrics subscriber dropped");
                    return;
                }
            }
        }
    };

    let _ = sender.send(StreamEvent::Closed { reason });
    tracing::debug!(?reason, updates = sequence, "Metrics subscription closed");
}

/// Handle to one running subscription.
///
/// Dropping it cancels the subscription.
pub struct MetricsSubscription {
    receiver: broadcast::Receiver<StreamEvent>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MetricsSubscription {
    /// Next event, or `None` once the terminal event has been consumed.
    ///
    /// Updates lost to a full queue are skipped silently.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Metrics subscriber lagging, dropped oldest updates");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Ask the task to stop; a `Closed { Cancelled }` event follows.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the subscription task to finish.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Metrics subscription task failed");
            }
        }
    }

    /// Events as a stream, ending after the terminal event.
    pub fn into_stream(mut self) -> impl Stream<Item = StreamEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.next_event().await {
                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    break;
                }
            }
        }
    }
}

impl Drop for MetricsSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
