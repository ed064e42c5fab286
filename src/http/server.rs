//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with form, monitor and admin handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Own the registry of mounted form gates
//! - Run the mutation monitor and rate limiter pruning in the background
//! - Apply hot-reloaded configuration

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    routing::{delete, get, post},
    Router,
};
use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::GuardConfig;
use crate::gate::{GatePolicy, SubmissionGate};
use crate::http::forms;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::layer::TrustLayer;
use crate::monitor::{MonitorEvent, MutationMonitor};
use crate::observability::metrics;

/// Shared state behind every handler.
pub struct InnerState {
    pub config: ArcSwap<GuardConfig>,
    pub layer: TrustLayer,
    pub gates: DashMap<String, Arc<SubmissionGate>>,
    pub monitor: Arc<MutationMonitor>,
    pub monitor_tx: mpsc::Sender<MonitorEvent>,
    pub started_at: Instant,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<InnerState>,
}

impl AppState {
    /// The gate for `form_id`, mounting it with the current policy if needed.
    pub fn mount_gate(&self, form_id: &str) -> Arc<SubmissionGate> {
        let gate = self
            .inner
            .gates
            .entry(form_id.to_string())
            .or_insert_with(|| {
                let policy = GatePolicy::from(&self.inner.config.load().gate);
                tracing::info!(form_id, max_attempts = policy.max_attempts, "Form mounted");
                Arc::new(self.inner.layer.gate(form_id, policy))
            })
            .clone();
        metrics::set_active_gates(self.inner.gates.len());
        gate
    }

    pub fn gate(&self, form_id: &str) -> Option<Arc<SubmissionGate>> {
        self.inner.gates.get(form_id).map(|r| r.value().clone())
    }

    /// Remove the gate for `form_id`, cancelling its countdown.
    pub fn unmount_gate(&self, form_id: &str) -> bool {
        let removed = self.inner.gates.remove(form_id);
        metrics::set_active_gates(self.inner.gates.len());
        match removed {
            Some((_, gate)) => {
                gate.dispose();
                tracing::info!(form_id, "Form unmounted");
                true
            }
            None => false,
        }
    }
}

/// The sidecar's HTTP server.
pub struct GuardServer {
    state: AppState,
    monitor_rx: mpsc::Receiver<MonitorEvent>,
}

impl GuardServer {
    pub fn new(config: GuardConfig, layer: TrustLayer) -> Self {
        let monitor = Arc::new(MutationMonitor::new(
            layer.audit.clone(),
            layer.persistent().clone(),
            config.monitor.clone(),
        ));
        let (monitor_tx, monitor_rx) = mpsc::channel(config.monitor.event_buffer);

        let state = AppState {
            inner: Arc::new(InnerState {
                config: ArcSwap::from_pointee(config),
                layer,
                gates: DashMap::new(),
                monitor,
                monitor_tx,
                started_at: Instant::now(),
            }),
        };

        Self { state, monitor_rx }
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// The full router, with all middleware layers.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let router = self.router();
        let GuardServer { state, monitor_rx } = self;

        let monitor = state.inner.monitor.clone();
        tokio::spawn(monitor.run(monitor_rx, shutdown.resubscribe()));

        let reload_state = state.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    max_attempts = new_config.gate.max_attempts,
                    window_secs = new_config.gate.window_secs,
                    "Configuration reloaded; applies to newly mounted forms"
                );
                reload_state.inner.config.store(Arc::new(new_config));
            }
        });

        let prune_state = state.clone();
        let mut prune_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pruned = prune_state.inner.layer.limiter.prune();
                        if pruned > 0 {
                            tracing::debug!(pruned, "Pruned expired rate limit windows");
                        }
                    }
                    _ = prune_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        for entry in state.inner.gates.iter() {
            entry.value().dispose();
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(state: AppState) -> Router {
    let config = state.inner.config.load_full();

    let mut router = Router::new()
        .route("/health", get(forms::health))
        .route("/page", post(forms::report_navigation))
        .route("/forms/{form_id}/mount", post(forms::mount_form))
        .route("/forms/{form_id}/submit", post(forms::submit_form))
        .route("/forms/{form_id}/state", get(forms::form_state))
        .route("/forms/{form_id}", delete(forms::unmount_form))
        .route("/monitor/events", post(forms::monitor_event))
        .with_state(state.clone());

    if config.admin.enabled {
        router = router.merge(setup_admin_router(state));
    }

    router
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}
