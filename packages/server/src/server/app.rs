//! Application setup and router wiring.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Extension;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::orchestrator::{
    merge, ExecutorConfig, FanOutExecutor, Orchestrator, QualitativeScorer, ReportAssembler,
};
use crate::domains::search::{default_http_client, DomainRegistry, SearchLimits};
use crate::kernel::jobs::{JobStore, LocalJobStore};
use crate::kernel::{ProgressBroadcaster, StreamHub};
use crate::server::routes;

/// Shared application state, one instance per process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub hub: StreamHub,
    pub orchestrator: Arc<Orchestrator>,
    pub reports_dir: PathBuf,
}

/// Wire the production dependency graph from configuration.
pub fn build_state(
    config: &Config,
    qualitative: Option<Arc<dyn QualitativeScorer>>,
) -> anyhow::Result<AppState> {
    let store: Arc<dyn JobStore> = Arc::new(LocalJobStore::open(&config.data_dir)?);
    let hub = StreamHub::new();
    let broadcaster = Arc::new(ProgressBroadcaster::new(store.clone(), hub.clone()));

    let registry = Arc::new(DomainRegistry::with_default_providers(
        default_http_client()?,
    ));
    let executor = FanOutExecutor::new(
        registry,
        ExecutorConfig {
            provider_timeout: config.provider_timeout,
            job_timeout: config.job_timeout,
            limits: SearchLimits {
                max_results: config.max_results,
            },
        },
        merge::default_ranker(),
    );
    let reports = ReportAssembler::new(config.reports_dir.clone());
    let orchestrator = Arc::new(Orchestrator::new(broadcaster, executor, qualitative, reports));

    Ok(AppState {
        store,
        hub,
        orchestrator,
        reports_dir: config.reports_dir.clone(),
    })
}

/// Build the Axum router over a prepared state.
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(if origins.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        })
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/query", post(routes::submit_query))
        .route("/api/status/:id", get(routes::job_status))
        .route("/api/result/:id", get(routes::job_result))
        .route("/api/streams/jobs/:id", get(routes::job_stream))
        .route("/api/reports/:filename", get(routes::download_report))
        .route("/health", get(routes::health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
