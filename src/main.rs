// sqltune/src/main.rs
use std::io;
use std::sync::Arc;

use actix_web::web;
use sqltune::api::{start_api_server, AppState};
use sqltune::config::{ApiConfig, HistoryBackend, ModeSetting, ProviderKind};
use sqltune::history::{HistoryStore, InMemoryHistoryStore, JsonHistoryStore};
use sqltune::llm::create_llm_provider;
use sqltune::monitoring::{self, MonitoringConfig};
use sqltune::optimizer::{MatchPolicy, OptimizerService};
use tracing::{info, warn};

fn to_io_error<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> io::Error + '_ {
    move |e| io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ApiConfig::from_env().map_err(to_io_error("Failed to load configuration"))?;

    let monitoring_config = MonitoringConfig::from_env();
    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = monitoring::init_tracing(&monitoring_config)?;
    monitoring::metrics::init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("GIT_SHA"),
        build_time = env!("BUILD_TIME"),
        "Starting sqltune"
    );

    let history: Arc<dyn HistoryStore> = match &config.history {
        HistoryBackend::Memory => {
            info!("History kept in memory only");
            Arc::new(InMemoryHistoryStore::new())
        }
        HistoryBackend::File(path) => {
            let store = JsonHistoryStore::new(path);
            info!(path = %store.path().display(), "History file");
            Arc::new(store)
        }
    };

    let policy = MatchPolicy::with_threshold(config.similarity_threshold);

    let service = match config.llm_config().map_err(to_io_error("Invalid model configuration"))? {
        Some(llm_config) => {
            info!(model = llm_config.model(), "Creating LLM provider");
            let provider = create_llm_provider(llm_config).map_err(to_io_error("Failed to create LLM provider"))?;
            info!("Model-backed optimization enabled");
            if let Err(e) = provider.health_check().await {
                warn!(error = %e, "Model backend not reachable yet, requests will fail until it is");
            }
            OptimizerService::with_provider(history, Arc::from(provider), policy)
        }
        None => {
            if config.mode == ModeSetting::Auto && config.provider == ProviderKind::OpenAI {
                warn!("OPENAI_API_KEY not set, serving heuristic optimizations");
            } else {
                info!("Heuristic optimization mode");
            }
            OptimizerService::heuristic(history, policy)
        }
    };

    let state = web::Data::new(AppState::new(service));
    start_api_server(&config, state)?.await
}
