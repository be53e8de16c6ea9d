use outdial::application::{
    spawn_event_router, trunk_event_channel, CallOrchestrator, SilenceWatchdog,
};
use outdial::config::Config;
use outdial::infrastructure::metrics::init_metrics;
use outdial::infrastructure::trunk::SimulatedTrunk;
use outdial::interface::api::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting outdial call orchestrator");

    // Load configuration
    let config = Config::load()?;
    let settings = config.orchestrator_settings()?;
    info!("Configuration loaded: {:?}", config);

    if !settings.enable_outbound_calls {
        warn!("Outbound calling is disabled; every dispatch will be gated");
    }

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics()?;

    let (event_tx, event_rx) = trunk_event_channel();
    let trunk = Arc::new(
        SimulatedTrunk::new(event_tx.clone())
            .with_sip_domain(config.trunk.sip_domain.clone())
            .with_delays(
                Duration::from_millis(config.trunk.ring_delay_ms),
                Duration::from_millis(config.trunk.answer_delay_ms),
            ),
    );
    if config.trunk.provider_url.is_some() || config.trunk.api_key.is_some() {
        warn!("Provider credentials configured but only the simulated trunk is available; ignoring them");
    }
    info!("Using simulated trunk provider");

    let orchestrator = Arc::new(CallOrchestrator::new(settings, trunk));
    let router_handle = spawn_event_router(orchestrator.clone(), event_rx);

    let watchdog_handle = match SilenceWatchdog::new(orchestrator.clone()) {
        Some(watchdog) => Some(watchdog.spawn()),
        None => {
            info!("Silence watchdog disabled");
            None
        }
    };

    let api_state = AppState {
        orchestrator: orchestrator.clone(),
        trunk_events: event_tx,
    };
    let app = build_router(api_state, prometheus_handle);
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await?;
    info!("REST API server started on {}:{}", config.server.host, config.server.port);

    let mut shutdown = orchestrator.subscribe_shutdown();
    let api_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stopping| *stopping).await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    let report = orchestrator.shutdown().await;
    info!(
        "Closed {} calls ({} hangups failed, drain timed out: {})",
        report.sessions_closed, report.hangups_failed, report.timed_out
    );

    router_handle.await?;
    if let Some(handle) = watchdog_handle {
        handle.await?;
    }
    api_handle.await??;

    info!("Outdial stopped");
    Ok(())
}
