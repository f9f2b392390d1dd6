//! Hearth Server - one member of a virtual-actor cluster

use anyhow::Context;
use clap::Parser;
use hearth_core::{NodeBuilder, RuntimeConfig};
use hearth_server::api::{self, AppState};
use hearth_server::config::{MembershipSource, ServerConfig};
use hearth_server::discovery::{EtcdProvider, StaticProvider};
use hearth_server::grains;
use hearth_server::observability::{init_metrics, init_tracing, TracingConfig};
use hearth_server::transport::HttpTransport;
use hearth_server::version;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const DISCOVERY_STOP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(TracingConfig::new(config.log_format.clone()))?;

    info!(version = %version::full_version(), "Starting Hearth Server...");
    debug!("{}", version::build_info());

    config.validate()?;
    let member = config.member_id()?;
    let runtime = RuntimeConfig::from_env()?;
    let metrics = init_metrics()?;

    info!(member = %member, membership = ?config.membership, "Member identity");

    let transport = Arc::new(HttpTransport::new(CONNECT_TIMEOUT)?);
    let node = Arc::new(
        NodeBuilder::new(member.clone(), transport)
            .config(runtime)
            .registry(grains::registry())
            .build()?,
    );

    let etcd = match config.membership {
        MembershipSource::Static => {
            StaticProvider::new(config.static_member_ids()).start(node.membership());
            None
        }
        MembershipSource::Etcd => {
            info!(endpoints = ?config.etcd_endpoints, cluster_id = %config.cluster_id, "Connecting to etcd...");
            let provider = EtcdProvider::start(member.clone(), node.membership().clone(), config.etcd())
                .await
                .context("failed to start etcd membership")?;
            Some(provider)
        }
    };

    let app = api::create_router(AppState::new(node.clone()).with_metrics(metrics));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(bind_addr = %config.bind_addr, "Starting API server");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    info!("Shutdown signal received");

    // Leave the view first so peers stop routing here, then drain grains
    // while the server still answers in-flight forwards.
    if let Some(provider) = etcd {
        if let Err(e) = provider.stop(DISCOVERY_STOP_TIMEOUT).await {
            warn!(error = %e, "Discovery did not shut down cleanly");
        }
    }
    let drained = node.shutdown().await;

    let _ = stop_tx.send(());
    server.await.context("API server task failed")??;

    info!(drained = drained, "Hearth Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
