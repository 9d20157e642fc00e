use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use metrics_exporter_prometheus::PrometheusBuilder;

use chunked_file_storage::db::PgStore;
use chunked_file_storage::routers::make_routes;
use chunked_file_storage::services::FileService;
use chunked_file_storage::utils::config::Config;

#[derive(Parser, Debug)]
#[command(name = "chunked-file-storage", about = "Chunked file storage service")]
struct Args {
    /// Address to listen on, overrides BIND_ADDR
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Apply the database schema and exit
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut cfg = Config::from_env()?;
    if let Some(bind) = args.bind {
        cfg.bind_addr = bind;
    }
    info!("Starting with DB: {:?}", cfg.database);

    let store = Arc::new(
        PgStore::connect(&cfg.database)
            .await
            .context("connecting to the database")?,
    );
    info!("Database OK.");
    if args.migrate_only {
        store.close().await;
        return Ok(());
    }

    if let Some(port) = cfg.prometheus_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("installing the Prometheus exporter")?;
        info!("Prometheus exporter listening on port {}", port);
    }

    let service = FileService::with_store(store.clone(), cfg.chunks.clone());
    let routes = make_routes(service, cfg.max_upload_bytes);

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(cfg.bind_addr, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!("Server running at http://{}", addr);
    server.await;

    store.close().await;
    Ok(())
}
