mod api;
mod app_state;
mod bootstrap;
mod config;
mod openapi;
mod responses;
mod router;

pub(crate) use app_state::AppState;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    shopfloor_otel::init();

    let cfg = match config::ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("invalid configuration: {err}");
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let runner = match bootstrap::build_runner(&cfg) {
        Ok(runner) => runner,
        Err(err) => {
            error!("startup failed: {err:#}");
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };

    let app = bootstrap::attach_http_layers(
        router::build(AppState::new(runner)),
        cfg.concurrency_limit,
    );

    let listener = match tokio::net::TcpListener::bind(cfg.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %cfg.addr, "failed to bind server socket: {err}");
            std::process::exit(1);
        }
    };
    info!(addr = %cfg.addr, contract = %cfg.contract_path.display(), "shopfloor server listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!("http server exited with error: {err}");
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
