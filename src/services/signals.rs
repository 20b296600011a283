use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::services::ServiceResult;
use crate::services::manager::ServiceManager;

/// Run until SIGINT/SIGTERM or until a service exits, then shut everything down.
pub async fn handle_shutdown_signals(
    mut service_manager: ServiceManager,
    shutdown_timeout: Duration,
) -> ExitCode {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received ctrl+c, gracefully shutting down...");
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, gracefully shutting down...");
            }
            Err(e) => {
                error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    let mut exit_code = ExitCode::SUCCESS;

    tokio::select! {
        (name, result) = service_manager.run() => {
            match result {
                ServiceResult::GracefulShutdown | ServiceResult::NormalCompletion => {
                    warn!(service = %name, "service exited, shutting down remaining services");
                }
                ServiceResult::Error(e) => {
                    error!(service = %name, error = ?e, "service failed, shutting down remaining services");
                    exit_code = ExitCode::FAILURE;
                }
            }
        }
        _ = ctrl_c => {}
        _ = sigterm => {}
    }

    match service_manager.shutdown(shutdown_timeout).await {
        Ok(elapsed) => {
            info!(elapsed = format!("{elapsed:.2?}"), "graceful shutdown complete");
        }
        Err(pending) => {
            warn!(
                pending_services = pending,
                timeout = format!("{shutdown_timeout:.2?}"),
                "graceful shutdown timed out, aborting remaining services"
            );
            exit_code = ExitCode::FAILURE;
        }
    }

    exit_code
}
