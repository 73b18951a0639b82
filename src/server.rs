//! Web server

use crate::cli;

use std::{net::SocketAddr, path::PathBuf, process::exit, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

/// Serve the weather statistics service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(args: &cli::CommandLineArgs, service: crate::app::Service) {
    let addr = match SocketAddr::from_str(&format!("{}:{}", args.host, args.port)) {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!("invalid host name, IP address or port number: {}", err);
            exit(1)
        }
    };

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    tracing::info!(%addr, https = args.https, "listening");
    let result = if args.https {
        let abs_cert_file = tls_file(&args.cert_file, "certificate");
        let abs_key_file = tls_file(&args.key_file, "key");
        // Set up TLS config
        let tls_config = match RustlsConfig::from_pem_file(abs_cert_file, abs_key_file).await {
            Ok(tls_config) => tls_config,
            Err(err) => {
                tracing::error!("failed to load TLS certificate files: {}", err);
                exit(1)
            }
        };
        // run HTTPS server with hyper
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    } else {
        // run HTTP server with hyper
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    };
    if let Err(err) = result {
        tracing::error!("server error: {}", err);
    }
}

/// Expand `~` in a TLS file path and check that the file exists, exiting otherwise.
fn tls_file(path: &str, kind: &str) -> PathBuf {
    let abs_path = match expanduser(path).and_then(|path| path.canonicalize()) {
        Ok(abs_path) => abs_path,
        Err(err) => {
            tracing::error!("failed to determine absolute path to TLS {} file: {}", kind, err);
            exit(1)
        }
    };
    if !abs_path.exists() {
        tracing::error!(
            "TLS {} file expected at '{}' but not found.",
            kind,
            abs_path.display()
        );
        exit(1)
    }
    abs_path
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {}", err);
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

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
