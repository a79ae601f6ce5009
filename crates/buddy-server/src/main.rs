use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use buddy_api::mailer::{LogMailer, Mailer, SmtpMailer};
use buddy_api::notifications;
use buddy_api::{AppState, AppStateInner, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buddy=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    // Init database
    let db = buddy_db::Database::open(&config.db_path)?;

    let mailer: Arc<dyn Mailer> = match &config.mail.smtp_host {
        Some(host) => {
            info!("Sending mail through {}:{}", host, config.mail.smtp_port);
            Arc::new(SmtpMailer::new(&config.mail, host)?)
        }
        None => {
            warn!("BUDDY_SMTP_HOST is unset, emails are only logged");
            Arc::new(LogMailer::new(&config.mail))
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner::new(db, config, mailer));

    // Background notification job
    tokio::spawn(notifications::run_notification_loop(state.clone()));

    let app = buddy_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Buddy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
