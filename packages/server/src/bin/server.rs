//! Campus API server binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use campus_server::{build_app, seed_superadmin, ApiServer, ServerConfig, Stores};

/// How often expired revocation entries are swept out.
const REVOCATION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Parser)]
#[command(name = "campus-server", about = "School management API server")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port. 0 asks the OS for a free port.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// HMAC secret for signing bearer tokens.
    #[arg(long, env = "JWT_SECRET", default_value = "dev-only-secret")]
    jwt_secret: String,

    /// Token lifetime in hours.
    #[arg(long, default_value_t = 24)]
    token_ttl_hours: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Allowed CORS origin. Repeatable; "*" allows any.
    #[arg(long = "cors-origin", default_value = "*")]
    cors_origins: Vec<String>,

    /// Email for the seeded superadmin account.
    #[arg(long, env = "SUPERADMIN_EMAIL", default_value = "admin@example.com")]
    superadmin_email: String,

    /// Password for the seeded superadmin account.
    #[arg(long, env = "SUPERADMIN_PASSWORD", default_value = "change-me-now")]
    superadmin_password: String,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        cors_origins: args.cors_origins,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        jwt_secret: args.jwt_secret,
        token_ttl: Duration::from_secs(args.token_ttl_hours * 60 * 60),
    };

    let stores = Stores::in_memory();
    seed_superadmin(&stores, &args.superadmin_email, &args.superadmin_password)
        .await
        .context("failed to seed superadmin")?;
    let app = build_app(&config, &stores)?;

    // Expired revocations read as not-revoked either way; the sweep just
    // keeps the set from accumulating dead entries.
    let revocations = app.revocations.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(REVOCATION_PURGE_INTERVAL);
        tick.tick().await;
        loop {
            tick.tick().await;
            let removed = revocations.purge_expired();
            if removed > 0 {
                debug!(removed, "purged expired token revocations");
            }
        }
    });

    let mut server = ApiServer::new(config, Arc::new(app.dispatcher));
    let addr = server.start().await?;
    info!(%addr, "campus server ready");

    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
