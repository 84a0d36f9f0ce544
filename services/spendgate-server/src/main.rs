//! Spendgate Server - Policy-enforcing x402 payment proxy
//!
//! Single binary that loads the agent policy table, opens the decision
//! ledger, and serves the gateway.
//!
//! # Quick Start
//!
//! ```bash
//! # Start with defaults (0.0.0.0:4020; default policy for all agents)
//! spendgate-server
//!
//! # With a policy file and a custom facilitator
//! spendgate-server --policy-file policies.yaml --upstream https://x402.org/facilitator
//!
//! # Environment overrides
//! SPENDGATE_PORT=8080 SPENDGATE_DB=/var/lib/spendgate/ledger.db spendgate-server
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use spendgate_gateway::{router, AppState, UpstreamClient};
use spendgate_ledger::Ledger;
use spendgate_policy::load_policies;
use spendgate_types::PolicyTable;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Spendgate - budget policies for autonomous agent payments
#[derive(Parser, Debug)]
#[command(
    name = "spendgate-server",
    about = "Policy-enforcing x402 payment proxy for AI agents",
    version
)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SPENDGATE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "4020", env = "SPENDGATE_PORT")]
    port: u16,

    /// YAML policy file mapping agent ids to policies
    #[arg(long, env = "SPENDGATE_POLICY_FILE")]
    policy_file: Option<PathBuf>,

    /// Upstream x402 facilitator base URL
    #[arg(
        long,
        default_value = "https://x402.org/facilitator",
        env = "SPENDGATE_UPSTREAM"
    )]
    upstream: String,

    /// Ledger database path
    #[arg(long, default_value = "spendgate.db", env = "SPENDGATE_DB")]
    db: PathBuf,

    /// Bound on upstream request time, in seconds
    #[arg(long, default_value = "10", env = "SPENDGATE_UPSTREAM_TIMEOUT")]
    upstream_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A broken policy file is reported once, here; the gateway then
    // enforces the restrictive default policy for every agent instead of
    // refusing to start.
    let policies = match &args.policy_file {
        Some(path) => match load_policies(path) {
            Ok(table) => {
                tracing::info!(count = table.len(), path = %path.display(), "loaded agent policies");
                table
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "failed to load policy file; enforcing the default policy for all agents"
                );
                PolicyTable::new()
            }
        },
        None => {
            tracing::info!("no policy file configured; the default policy governs all agents");
            PolicyTable::new()
        }
    };

    let ledger = match Ledger::open(&args.db).await {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!(error = %e, path = %args.db.display(), "failed to open ledger");
            std::process::exit(1);
        }
    };

    let upstream = match UpstreamClient::new(
        args.upstream.as_str(),
        Duration::from_secs(args.upstream_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build upstream client");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(policies, ledger, upstream));
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!(upstream = %args.upstream, "spendgate proxy listening on http://{}", addr);
    tracing::info!("health:       http://localhost:{}/health", args.port);
    tracing::info!("verify:       POST http://localhost:{}/verify", args.port);
    tracing::info!("settle:       POST http://localhost:{}/settle", args.port);
    tracing::info!("transactions: http://localhost:{}/transactions", args.port);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
