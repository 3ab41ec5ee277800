use clap::Parser;
use payrun_adapters::PayoutFixture;
use payrun_core::{Address, CostSchedule};
use payrun_service::{build_router, ServiceConfig, ServiceState};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "payrund", version, about = "Payrun custody engine service")]
struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:8097
    #[arg(long, default_value = "127.0.0.1:8097")]
    listen: SocketAddr,
    /// Owner address authorized for payout and kill.
    #[arg(
        long,
        env = "PAYRUN_OWNER",
        default_value = "0x00000000000000000000000000000000000000aa"
    )]
    owner: Address,
    /// The engine's own custody address.
    #[arg(
        long,
        env = "PAYRUN_ENGINE_ADDRESS",
        default_value = "0x00000000000000000000000000000000000000ee"
    )]
    engine_address: Address,
    /// Run one payout batch from a CSV fixture and exit instead of serving.
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "payrun_service=info,payrun_core=debug,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let state = ServiceState::bootstrap(ServiceConfig {
        owner: cli.owner,
        engine_address: cli.engine_address,
        costs: CostSchedule::default(),
    });

    if let Some(path) = cli.fixture {
        return run_fixture(&state, &path);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("payrun-service listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Batch mode: fund custody to exactly the fixture's totals, apply the
/// payout as the owner, and report the receipt with its resource cost.
fn run_fixture(state: &ServiceState, path: &Path) -> anyhow::Result<()> {
    let fixture = PayoutFixture::from_path(path)?;
    let (native_total, token_total) = fixture.totals();
    let engine_address = state.engine.address();

    state
        .native
        .write()
        .map_err(|_| anyhow::anyhow!("native ledger lock poisoned"))?
        .deposit(engine_address, native_total)?;
    state
        .token
        .write()
        .map_err(|_| anyhow::anyhow!("token reference lock poisoned"))?
        .issue(engine_address, token_total);

    let receipt = state.engine.payout(state.engine.owner(), &fixture.request())?;
    info!(
        rows = fixture.len(),
        total_native = receipt.total_native,
        total_token = receipt.total_token,
        cost_units = receipt.cost_units,
        cumulative = state.engine.cumulative_cost(),
        "fixture batch applied"
    );
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
