mod app;
mod logging;

use anyhow::{bail, Context, Result};
use app::{App, CliConfig, Command, LedgerState};
use clap::Parser;
use logging::{init_logging, LogOutput};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use subpool_core::{AccountId, SystemClock};
use subpool_ledger::PoolError;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(version, about = "Pooled-investment sub-pool ledger")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug, Clone)]
struct CommonArgs {
    /// Path to TOML of the instance config (custody account, asset, fee flag)
    #[clap(long, global = true, env = "SUBPOOL_CONFIG", default_value = "subpool.toml")]
    config: PathBuf,

    /// Path to JSON of the ledger state, rewritten after every change
    #[clap(long, global = true, env = "SUBPOOL_STATE", default_value = "subpool-state.json")]
    state: PathBuf,

    /// Account the command is signed by
    #[clap(long, global = true, env = "SUBPOOL_FROM")]
    from: Option<AccountId>,

    #[clap(long, global = true, value_enum, default_value_t = LogOutput::Console)]
    log_output: LogOutput,

    #[clap(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

fn load_config(path: &Path) -> Result<CliConfig> {
    toml::from_str(std::str::from_utf8(
        &std::fs::read(path)
            .with_context(|| format!("failed to read config toml file {path:?}"))?,
    )?)
    .with_context(|| format!("failed to parse config toml file {path:?}"))
}

async fn run(common: CommonArgs, command: Command) -> Result<()> {
    let config = load_config(&common.config)?;

    let state = match command {
        Command::Init => {
            if common.state.exists() {
                bail!("refusing to overwrite existing state file {:?}", common.state);
            }
            LedgerState::default()
        }
        _ => LedgerState::read(&common.state)?,
    };

    let app = App::load(&config, state, SystemClock)?;
    let persist = matches!(command, Command::Init) || command.mutates();
    if matches!(command, Command::ValidateConfig) {
        info!(pools = app.pools().pool_count().await, "Configs are OK!");
    }

    let output = app.execute(command, common.from).await?;
    if persist {
        app.state().await.write(&common.state)?;
    }
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.common.log_output, args.common.log_level)?;

    match run(args.common, args.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            match err.downcast_ref::<PoolError>() {
                Some(pool_error) => {
                    error!(kind = %pool_error.kind(), "rejected: {pool_error}")
                }
                None => error!("{err:#}"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
