//! Mobile Search Sync
//!
//! Signs in to the API, reads a reference user's mobile inbox search and
//! pushes it to every member of a group.

use clap::Parser;
use mobile_search_sync::api::{ApiClient, SessionToken};
use mobile_search_sync::config::Config;
use mobile_search_sync::console;
use mobile_search_sync::db::{QueryExecutor, SqlStore};
use mobile_search_sync::error::{AppError, EXIT_FAILURE};
use mobile_search_sync::logging;
use mobile_search_sync::propagate::{PropagationRequest, Propagator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Push a mobile inbox default search to every member of a group
#[derive(Parser, Debug)]
#[command(name = "mobile-search-sync", version, about)]
struct Cli {
    /// Config file (defaults to $MOBILE_SEARCH_CONFIG, then ./config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// EmployeeSID of the user whose mobile inbox is copied
    #[arg(long)]
    employee_sid: Option<i64>,

    /// Keyword of the group whose members are updated
    #[arg(long)]
    group: Option<String>,

    /// Skip the confirmation prompts
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.clone());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(EXIT_FAILURE);
    }
    tracing::debug!("Configuration loaded from {}: {:?}", config_path.display(), config);

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            info!("\n Review log file {}", config.logging.file.display());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, config);

    let token = match propagator.authenticate().await {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            if !cli.yes {
                console::acknowledge("Hit enter to quit...")?;
            }
            return Err(e);
        }
    };

    info!(
        "You signed into {} as {}",
        config.api.site, config.credentials.username
    );
    if !cli.yes && !console::confirm_continue()? {
        info!("Cancelled, nothing was updated");
        return Ok(());
    }

    let request = read_request(cli)?;
    propagate(&mut propagator, config, &token, &request).await
}

fn read_request(cli: &Cli) -> Result<PropagationRequest, AppError> {
    let reference_employee_sid = match cli.employee_sid {
        Some(sid) => sid,
        None => console::prompt_employee_sid()?,
    };
    let group_keyword = match cli.group.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => keyword.to_string(),
        _ => console::prompt_group_keyword()?,
    };
    Ok(PropagationRequest {
        reference_employee_sid,
        group_keyword,
    })
}

async fn propagate(
    propagator: &mut Propagator<ApiClient>,
    config: &Config,
    token: &SessionToken,
    request: &PropagationRequest,
) -> Result<(), AppError> {
    let url = config
        .database
        .connection_url()
        .inspect_err(|e| error!("{}", e))?;
    let mut store = SqlStore::connect(&url)
        .await
        .inspect_err(|e| error!("{}", e))?;

    // The driver logs its own abort
    let result = propagator.propagate(&mut store, token, request).await;
    store.close().await;
    result.map(|_| ())
}
