use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, warn};

use skurename::auth::load_access_token;
use skurename::cli::Args;
use skurename::config::{IdentifierSettings, RunConfig, StorageSettings};
use skurename::error::AppError;
use skurename::identifier::{IdentifierStore, JsonIdentifierStore, MySqlIdentifierStore};
use skurename::journal::OutcomeLogs;
use skurename::logging;
use skurename::output::{display_summary, LogLocations};
use skurename::progress::{Progress, ProgressReporter};
use skurename::reconcile::{ReconciliationCounters, Reconciler};
use skurename::retry::RetryExecutor;
use skurename::shutdown::install_signal_handler;
use skurename::storage::{DriveConfig, FileStorage, GoogleDriveStorage, LocalStorage};

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(args.verbose);

    if let Err(e) = run(args).await {
        error!("{}", e);
        eprintln!("\nError: {}", e.detailed_message());
        std::process::exit(e.exit_code().into());
    }
}

enum Identifiers {
    Mapping(JsonIdentifierStore),
    Database(MySqlIdentifierStore),
}

impl Identifiers {
    async fn open(settings: &IdentifierSettings) -> Result<Self, AppError> {
        match settings {
            IdentifierSettings::Mapping(path) => {
                let store = JsonIdentifierStore::load(path)?;
                if store.is_empty() {
                    warn!("Mapping {:?} is empty, every image will be logged as not found", path);
                }
                Ok(Identifiers::Mapping(store))
            }
            IdentifierSettings::Database(db) => {
                Ok(Identifiers::Database(MySqlIdentifierStore::connect(db).await?))
            }
        }
    }

    fn store(&self) -> &dyn IdentifierStore {
        match self {
            Identifiers::Mapping(store) => store,
            Identifiers::Database(store) => store,
        }
    }

    async fn close(&self) {
        if let Identifiers::Database(store) = self {
            store.close().await;
        }
    }
}

fn open_storage(settings: &StorageSettings) -> Result<Box<dyn FileStorage>, AppError> {
    match settings {
        StorageSettings::Drive { token_file } => {
            let token = load_access_token(token_file)?;
            Ok(Box::new(GoogleDriveStorage::new(DriveConfig::new(token))?))
        }
        StorageSettings::Local { base } => {
            debug!("Using local storage at {:?}", base);
            Ok(Box::new(LocalStorage::new(base.clone())))
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = RunConfig::from_args(&args)?;
    debug!(
        storage = ?config.storage,
        page_size = config.page_size,
        max_retries = config.max_retries,
        "Configuration loaded"
    );

    let cancel = install_signal_handler();

    let storage = open_storage(&config.storage)?;
    let identifiers = Identifiers::open(&config.identifiers).await?;
    let logs = OutcomeLogs::open(&config.not_found_log_path, &config.rename_log_path).await?;

    let counters = Arc::new(ReconciliationCounters::new());
    let retry = RetryExecutor::new(config.retry_policy(), counters.clone(), cancel.clone());

    let reconciler = Reconciler::new(
        storage.as_ref(),
        identifiers.store(),
        &logs,
        counters.clone(),
        retry,
        config.reconcile_options(),
    )
    .with_progress(Progress::new())
    .with_cancellation(cancel.clone());

    let reporter = ProgressReporter::spawn(
        counters.clone(),
        config.report_interval(),
        Progress::new(),
        cancel.child_token(),
    );

    info!(
        root = %config.root_folder_name,
        dry_run = config.dry_run,
        "Starting reconciliation"
    );

    let outcome = async {
        let root = reconciler.resolve_root(&config.root_folder_name).await?;
        reconciler.run(root).await
    }
    .await;

    reporter.stop().await;
    let closed = logs.close().await;
    identifiers.close().await;

    let report = outcome?;
    closed?;

    let locations = LogLocations {
        not_found: logs.not_found.path(),
        renamed: logs.renamed.path(),
    };
    display_summary(&report, &locations, &mut std::io::stdout())
        .map_err(|e| AppError::Other(format!("Failed to display output: {}", e)))?;

    Ok(())
}
