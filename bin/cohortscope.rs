use std::env;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use cohortscope::{
    analysis,
    presentation::{JsonPresenter, Presenter},
    AnalysisKind, Database, ErrorKind, Report, Settings,
};

const USAGE: &str = "usage: cohortscope <activation|conversion|cohort-revenue> [--config PATH]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Legacy DB_* connection variables may live in a .env file
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let Some(kind) = args.get(1).and_then(|a| AnalysisKind::from_str(a).ok()) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str())
        .unwrap_or("config");

    let settings = match Settings::from_path(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration from {config_path}: {e}");
            return ExitCode::FAILURE;
        },
    };

    let level = LevelFilter::from_str(&settings.logging.level).unwrap_or(LevelFilter::Info);
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialise logger: {e}");
    }

    match run(kind, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} analysis failed: {:#}", kind, e);
            ExitCode::FAILURE
        },
    }
}

async fn run(kind: AnalysisKind, settings: &Settings) -> anyhow::Result<()> {
    let db = match Database::connect(settings.postgres.clone()).await {
        Ok(db) => db,
        Err(e) if e.kind() == ErrorKind::Connection => {
            eprintln!("Failed to establish database connection: {e}");
            return Err(e).context("Database unavailable");
        },
        Err(e) => return Err(e.into()),
    };

    let report = analysis::run(kind, db.source(), settings)
        .await
        .with_context(|| format!("Failed to run {kind} analysis"))?;

    // Release the connection before writing output
    drop(db);

    match &report {
        Report::Ready { chart, skipped } => {
            if !skipped.is_empty() {
                info!("{} units skipped after query errors", skipped.len());
            }
            let mut presenter = JsonPresenter::new(std::io::stdout().lock());
            presenter
                .present(chart)
                .context("Failed to write chart output")?;
        },
        Report::NoData { reason, .. } => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            info!("Nothing to chart: {}", reason);
        },
    }

    Ok(())
}
