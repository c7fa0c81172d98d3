//! rowxml binary - one full pipeline run
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin rowxml -- --rows 10 --parallel
//! ```
//!
//! ## Environment Variables
//!
//! - ROWXML_DB_PATH - SQLite database path (default: data/rowxml.db)
//! - ROWXML_ROW_COUNT - Number of rows to seed (default: 10, overridden by --rows)
//! - ROWXML_SOURCE_DOC - Pre-transform document (default: data/1.xml)
//! - ROWXML_TRANSFORMED_DOC - Post-transform document (default: data/2.xml)
//! - ROWXML_RULESET_PATH - Transform rule set (default: config/ruleset.json)
//! - ROWXML_FIELD_QUERY - Tree-query path (default: //entries/entry/@field)
//! - ROWXML_PARALLEL_AGGREGATORS - Run aggregators concurrently (default: false, forced by --parallel)
//! - ROWXML_REPORT_PATH - Run report JSON (default: data/run_report.json)
//! - RUST_LOG - Logging level (optional, default: info)

use rowxml::row_source::SqliteRowSource;
use rowxml::{PipelineConfig, PipelineRunner};
use std::env;
use std::process::ExitCode;

/// Apply `--rows N` and `--parallel` on top of the environment config
fn parse_args(
    mut args: impl Iterator<Item = String>,
    config: &mut PipelineConfig,
) -> Result<(), String> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rows" => {
                let raw = args.next().ok_or("--rows needs a value")?;
                config.row_count = raw
                    .parse()
                    .map_err(|_| format!("--rows expects a non-negative integer, got {:?}", raw))?;
            }
            "--parallel" => config.parallel_aggregators = true,
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut config = PipelineConfig::from_env();
    if let Err(e) = parse_args(env::args().skip(1), &mut config) {
        log::error!("❌ {}", e);
        eprintln!("usage: rowxml [--rows N] [--parallel]");
        return ExitCode::from(2);
    }

    log::info!("📊 Configuration:");
    log::info!("   DB: {}", config.db_path.display());
    log::info!("   Rows: {}", config.row_count);
    log::info!("   Rule set: {}", config.ruleset_path.display());
    log::info!("   Parallel aggregators: {}", config.parallel_aggregators);

    let source = match SqliteRowSource::open(&config.db_path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut runner = match PipelineRunner::new(config, source) {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("❌ Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(report) => {
            println!("Streaming sum: {}", report.streaming_sum);
            println!("Tree-query sum: {}", report.query_sum);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
