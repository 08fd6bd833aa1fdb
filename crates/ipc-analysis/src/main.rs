use anyhow::{Context, Result};
use clap::Parser;
use ipc::aggregate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::PathBuf;

mod report;
mod snapshot_loader;

use report::Report;
use snapshot_loader::{load_final_snapshot, ColumnNames};

#[derive(Parser)]
#[command(name = "ipc-analysis")]
#[command(about = "Average per-core IPC from the final snapshot of a statistics file")]
struct Cli {
    #[arg(short = 'f', long, help = "Input Parquet statistics file")]
    filename: PathBuf,

    #[arg(long, default_value = "phase", help = "Column holding the snapshot number")]
    phase_column: String,

    #[arg(long, default_value = "core", help = "Column holding the core index")]
    core_column: String,

    #[arg(long, default_value = "instrs", help = "Column holding instruction counts")]
    instructions_column: String,

    #[arg(long, default_value = "cycles", help = "Column holding cycle counts")]
    cycles_column: String,

    #[arg(short, long, help = "Verbose debug output")]
    verbose: bool,
}

impl Cli {
    fn column_names(&self) -> ColumnNames {
        ColumnNames {
            phase: self.phase_column.clone(),
            core: self.core_column.clone(),
            instructions: self.instructions_column.clone(),
            cycles: self.cycles_column.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Verbose raises the default level, RUST_LOG still wins
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Open the input Parquet file
    let file = File::open(&cli.filename)
        .with_context(|| format!("Failed to open input file: {}", cli.filename.display()))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| "Failed to create Parquet reader builder")?;

    // Extract per-core counters from the last recorded phase
    let snapshot = load_final_snapshot(builder, &cli.column_names())
        .with_context(|| format!("Failed to load {}", cli.filename.display()))?;

    // Compute per-core IPC and average the cores that have one
    let ipc = snapshot.stats.ipc();
    let result = aggregate(&ipc);

    // Print the summary
    let report = Report::new(snapshot.phase, &ipc, result);
    report.log_exclusions();
    println!("{}", report);

    Ok(())
}
