//! Decompensation Dataset Tool
//!
//! Creates the decompensation prediction dataset from a root folder holding
//! `test` and `train` partitions of per-subject directories. Both partitions
//! are always built, `test` first, with the default configuration. Library
//! callers wanting other partitions, thread counts or a summary file use
//! [`PipelineBuilder`] directly.
//!
//! # Output Format
//!
//! - **Timelines**: `<output>/<partition>/<subject>_<episode>_timeseries.csv`
//! - **Manifest**: `<output>/<partition>/listfile.csv` (`stay,period_length,y_true`)
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin create_decompensation -- data/root data/decompensation
//! ```
//!
//! Arguments after the two paths are ignored. Log verbosity follows
//! `RUST_LOG` (default `info`).

use anyhow::Context as _;
use clap::Parser;
use decompensation_builder::{DirectorySource, PipelineBuilder};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "create_decompensation",
    about = "Create data for decompensation prediction task."
)]
struct Args {
    /// Path to root folder containing train and test sets.
    root_path: PathBuf,

    /// Directory where the created data should be stored.
    output_path: PathBuf,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    ignored: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !args.ignored.is_empty() {
        log::warn!("Ignoring unrecognized arguments: {}", args.ignored.join(" "));
    }

    let builder = PipelineBuilder::new().progress(true);
    log::info!("Configuration: {}", builder.summary());

    let dataset = builder.build_dataset()?;
    let source = DirectorySource::new(&args.root_path);
    let outputs = dataset
        .run(&source, &args.output_path)
        .with_context(|| {
            format!(
                "creating decompensation data from {} into {}",
                args.root_path.display(),
                args.output_path.display()
            )
        })?;

    for output in &outputs {
        log::info!(
            "{}: {} samples, {} skipped -> {}",
            output.partition,
            output.accepted_count(),
            output.skipped_count(),
            output.manifest_path.display()
        );
    }
    Ok(())
}
