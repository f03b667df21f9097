//! Fibril - batch tracing and tracking of curvilinear features.
//!
//! Usage: `fibril <stack.json> [config.json] [output.json]`
//!
//! Reads a JSON image stack, runs the sequence pipeline and writes the
//! per-frame feature tables, the track table and the lifetime summary as one
//! JSON document (to stdout when no output path is given).

mod report;
mod stack_file;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fibril_pipeline::{PipelineConfig, SequenceProcessor, SequenceStage};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::report::Report;
use crate::stack_file::StackFile;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let Some(stack_path) = args.next().map(PathBuf::from) else {
        bail!("usage: fibril <stack.json> [config.json] [output.json]");
    };
    let config_path = args.next().map(PathBuf::from);
    let output_path = args.next().map(PathBuf::from);

    let config = match &config_path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let stack_file = StackFile::load(&stack_path)
        .with_context(|| format!("Failed to load image stack {}", stack_path.display()))?;
    let (stack, aux) = stack_file.into_stacks().context("Invalid image stack")?;
    info!(
        frames = stack.len(),
        rows = stack.frame_shape().0,
        cols = stack.frame_shape().1,
        aux_fields = aux.len(),
        "Loaded image stack"
    );

    let processor = SequenceProcessor::new(config).context("Invalid pipeline configuration")?;
    let output = processor
        .process_stack_with_progress(&stack, &aux, |p| {
            if p.stage != SequenceStage::Tracking {
                info!(stage = ?p.stage, "Pipeline stage");
            }
        })
        .context("Sequence processing failed")?;

    let report = Report::new(&output);
    let json = serde_json::to_vec_pretty(&report).context("Failed to serialize report")?;
    match &output_path {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
