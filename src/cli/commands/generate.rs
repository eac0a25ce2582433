//! generate command - Import a model, check it, and write a synthetic log

use anyhow::{Context as _, Result};

use crate::cli::{Cli, Context};
use crate::core::verify;
use crate::generator::{EventLog, LogGenerator, SimulationConfig, TraceOutcome};
use crate::io::{JsonModelFormat, ModelImporter};
use crate::ui::output;

/// Resolve simulation settings. Flags override config.
pub fn simulation_config(ctx: &Context, cli: &Cli) -> SimulationConfig {
    let mut config = SimulationConfig::new(cli.traces)
        .with_max_trace_length(
            cli.max_trace_length
                .unwrap_or_else(|| ctx.config.max_trace_length()),
        )
        .with_loop_exit_bias(ctx.config.loop_exit_bias());
    if let Some(seed) = cli.seed.or_else(|| ctx.config.generator_seed()) {
        config = config.with_seed(seed);
    }
    config
}

/// Run the import, check, generate, export pipeline.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `cli` - Parsed arguments
pub fn generate(ctx: &Context, cli: &Cli) -> Result<EventLog> {
    let verbosity = ctx.verbosity;

    output::print(format!("Model: {}", cli.model.display()), verbosity);
    output::print(format!("Log destination: {}", cli.log.display()), verbosity);
    output::print(format!("No. of traces: {}", cli.traces), verbosity);

    output::stage(1, "Importing model", verbosity);
    let importer = JsonModelFormat::new(ctx.config.model_policy());
    let mut process = importer
        .import_model(&cli.model)
        .with_context(|| format!("Failed to import model '{}'", cli.model.display()))?;
    output::stage_done(verbosity);
    output::debug(
        format!("imported '{}': {}", process.name(), process.summary()),
        verbosity,
    );

    output::stage(2, "Model checking", verbosity);
    if let Err(err) = process.check() {
        let report = verify::diagnose(&process);
        output::debug(
            format!(
                "all violations:\n{}",
                output::format_list(&report.errors, "  - ")
            ),
            verbosity,
        );
        return Err(err.into());
    }
    output::stage_done(verbosity);
    output::debug(format!("fingerprint: {}", process.fingerprint()), verbosity);

    output::stage(3, "Generating log", verbosity);
    let mut generator = LogGenerator::new(&process, simulation_config(ctx, cli))?;
    let log = generator.generate_log();
    output::stage_done(verbosity);
    output::debug(format!("seed: {}", generator.seed()), verbosity);

    output::stage(4, "Exporting log", verbosity);
    log.write(&cli.log)
        .with_context(|| format!("Failed to export log to '{}'", cli.log.display()))?;
    output::stage_done(verbosity);

    output::success(
        format!(
            "Wrote {} traces ({} complete, {} truncated, {} deadlocked) with {} events",
            log.traces.len(),
            log.count(TraceOutcome::Complete),
            log.count(TraceOutcome::Truncated),
            log.count(TraceOutcome::Deadlocked),
            log.event_count(),
        ),
        verbosity,
    );

    Ok(log)
}
