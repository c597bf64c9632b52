//! fanreduce CLI: reduce stdin lines in parallel, one result per output line.

use clap::{Parser, Subcommand};
use fanreduce::config::{Config, EngineConfig, EngineOverrides};
use fanreduce::engine::{Engine, ResultStream};
use fanreduce::model::{Outcome, RunReport};
use fanreduce::reducer::{from_fn, try_from_fn};
use fanreduce::telemetry::{TelemetryConfig, init_telemetry};
use std::fmt::Display;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "fanreduce", about = "Reduce input lines on a fixed worker pool")]
struct Cli {
    /// Number of workers (fixed for the run)
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Input queue capacity; 0 = rendezvous
    #[arg(long, global = true)]
    input_capacity: Option<usize>,
    /// Output queue capacity; 0 = rendezvous
    #[arg(long, global = true)]
    output_capacity: Option<usize>,
    /// TOML file with an [engine] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the run report as JSON on stderr
    #[arg(long, global = true)]
    report: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit lines containing a substring
    Grep {
        /// Substring to look for
        needle: String,
    },
    /// Emit the byte length of each line longer than --min
    Length {
        #[arg(long, default_value_t = 1)]
        min: usize,
    },
    /// Parse each line as a JSON object and emit one field
    Field {
        /// Top-level field name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "fanreduce".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let engine = Engine::new(engine_config(&cli, config.engine)?)?;
    let stdin = std::io::stdin();

    let report = match cli.command {
        Command::Grep { needle } => {
            let stream = engine.start_from_reader(
                stdin,
                from_fn(move |line: String| line.contains(&needle).then_some(line)),
            )?;
            drain(stream).await?
        }
        Command::Length { min } => {
            let stream = engine.start_from_reader(
                stdin,
                from_fn(move |line: String| (line.len() > min).then_some(line.len())),
            )?;
            drain(stream).await?
        }
        Command::Field { name } => {
            let stream = engine.start_from_reader(
                stdin,
                try_from_fn(move |line: String| {
                    let value: serde_json::Value = serde_json::from_str(&line)?;
                    Ok::<_, serde_json::Error>(value.get(&name).map(render_json))
                }),
            )?;
            drain(stream).await?
        }
    };

    if cli.report {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Flags override the config file, which overrides the environment. Each
/// layer replaces only the keys it sets; `Engine::new` validates the result.
fn engine_config(cli: &Cli, from_env: EngineConfig) -> anyhow::Result<EngineConfig> {
    let mut engine = from_env;
    if let Some(ref path) = cli.config {
        engine = engine.merge(EngineOverrides::load(path)?);
    }
    Ok(engine.merge(EngineOverrides {
        workers: cli.workers,
        input_capacity: cli.input_capacity,
        output_capacity: cli.output_capacity,
    }))
}

/// Write every result to stdout until the run ends. Ctrl-C cancels the run.
async fn drain<R>(mut stream: ResultStream<R>) -> anyhow::Result<RunReport>
where
    R: Display + Send + 'static,
{
    let cancel = stream.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling run");
            cancel.cancel();
        }
    });

    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<RunReport> {
        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for outcome in stream.by_ref() {
            match outcome {
                Outcome::Value(v) => writeln!(out, "{v}")?,
                Outcome::Fault(fault) => eprintln!("fault: {fault}"),
            }
        }
        out.flush()?;
        drop(out);
        Ok(stream.finish()?)
    })
    .await??;

    ctrl_c.abort();
    Ok(report)
}

fn render_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
