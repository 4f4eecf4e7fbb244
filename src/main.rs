use anyhow::{Context, Result};
use chartbind::binding::ChartBinding;
use chartbind::comparison::spec::DateComparisonSpec;
use chartbind::config::EngineConfig;
use chartbind::grouping::group_fields;
use chartbind::parser::parse_binding;
use chartbind::runtime::{run_cycle, CycleContext};
use chartbind::schema::{params_from_json, CsvSchema, ParamValue};
use chartbind::telemetry::init_default_tracing;
use clap::Parser;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "chartbind")]
#[command(
    about = "Resolve a chart binding against a CSV schema and print the runtime form",
    long_about = None
)]
struct Args {
    /// Binding DSL (e.g. 'x(Region) | y(sum(Sales))'), or @path to a JSON binding
    #[arg(short, long)]
    binding: String,

    /// CSV file whose header and sample rows define the live columns
    #[arg(short, long)]
    schema: PathBuf,

    /// JSON object of parameter values
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// JSON date comparison settings
    #[arg(long)]
    compare: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also print the independent query groups
    #[arg(long)]
    groups: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_binding(arg: &str) -> Result<ChartBinding> {
    match arg.strip_prefix('@') {
        Some(path) => read_json(Path::new(path)),
        None => parse_binding(arg).context("Failed to parse binding DSL"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config: EngineConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => EngineConfig::default(),
    };
    init_default_tracing(&config.log_level);

    let mut binding = load_binding(&args.binding)?;

    let schema_file = File::open(&args.schema)
        .with_context(|| format!("Failed to open {}", args.schema.display()))?;
    let schema = CsvSchema::from_reader(schema_file).context("Failed to read CSV schema")?;

    let params: HashMap<String, ParamValue> = match &args.params {
        Some(path) => {
            let value: serde_json::Value = read_json(path)?;
            params_from_json(&value).context("Invalid parameter file")?
        }
        None => HashMap::new(),
    };

    let comparison: Option<DateComparisonSpec> = match &args.compare {
        Some(path) => Some(read_json(path)?),
        None => None,
    };

    // Resolve, infer and compare in one cycle
    let ctx = CycleContext::new(&schema, &params, &config).with_comparison(comparison.as_ref());
    let snapshot = run_cycle(&mut binding, &ctx).context("Failed to resolve binding")?;

    let output = if args.groups {
        serde_json::json!({
            "runtime": snapshot,
            "groups": group_fields(snapshot),
        })
    } else {
        serde_json::to_value(snapshot).context("Failed to serialize runtime snapshot")?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &output).context("Failed to write output")?;
    writeln!(handle).context("Failed to write output")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
