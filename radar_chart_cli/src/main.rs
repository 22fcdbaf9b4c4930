mod output;
mod prompt;
mod run_paths;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use radar_chart::columns::load_mapping;
use radar_chart::dates::pick_date_column;
use radar_chart::figure::parse_ring_levels;
use radar_chart::percentile::summarize;
use radar_chart::{
    build_histories, detect_mapping, percentiles_from_rows, render_athlete_figure,
    resolve_date_label, resolve_mapping, validate, FieldKey, MetricKey, Params, PartialMapping,
    RadarError, RawTable, RenderedFigure, SessionResult, TableLayout, TieMethod,
};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use output::TaggedOutput;
use run_paths::{sanitize_filename, RunPaths};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMMIT: &str = env!("GIT_COMMIT_HASH");

#[derive(Parser, Debug)]
#[command(author, version, about = "Percentile radar charts for athlete testing exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute percentiles and render radar charts for one or more CSV exports
    Run(RunArgs),
    /// Inspect CSV exports for column mapping, date detection and value ranges
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// CSV exports to process, in session order
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Directory that receives the run folder
    #[arg(long, default_value = "runs", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Run title (defaults to today's date and the first input's name)
    #[arg(long)]
    title: Option<String>,

    /// JSON object mapping field keys to column names
    #[arg(long, value_hint = ValueHint::FilePath)]
    mapping: Option<PathBuf>,

    /// Date label override for one input (repeatable)
    #[arg(long = "date", value_name = "FILE=DATE")]
    dates: Vec<String>,

    /// How equal values share a rank
    #[arg(long, value_enum, default_value_t = TiesOpt::Min)]
    ties: TiesOpt,

    /// Grid ring levels on the 0-100 scale (comma separated)
    #[arg(long, default_value = "0,25,50,75,100")]
    rings: String,

    /// Placement of the comparison table
    #[arg(long, value_enum, default_value_t = LayoutOpt::Below)]
    table_layout: LayoutOpt,

    /// Also export one PNG per athlete
    #[arg(long, action = ArgAction::SetTrue)]
    png: bool,

    /// Prompt on stdin for unresolved column mappings and date labels
    #[arg(long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Skip files that fail instead of aborting the run
    #[arg(long, action = ArgAction::SetTrue)]
    keep_going: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// CSV exports to inspect
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Output report path (`-` for stdout)
    #[arg(short, long, default_value = "inspect_report.txt", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// JSON object mapping field keys to column names
    #[arg(long, value_hint = ValueHint::FilePath)]
    mapping: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TiesOpt {
    Min,
    Average,
}

impl From<TiesOpt> for TieMethod {
    fn from(value: TiesOpt) -> Self {
        match value {
            TiesOpt::Min => TieMethod::Min,
            TiesOpt::Average => TieMethod::Average,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutOpt {
    Below,
    Separate,
}

impl From<LayoutOpt> for TableLayout {
    fn from(value: LayoutOpt) -> Self {
        match value {
            LayoutOpt::Below => TableLayout::Below,
            LayoutOpt::Separate => TableLayout::Separate,
        }
    }
}

fn init_tracing(verbose: bool, log_file: Option<File>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Inspect(args) => {
            init_tracing(args.verbose, None);
            handle_inspect(args)
        }
    }
}

fn build_params(args: &RunArgs) -> Result<Params> {
    let mut params = Params::default();
    params.ties = args.ties.into();
    params.render.ring_levels = parse_ring_levels(&args.rings)?;
    params.render.table_layout = args.table_layout.into();
    params.render.validate()?;
    Ok(params)
}

fn load_mapping_file(path: &Path) -> Result<PartialMapping> {
    let mapping = load_mapping(path)
        .with_context(|| format!("failed to load column mapping {}", path.display()))?;
    if mapping.is_empty() {
        warn!("Column mapping {} had no usable entries", path.display());
    }
    Ok(mapping)
}

/// Parse repeated `FILE=DATE` overrides.
fn parse_date_overrides(values: &[String]) -> Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let (file, date) = value
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --date '{}': expected FILE=DATE", value))?;
        let (file, date) = (file.trim(), date.trim());
        if file.is_empty() || date.is_empty() {
            bail!("invalid --date '{}': expected FILE=DATE", value);
        }
        out.push((file.to_string(), date.to_string()));
    }
    Ok(out)
}

/// An override applies when it names the input by path or by file name.
fn override_matches(file: &str, path: &Path) -> bool {
    let candidate = Path::new(file);
    candidate == path
        || (candidate.file_name().is_some() && candidate.file_name() == path.file_name())
}

fn lookup_override<'a>(overrides: &'a [(String, String)], path: &Path) -> Option<&'a str> {
    overrides
        .iter()
        .find(|(file, _)| override_matches(file, path))
        .map(|(_, date)| date.as_str())
}

fn handle_run(args: RunArgs) -> Result<()> {
    if args.inputs.is_empty() {
        return Err(anyhow!("no input files supplied"));
    }
    let params = build_params(&args)?;

    let default_title = args.inputs[0]
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".into());
    let today = Local::now().date_naive();
    let paths =
        run_paths::create_run_folder(&args.out_dir, args.title.as_deref(), &default_title, today)
            .with_context(|| format!("failed to create run folder in {}", args.out_dir.display()))?;

    let log_path = paths.logs.join("run.log");
    let log_file = File::create(&log_path)
        .with_context(|| format!("failed to create {}", log_path.display()))?;
    init_tracing(args.verbose, Some(log_file));

    info!("Radar Chart Automation v{} ({})", VERSION, COMMIT);
    let selected: Vec<String> = args.inputs.iter().map(|p| p.display().to_string()).collect();
    info!("Selected CSVs: {}", selected.join(", "));
    info!("Tie method: {}", params.ties);

    execute_run(&args, &params, &paths).map_err(|err| {
        error!("Run failed: {:#}", err);
        err
    })
}

fn execute_run(args: &RunArgs, params: &Params, paths: &RunPaths) -> Result<()> {
    let explicit = args.mapping.as_deref().map(load_mapping_file).transpose()?;
    let overrides = parse_date_overrides(&args.dates)?;
    for (file, _) in &overrides {
        if !args.inputs.iter().any(|p| override_matches(file, p)) {
            warn!("Date override for {} matches no input", file);
        }
    }

    for path in &args.inputs {
        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("input {} has no file name", path.display()))?;
        fs::copy(path, paths.raw_input.join(name))
            .with_context(|| format!("failed to copy {}", path.display()))?;
    }

    let t_process = Instant::now();
    let mut sessions: Vec<TaggedOutput> = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let override_label = lookup_override(&overrides, path);
        match process_file(path, explicit.as_ref(), override_label, params, args.interactive) {
            Ok(session) => sessions.push(session),
            Err(err) if args.keep_going => {
                warn!("Skipping {}: {:#}", path.display(), err);
            }
            Err(err) => return Err(err),
        }
    }
    if sessions.is_empty() {
        bail!("no input files could be processed");
    }
    if args.profile || args.verbose {
        info!(
            "Process stage: {:.1} ms ({} files)",
            t_process.elapsed().as_secs_f64() * 1000.0,
            sessions.len()
        );
    }

    let long_path = paths.percentiles.join("percentiles_long.csv");
    let wide_path = paths.percentiles.join("percentiles_wide.csv");
    output::write_long_csv(&sessions, &long_path)?;
    output::write_wide_csv(&sessions, &wide_path)?;
    info!("Wrote percentiles: {}, {}", long_path.display(), wide_path.display());

    let results: Vec<SessionResult> = sessions
        .iter()
        .map(|s| SessionResult {
            date_label: s.date_label.clone(),
            wide: s.output.wide.clone(),
        })
        .collect();
    let histories = build_histories(&results);

    let t_render = Instant::now();
    let figures: Vec<RenderedFigure> = histories
        .par_iter()
        .map(|history| {
            render_athlete_figure(&history.athlete_name, &history.entries, &params.render)
                .with_context(|| format!("failed to render {}", history.athlete_name))
        })
        .collect::<Result<Vec<_>>>()?;
    if args.profile || args.verbose {
        info!(
            "Render stage: {:.1} ms ({} athletes)",
            t_render.elapsed().as_secs_f64() * 1000.0,
            figures.len()
        );
    }

    let doc_path = paths.outputs.join(format!("{}__radars.html", paths.name()));
    output::write_document(&doc_path, &paths.name(), &figures)?;
    info!("Wrote radar document: {}", doc_path.display());

    if args.png {
        let png_dir = paths.outputs.join("png");
        fs::create_dir_all(&png_dir)
            .with_context(|| format!("failed to create {}", png_dir.display()))?;
        figures.par_iter().for_each(|rendered| {
            let path = png_dir.join(format!("{}.png", sanitize_filename(&rendered.athlete_name)));
            match output::render_png_guard(&rendered.figure, &path) {
                Ok(written) => debug!("Wrote PNG: {} ({} files)", path.display(), written.len()),
                Err(err) => warn!("Skipping PNG render ({}): {}", path.display(), err),
            }
        });
        info!("Wrote PNGs: {}", png_dir.display());
    }

    info!("Run complete.");
    info!("Output folder: {}", paths.base.display());
    Ok(())
}

fn process_file(
    path: &Path,
    explicit: Option<&PartialMapping>,
    override_label: Option<&str>,
    params: &Params,
    interactive: bool,
) -> Result<TaggedOutput> {
    let table =
        RawTable::from_path(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mapping = match resolve_mapping(&table.headers, explicit) {
        Ok(mapping) => mapping,
        Err(RadarError::MappingIncomplete {
            missing,
            suggested,
            columns,
        }) if interactive => {
            let keys: Vec<&str> = missing.iter().map(|f| f.key()).collect();
            warn!(
                "Column mapping incomplete for {}: missing {}",
                path.display(),
                keys.join(", ")
            );
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut stderr = io::stderr();
            let chosen = prompt::prompt_mapping(&mut input, &mut stderr, &columns, &suggested)?;
            resolve_mapping(&table.headers, Some(&chosen))
                .with_context(|| format!("cannot map columns of {}", path.display()))?
        }
        Err(err) => {
            return Err(err).with_context(|| format!("cannot map columns of {}", path.display()))
        }
    };
    info!("Column mapping for {}: {}", path.display(), mapping.describe());

    let validated =
        validate(&table, &mapping).with_context(|| format!("invalid data in {}", path.display()))?;

    let date_label = match resolve_date_label(&table, path, override_label) {
        Ok(date) => {
            debug!("Date label source for {}: {}", path.display(), date.source);
            date.label
        }
        Err(RadarError::DateUnresolved { .. }) if interactive => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut stderr = io::stderr();
            prompt::prompt_date_label(&mut input, &mut stderr, &file_name)?
        }
        Err(err) => return Err(err.into()),
    };
    info!("Date label for {}: {}", path.display(), date_label);

    let output = percentiles_from_rows(&validated.rows, params.ties)
        .with_context(|| format!("failed to rank {}", path.display()))?;
    info!("Processed {} athletes for {}", output.wide.len(), date_label);

    Ok(TaggedOutput {
        date_label,
        output,
    })
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let explicit = args.mapping.as_deref().map(load_mapping_file).transpose()?;
    let mut report = String::new();
    for path in &args.inputs {
        let table = RawTable::from_path(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        report.push_str(&inspect_table(&table, path, explicit.as_ref()));
        report.push('\n');
    }

    if args.output.as_os_str() == "-" {
        io::stdout().lock().write_all(report.as_bytes())?;
    } else {
        fs::write(&args.output, report)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!("Inspection report written: {}", args.output.display());
    }
    Ok(())
}

fn inspect_table(table: &RawTable, path: &Path, explicit: Option<&PartialMapping>) -> String {
    let mut report = String::new();
    report.push_str(&format!("FILE: {}\n", path.display()));
    report.push_str(&format!("  rows: {}\n", table.len()));
    report.push_str(&format!("  headers: {}\n", table.headers.join(" | ")));

    let suggested = match explicit {
        Some(mapping) => mapping.clone(),
        None => detect_mapping(&table.headers).mapping,
    };
    report.push_str("  mapping:\n");
    for field in FieldKey::REQUIRED {
        let column = suggested.get(&field).map_or("(unresolved)", String::as_str);
        report.push_str(&format!("    - {}: {}\n", field.key(), column));
    }

    match pick_date_column(&table.headers) {
        Some(col) => report.push_str(&format!("  date_column: {}\n", table.headers[col])),
        None => report.push_str("  date_column: n/a\n"),
    }
    match resolve_date_label(table, path, None) {
        Ok(date) => report.push_str(&format!(
            "  date_label: {} (from {})\n",
            date.label, date.source
        )),
        Err(_) => report.push_str("  date_label: unresolved\n"),
    }

    let mapping = match resolve_mapping(&table.headers, Some(&suggested)) {
        Ok(mapping) => mapping,
        Err(err) => {
            report.push_str(&format!("  status: {err}\n"));
            return report;
        }
    };
    let validated = match validate(table, &mapping) {
        Ok(validated) => validated,
        Err(err) => {
            report.push_str(&format!("  status: {err}\n"));
            return report;
        }
    };
    report.push_str("  status: ok\n");
    if validated.rows.is_empty() {
        return report;
    }
    report.push_str("  metrics:\n");
    for metric in MetricKey::ALL {
        let values: Vec<f64> = validated.rows.iter().map(|r| r.values[metric.index()]).collect();
        if let Ok(summary) = summarize(&values, TieMethod::Min) {
            report.push_str(&format!(
                "    - {}: min={:.3}, max={:.3}, ties={}\n",
                metric.axis_label(),
                summary.min,
                summary.max,
                if summary.has_ties { "yes" } else { "no" }
            ));
        }
    }
    report
}
