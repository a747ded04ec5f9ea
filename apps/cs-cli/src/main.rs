use clap::{Parser, Subcommand};
use cs_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, describe_bindings,
    extract_series, get_run_summary, list_runs, load_config, load_run, run_with_progress,
};
use cs_results::{RunManifest, RunStatus};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(about = "Co-simulation driver for a lumped building model and a CFD room solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Print parsed bindings and what they resolve to
    Bindings {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Run a co-simulation (Ctrl-C exits at once, also while waiting for the solver)
    Run {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Directory for run directories and the run store (defaults to the config's directory)
        #[arg(long)]
        work_root: Option<PathBuf>,
        /// Use the offline well-mixed surrogate instead of the solver process
        #[arg(long)]
        surrogate: bool,
    },
    /// List stored runs
    Runs {
        /// Work root holding the run store
        work_root: PathBuf,
    },
    /// Show details of a stored run
    ShowRun {
        /// Work root holding the run store
        work_root: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one observable of a stored run as CSV
    ExportSeries {
        /// Work root holding the run store
        work_root: PathBuf,
        /// Run ID
        run_id: String,
        /// Observable name (e.g. room1.T)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Bindings { config_path } => cmd_bindings(&config_path),
        Commands::Run {
            config_path,
            work_root,
            surrogate,
        } => cmd_run(&config_path, work_root, surrogate),
        Commands::Runs { work_root } => cmd_runs(&work_root),
        Commands::ShowRun { work_root, run_id } => cmd_show_run(&work_root, &run_id),
        Commands::ExportSeries {
            work_root,
            run_id,
            variable,
            output,
        } => cmd_export_series(&work_root, &run_id, &variable, output.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            clear_progress_line();
            eprintln!("✗ {}", e.status());
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<ExitCode> {
    println!("Validating configuration: {}", config_path.display());
    let config = load_config(config_path)?;
    println!("✓ Configuration '{}' is valid", config.name);
    Ok(ExitCode::SUCCESS)
}

fn cmd_bindings(config_path: &Path) -> AppResult<ExitCode> {
    let config = load_config(config_path)?;
    let summary = describe_bindings(&config)?;

    println!("model -> field:");
    for row in &summary.model_to_field {
        println!("  {} -> {}  ({})", row.source, row.destination, row.resolved);
    }
    println!("field -> model:");
    for row in &summary.field_to_model {
        println!("  {} -> {}  ({})", row.source, row.destination, row.resolved);
    }
    for dest in &summary.duplicate_destinations {
        println!("! '{}' is bound more than once; the last binding wins", dest);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(config_path: &Path, work_root: Option<PathBuf>, surrogate: bool) -> AppResult<ExitCode> {
    println!("Running co-simulation: {}", config_path.display());

    // no interrupt handler: Ctrl-C takes the default exit, and the solver
    // child in the same process group is interrupted with it
    let request = RunRequest {
        config_path,
        options: RunOptions {
            work_root,
            force_surrogate: surrogate,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let outcome = &response.outcome;
    if outcome.is_finished() {
        println!("✓ Co-simulation finished: {}", response.run_id);
    } else {
        println!("✗ Co-simulation aborted: {}", response.run_id);
        println!("  {}", outcome.status);
    }
    println!("  Run directory: {}", response.run_dir.display());
    println!("  Final time:    {:.3} s", outcome.t_final);
    println!(
        "  Steps: {}  Events: {}  Exchanges: {}",
        outcome.steps, outcome.events, outcome.exchanges
    );
    println!("  Wall time:     {:.3} s", outcome.wall_time_s);

    Ok(if outcome.is_finished() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.driver) {
        (RunStage::Simulating, Some(p)) => {
            let width = 28usize;
            let filled = ((p.fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  phase={}  t={:.3}/{:.3}s  step={}  events={}  exchanges={}  elapsed={:.1}s",
                bar,
                p.fraction * 100.0,
                p.phase,
                p.t,
                p.t_end,
                p.step,
                p.events,
                p.exchanges,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn status_label(manifest: &RunManifest) -> &'static str {
    match manifest.status {
        RunStatus::Finished => "finished",
        RunStatus::Aborted => "aborted",
    }
}

fn cmd_runs(work_root: &Path) -> AppResult<ExitCode> {
    let runs = list_runs(work_root)?;

    if runs.is_empty() {
        println!("No stored runs under: {}", work_root.display());
    } else {
        println!("Stored runs under '{}':", work_root.display());
        for manifest in runs {
            println!(
                "  {} {} [{}] ({})",
                manifest.run_id,
                manifest.name,
                status_label(&manifest),
                manifest.timestamp
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show_run(work_root: &Path, run_id: &str) -> AppResult<ExitCode> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = load_run(work_root, run_id)?;

    println!("\nRun Summary:");
    println!("  Name:       {}", manifest.name);
    println!("  Timestamp:  {}", manifest.timestamp);
    println!("  Run tag:    {}", manifest.run_tag);
    println!("  Status:     {}", status_label(&manifest));
    if let Some(failure) = &manifest.failure {
        println!("  Failure:    {}", failure);
    }
    println!(
        "  Time:       {:.3} of {:.3} s (dt = {:.3} s)",
        manifest.t_final_s, manifest.t_end_s, manifest.dt_s
    );
    println!(
        "  Steps: {}  Events: {}  Exchanges: {}",
        manifest.steps, manifest.events, manifest.exchanges
    );
    println!("  Driver:     {}", manifest.driver_version);

    match get_run_summary(&records) {
        Ok(summary) => {
            println!("  Records:    {}", summary.record_count);
            println!(
                "  Time range: {:.3} - {:.3} s",
                summary.time_range.0, summary.time_range.1
            );
            println!("\nObservables:");
            for name in summary.variables {
                println!("  {}", name);
            }
        }
        Err(_) => println!("  Records:    0"),
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_export_series(
    work_root: &Path,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<ExitCode> {
    let (_manifest, records) = load_run(work_root, run_id)?;
    let series = extract_series(&records, variable)?;

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(ExitCode::SUCCESS)
}
