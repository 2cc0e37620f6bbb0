use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use fc_app::{
    AppError, AppResult, CompileOptions, RunOptions, ScriptEvent, compile_project,
    project_service, run_frames,
};
use fc_controls::LogConfig;
use fc_props::PropertyManager;

#[derive(Parser)]
#[command(name = "fc")]
#[command(about = "Flight control system engine - run channel/component FCS documents", long_about = None)]
struct Cli {
    /// Debug bitmask: 1 startup, 2 instantiation, 4 run entry, 8 runtime state, 16 sanity.
    /// Defaults to FC_DEBUG_LEVEL or 1.
    #[arg(long, global = true)]
    debug_level: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate document syntax, structure and name resolution
    Validate {
        /// Path to the YAML or JSON document
        project_path: PathBuf,
    },
    /// List channels and their components in execution order
    Describe {
        /// Path to the YAML or JSON document
        project_path: PathBuf,
    },
    /// Run frames and print watched properties
    Run {
        /// Path to the YAML or JSON document
        project_path: PathBuf,
        /// Frame period in seconds; 0 runs steady-state frames
        #[arg(long, default_value_t = 1.0 / 120.0)]
        dt: f64,
        /// Number of recorded frames
        #[arg(long, default_value_t = 120)]
        frames: u64,
        /// Trim frames run before recording
        #[arg(long, default_value_t = 0)]
        trim: u64,
        /// Property write, `path=value` or `path=value@frame`
        #[arg(long = "set")]
        sets: Vec<String>,
        /// Property to record every frame
        #[arg(long = "watch")]
        watches: Vec<String>,
        /// Print the record as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let log = cli
        .debug_level
        .map(LogConfig::from_debug_level)
        .unwrap_or_else(LogConfig::from_env);
    init_tracing(log);

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path, log),
        Commands::Describe { project_path } => cmd_describe(&project_path),
        Commands::Run {
            project_path,
            dt,
            frames,
            trim,
            sets,
            watches,
            json,
        } => {
            let events = sets
                .iter()
                .map(|s| ScriptEvent::parse_assignment(s))
                .collect::<AppResult<Vec<_>>>()?;
            let options = RunOptions {
                dt,
                frames,
                trim_frames: trim,
                events,
                watch: watches,
            };
            cmd_run(&project_path, &options, log, json)
        }
    }
}

/// Map the debug bitmask onto a subscriber level.
fn init_tracing(log: LogConfig) {
    let level = if log.runtime_state() || log.run_entry() {
        tracing::Level::TRACE
    } else if log.instantiation() || log.sanity() {
        tracing::Level::DEBUG
    } else if log.startup() {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(project_path: &Path, log: LogConfig) -> AppResult<()> {
    println!("Validating document: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    // resolving every name needs a full compile
    let mut props = PropertyManager::new();
    let options = CompileOptions {
        log,
        ..Default::default()
    };
    let engine = compile_project(&project, &mut props, options)?;
    println!(
        "✓ Document is valid ({} channels, {} properties)",
        engine.channel_count(),
        props.len()
    );
    Ok(())
}

fn cmd_describe(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    println!("{} ({} engines)", project.name, project.engines);
    for channel in project_service::list_channels(&project) {
        let gate = channel
            .gate
            .as_deref()
            .map(|g| format!(" if {g}"))
            .unwrap_or_default();
        println!(
            "  [{}] {} (rate {}){}",
            channel.system, channel.name, channel.rate, gate
        );
        for (name, kind) in &channel.components {
            println!("    {name} : {kind}");
        }
    }
    Ok(())
}

fn cmd_run(project_path: &Path, options: &RunOptions, log: LogConfig, json: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut props = PropertyManager::new();
    let mut engine = compile_project(
        &project,
        &mut props,
        CompileOptions {
            dt: options.dt,
            log,
        },
    )?;
    let record = run_frames(&mut engine, &mut props, options)?;
    if json {
        let text = serde_json::to_string_pretty(&record)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize record: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", record.to_delimited(","));
    }
    tracing::info!(frames = engine.frames(), "run complete");
    Ok(())
}
