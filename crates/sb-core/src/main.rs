//! Scene Bundle Core - command-line front end
//!
//! The main entry point for sb-core, handling:
//! - Export of the active collection into a bundle archive
//! - Import of a bundle as a new collection
//! - Inspection of bundle contents
//! - Configuration display
//!
//! Command payloads go to stdout as JSON; logs and progress go to stderr.

use clap::{Args, Parser, Subcommand};
use sb_common::{Error, JsonlWriter, OperationResult, ProgressEmitter, Result};
use sb_config::{load_config, ResolvedConfig, ValidationError};
use sb_core::exit_codes::ExitCode;
use sb_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, Stage,
};
use sb_core::orchestrator::open_bundle;
use sb_core::{
    BundleOrchestrator, BundleWorker, DirectoryHost, ExportRequest, ImportRequest, LocalFs,
    SceneHost,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scene Bundle Core - package and install scene collections
#[derive(Parser)]
#[command(name = "sb-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Directory holding the host's collections and host.json
    #[arg(long, global = true, env = "SB_COLLECTIONS_DIR", default_value = ".")]
    collections_dir: PathBuf,

    /// Path to a config file (overrides SB_CONFIG and XDG lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr: human or jsonl
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Write progress events to stderr as JSON lines
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Package the active collection into a bundle
    Export(ExportArgs),

    /// Install a bundle as a new collection
    Import(ImportArgs),

    /// Print a bundle's manifest and entry list
    Inspect(InspectArgs),

    /// Configuration management
    Config(ConfigArgs),
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct ExportArgs {
    /// Archive to create
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Plugin the collection depends on (repeatable)
    #[arg(long = "plugin")]
    plugins: Vec<String>,

    /// Third-party requirement as name=url (repeatable)
    #[arg(long = "requirement", value_parser = parse_key_value)]
    requirements: Vec<(String, String)>,

    /// Scene selected as an output (repeatable)
    #[arg(long = "scene")]
    scenes: Vec<String>,

    /// Video device description as uuid=text or name=text (repeatable)
    #[arg(long = "label", value_parser = parse_key_value)]
    labels: Vec<(String, String)>,

    /// Stream Deck profile file to ship (repeatable)
    #[arg(long = "stream-deck")]
    stream_deck: Vec<PathBuf>,

    /// Semantic version of the packaged collection
    #[arg(long)]
    bundle_version: Option<String>,

    /// Product id to record instead of a generated UUID
    #[arg(long)]
    bundle_id: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Bundle archive to install
    archive: PathBuf,

    /// Name of the new collection
    #[arg(long)]
    name: String,

    /// Directory to extract assets into (default: <assets_root>/<name>)
    #[arg(long)]
    dest: Option<PathBuf>,

    /// JSON file mapping capture-device uuid to replacement settings
    #[arg(long)]
    device_settings: Option<PathBuf>,

    /// JSON file with settings for every audio capture source
    #[arg(long)]
    audio_settings: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Bundle archive to inspect
    archive: PathBuf,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(
        LogConfig::level_from_flags(cli.global.verbose, cli.global.quiet),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Export(args) => run_export(&cli.global, args),
        Commands::Import(args) => run_import(&cli.global, args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global),
        },
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_export(global: &GlobalOpts, args: &ExportArgs) -> ExitCode {
    let orchestrator = match build_orchestrator(global) {
        Ok(o) => o,
        Err(code) => return code,
    };

    let mut request = ExportRequest::new(&args.output);
    request.required_plugins = args.plugins.clone();
    for (name, url) in &args.requirements {
        request = request.with_requirement(name.clone(), url.clone());
    }
    request.output_scenes = args.scenes.clone();
    request.video_labels = args.labels.iter().cloned().collect();
    request.stream_deck_assets = args.stream_deck.clone();
    request.version = args.bundle_version.clone();
    request.bundle_id = args.bundle_id.clone();

    let result = BundleWorker::spawn_export(orchestrator, request).and_then(BundleWorker::join);
    match result {
        Ok(report) => {
            print_json(&serde_json::json!({
                "status": OperationResult::Success,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "export": report,
            }));
            ExitCode::Success
        }
        Err(e) => output_error(&e),
    }
}

fn run_import(global: &GlobalOpts, args: &ImportArgs) -> ExitCode {
    let mut request = ImportRequest::new(&args.archive, args.name.clone());
    request.destination = args.dest.clone();

    if let Some(path) = &args.device_settings {
        match read_json_file::<BTreeMap<String, Value>>(path) {
            Ok(settings) => request.device_settings = settings,
            Err(e) => return output_error(&e),
        }
    }
    if let Some(path) = &args.audio_settings {
        match read_json_file::<Value>(path) {
            Ok(settings) => request.audio_settings = Some(settings),
            Err(e) => return output_error(&e),
        }
    }

    let orchestrator = match build_orchestrator(global) {
        Ok(o) => o,
        Err(code) => return code,
    };

    let result = BundleWorker::spawn_import(orchestrator, request).and_then(BundleWorker::join);
    match result {
        Ok(report) => {
            print_json(&serde_json::json!({
                "status": OperationResult::Success,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "import": report,
            }));
            ExitCode::Success
        }
        Err(e) => output_error(&e),
    }
}

fn run_inspect(args: &InspectArgs) -> ExitCode {
    let inspect = || -> Result<Value> {
        let mut reader = open_bundle(&args.archive)?;
        let entries = reader.entry_names();
        let manifest = reader.read_manifest()?;
        Ok(serde_json::json!({
            "archive": args.archive.display().to_string(),
            "manifest": manifest,
            "entries": entries,
        }))
    };

    match inspect() {
        Ok(response) => {
            print_json(&response);
            ExitCode::Success
        }
        Err(e) => output_error(&e),
    }
}

/// Display the resolved configuration (including defaults if no file is present).
fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let resolved = match load_resolved(global) {
        Ok(r) => r,
        Err(code) => return code,
    };

    print_json(&serde_json::json!({
        "source": {
            "kind": resolved.source.to_string(),
            "path": resolved.path.as_ref().map(|p| p.display().to_string()),
            "using_defaults": resolved.path.is_none(),
        },
        "config": resolved.config,
    }));
    ExitCode::Success
}

// ============================================================================
// Helpers
// ============================================================================

fn load_resolved(global: &GlobalOpts) -> std::result::Result<ResolvedConfig, ExitCode> {
    let log = LogContext::new(generate_run_id());
    match load_config(global.config.as_deref()) {
        Ok(resolved) => {
            sb_core::log_event!(
                log,
                DEBUG,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "Configuration loaded",
                source = %resolved.source
            );
            Ok(resolved)
        }
        Err(e) => {
            sb_core::log_event!(
                log,
                ERROR,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "Configuration rejected",
                error = %e,
                code = e.code()
            );
            Err(output_config_error(&e))
        }
    }
}

fn build_orchestrator(global: &GlobalOpts) -> std::result::Result<Arc<BundleOrchestrator>, ExitCode> {
    let resolved = load_resolved(global)?;
    let host: Arc<dyn SceneHost> = match DirectoryHost::open(&global.collections_dir) {
        Ok(host) => Arc::new(host),
        Err(e) => return Err(output_error(&e)),
    };

    let mut orchestrator = BundleOrchestrator::new(host, Arc::new(LocalFs), resolved.config);
    if global.progress {
        let stderr: Arc<dyn ProgressEmitter> = Arc::new(JsonlWriter::new(std::io::stderr()));
        orchestrator = orchestrator.with_emitter(stderr);
    }
    Ok(Arc::new(orchestrator))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("failed to serialize output: {}", e),
    }
}

fn output_error(error: &Error) -> ExitCode {
    let exit_code = ExitCode::from(error);
    let response = serde_json::json!({
        "status": OperationResult::from(error),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": {
            "code": error.code(),
            "category": error.category(),
            "headline": error.headline(),
            "message": error.to_string(),
            "recoverable": error.is_recoverable(),
            "exit_code": exit_code.code_name(),
        }
    });
    match serde_json::to_string_pretty(&response) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("{}: {}", error.headline(), error),
    }
    exit_code
}

fn output_config_error(error: &ValidationError) -> ExitCode {
    let exit_code = match error {
        ValidationError::IoError(_) => ExitCode::IoError,
        _ => ExitCode::ArgsError,
    };
    let response = serde_json::json!({
        "status": "error",
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": {
            "code": error.code(),
            "headline": "Configuration Error",
            "message": error.to_string(),
            "exit_code": exit_code.code_name(),
        }
    });
    match serde_json::to_string_pretty(&response) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("Configuration Error: {}", error),
    }
    exit_code
}
