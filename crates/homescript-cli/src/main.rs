// homescript-cli/src/main.rs
// ============================================================================
// Module: HomeScript CLI Entry Point
// Description: Command dispatcher for the automation service.
// Purpose: Serve the HTTP API, validate scripts, and dry-run them locally.
// Dependencies: clap, homescript-{config,core,lang,server,store-sqlite,trigger}
// ============================================================================

//! ## Overview
//! `homescript serve` boots the store, the HTTP surface, and (when live
//! credentials are configured) the event-trigger engine. `homescript check`
//! runs the static validator and `homescript run` executes a script file in
//! dry-run mode, printing the execution report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use homescript_config::HomescriptConfig;
use homescript_core::HaConfig;
use homescript_core::HaTarget;
use homescript_core::HomeAssistantClient;
use homescript_core::RunOptions;
use homescript_core::ScriptRunner;
use homescript_core::ScriptStore;
use homescript_lang::Value;
use homescript_lang::validate;
use homescript_server::AppState;
use homescript_server::RateLimiter;
use homescript_server::StderrAuditSink;
use homescript_server::router;
use homescript_store_sqlite::SqliteStore;
use homescript_trigger::StderrTriggerSink;
use homescript_trigger::TriggerEngine;
use homescript_trigger::TriggerEngineConfig;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// HomeScript automation service.
#[derive(Debug, Parser)]
#[command(name = "homescript", version, about = "Self-hosted HomeScript automation service")]
struct Cli {
    /// Config file path (default: homescript.toml, then environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Subcommand; defaults to `serve`.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API and the event-trigger engine.
    Serve,
    /// Validate a script file and print diagnostics.
    Check {
        /// Script file to validate.
        file: PathBuf,
    },
    /// Execute a script file in dry-run mode.
    Run {
        /// Script file to execute.
        file: PathBuf,
        /// Parameters as `name=value`, repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Print the full execution report as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Parses one `name=value` parameter.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref()).await,
        Command::Check { file } => check(&file),
        Command::Run { file, params, json } => run_file(&file, &params, json).await,
    };
    match result {
        Ok(code) => code,
        Err(message) => {
            let _ = writeln!(std::io::stderr(), "error: {message}");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// SECTION: Serve
// ============================================================================

/// Boots store, runner, HTTP surface, and the trigger engine.
async fn serve(config_path: Option<&std::path::Path>) -> Result<ExitCode, String> {
    let config = HomescriptConfig::load(config_path).map_err(|err| err.to_string())?;

    let store = Arc::new(
        SqliteStore::open(&config.storage.path).map_err(|err| err.to_string())?,
    );
    let scripts: Arc<dyn ScriptStore> = store.clone();

    let (target, ha_client) = if config.home_assistant.is_live() {
        let ha_config = HaConfig {
            base_url: config.home_assistant.url.clone().unwrap_or_default(),
            token: config.home_assistant.token.clone().unwrap_or_default(),
            timeout_ms: config.home_assistant.timeout_ms,
        };
        let client =
            Arc::new(HomeAssistantClient::new(ha_config).map_err(|err| err.to_string())?);
        (HaTarget::Live(Arc::clone(&client)), Some(client))
    } else {
        (HaTarget::Mock, None)
    };
    let runner = Arc::new(ScriptRunner::new(target, Some(Arc::clone(&scripts))));

    // The trigger engine starts only when live credentials are configured.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if config.home_assistant.is_live() {
        let engine_config = TriggerEngineConfig::new(
            config.home_assistant.url.clone().unwrap_or_default(),
            config.home_assistant.token.clone().unwrap_or_default(),
        );
        let engine = TriggerEngine::new(
            engine_config,
            Arc::clone(&scripts),
            Arc::clone(&runner),
            Arc::new(StderrTriggerSink),
        );
        tokio::spawn(engine.run(shutdown_rx));
    }

    let bind: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .map_err(|_| format!("invalid bind address {}:{}", config.server.bind, config.server.port))?;
    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(config.rate_limit.clone()),
        config,
        scripts,
        accounts: store.clone(),
        debug_settings: store.clone(),
        runner,
        ha: ha_client,
        audit: Arc::new(StderrAuditSink),
    });

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| format!("cannot bind {bind}: {err}"))?;
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|err| err.to_string())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// Validates a script file; non-zero exit when diagnostics exist.
fn check(file: &std::path::Path) -> Result<ExitCode, String> {
    let source = fs::read_to_string(file)
        .map_err(|err| format!("cannot read {}: {err}", file.display()))?;
    let diagnostics = validate(&source);
    let mut stdout = std::io::stdout();
    if diagnostics.is_empty() {
        let _ = writeln!(stdout, "{}: no problems found", file.display());
        return Ok(ExitCode::SUCCESS);
    }
    for diagnostic in &diagnostics {
        let _ = writeln!(stdout, "{}:{}: {}", file.display(), diagnostic.line, diagnostic.message);
    }
    Ok(ExitCode::FAILURE)
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Executes a script file in dry-run mode and prints the outcome.
async fn run_file(
    file: &std::path::Path,
    params: &[(String, String)],
    json: bool,
) -> Result<ExitCode, String> {
    let source = fs::read_to_string(file)
        .map_err(|err| format!("cannot read {}: {err}", file.display()))?;
    let values: BTreeMap<String, Value> = params
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let runner = ScriptRunner::new(HaTarget::DryRun, None);
    let options = RunOptions::for_endpoint("local").with_params(values);
    let report = runner.execute(&source, options).await;

    let mut stdout = std::io::stdout();
    if json {
        let rendered =
            serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
        let _ = writeln!(stdout, "{rendered}");
    } else {
        for line in &report.output {
            let _ = writeln!(stdout, "{line}");
        }
        if let Some(error) = &report.error {
            let location = error
                .line
                .map_or_else(String::new, |line| format!(" (line {line})"));
            let _ = writeln!(std::io::stderr(), "error{location}: {}", error.message);
        }
    }
    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
