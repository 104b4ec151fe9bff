//! resource-sync CLI entrypoint.
//!
//! This is the main entrypoint for the resource-sync command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use resource_sync::cli::{Cli, Commands, OutputFormatter};
use resource_sync::config::{find_config_file, ConfigParser, ConfigValidator, SyncConfig};
use resource_sync::error::Result;
use resource_sync::metrics::{PrometheusMetrics, SharedMetrics};
use resource_sync::payload::PayloadBuilder;
use resource_sync::reconciler::Reconciler;
use resource_sync::registrar::InstanceRegistrar;
use resource_sync::registry::{build_http_client, RegistryClient};
use resource_sync::resolver::Resolver;
use resource_sync::sync::{ResourceSummary, SyncPass};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let metrics = Arc::new(PrometheusMetrics::new(prometheus::Registry::new())?);
    let shared: SharedMetrics = metrics.clone();
    let config_path = cli.config.as_ref();

    let result = match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Check => cmd_check(config_path, shared, &formatter).await,
        Commands::Resolve => cmd_resolve(config_path, shared, &formatter).await,
        Commands::Reconcile => cmd_reconcile(config_path, shared, &formatter).await,
        Commands::Sync { yes } => cmd_sync(config_path, yes, shared, &formatter).await,
    };

    if cli.metrics {
        eprintln!("{}", metrics.render()?);
    }

    result
}

/// Write a template configuration.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing resource-sync configuration in: {}", path.display());

    let config_path = path.join("resource-sync.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/resource-sync.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# resource-sync credentials")?;
            writeln!(file, ".env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nConfiguration initialized!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your registry credentials");
    eprintln!("  2. Edit resource-sync.yaml with your deployment and resources");
    eprintln!("  3. Run 'resource-sync validate' to check your configuration");
    eprintln!("  4. Run 'resource-sync resolve' to see what the registry returns");
    eprintln!("  5. Run 'resource-sync sync' to register the deployment");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let validator = ConfigValidator::new();
    let result = validator.check(&config);
    eprintln!("{}", formatter.format_validation(&config, &result, show_warnings));

    validator.validate(&config).map(|_| ())
}

/// Check environment and application presence.
async fn cmd_check(
    config_path: Option<&PathBuf>,
    metrics: SharedMetrics,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let client = create_registry_client(&config, metrics)?;

    let registrar = InstanceRegistrar::new(&client);
    registrar
        .check_environment(&config.deployment.environment)
        .await?;
    registrar
        .check_application(&config.deployment.application)
        .await?;

    eprintln!(
        "{}",
        formatter.format_check(&config.deployment.application, &config.deployment.environment)
    );
    Ok(())
}

/// Resolve used resources.
async fn cmd_resolve(
    config_path: Option<&PathBuf>,
    metrics: SharedMetrics,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let client = create_registry_client(&config, metrics.clone())?;

    let resources = Resolver::new(&client)
        .with_metrics(metrics)
        .resolve(&config.resources.used, &config.scope())
        .await?;

    let summaries: Vec<ResourceSummary> = resources.iter().map(ResourceSummary::from).collect();
    eprintln!("{}", formatter.format_resources(&summaries));
    Ok(())
}

/// Reconcile exposed resources.
async fn cmd_reconcile(
    config_path: Option<&PathBuf>,
    metrics: SharedMetrics,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let client = create_registry_client(&config, metrics.clone())?;

    let reconciled = Reconciler::new(&client)
        .with_payload_builder(
            PayloadBuilder::new().with_wsdl_repository(&config.registry.wsdl_repository),
        )
        .with_metrics(metrics)
        .reconcile_detailed(
            &config.resources.exposed,
            &config.deployment.hostname,
            &config.scope(),
        )
        .await?;

    eprintln!("{}", formatter.format_reconciled(&reconciled));
    Ok(())
}

/// Run a full sync pass.
async fn cmd_sync(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    metrics: SharedMetrics,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;

    if !auto_approve {
        eprint!(
            "Register {}:{} in {}? [y/N]: ",
            config.deployment.application,
            config.deployment.version,
            config.deployment.environment
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Sync cancelled.");
            return Ok(());
        }
    }

    let client = create_registry_client(&config, metrics.clone())?;
    let report = SyncPass::new(&client, &config)
        .with_metrics(metrics)
        .run()
        .await?;

    eprintln!("{}", formatter.format_report(&report));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser that loads `.env` from the configuration's directory.
fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<SyncConfig> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Creates the registry client for a configuration.
fn create_registry_client(config: &SyncConfig, metrics: SharedMetrics) -> Result<RegistryClient> {
    let credentials = ConfigParser::credentials()?;
    let http = build_http_client(config.registry.timeout_secs)?;
    Ok(RegistryClient::new(&config.registry.url, credentials, http).with_metrics(metrics))
}
