//! datadist - distributor set CLI
//!
//! Validates distributor sets and serves single actions to stdout.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use oxigraph::io::RdfFormat;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use datadist_core::{
    AllowAll, CancelToken, DistributorConfig, DistributorContext, DistributorSetConfig, Graph, ModelAccess,
    RequestContext,
};

#[derive(Parser)]
#[command(name = "datadist")]
#[command(version)]
#[command(about = "Drill-down data distribution over RDF models", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a distributor set file or directory
    Validate(ConfigArgs),
    /// List the actions a distributor set serves
    List(ConfigArgs),
    /// Serve one action and write the response to stdout
    Run(RunArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Distributor set file, or a directory of *.yaml files
    #[arg(long, short = 'c')]
    config: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Action name to serve
    #[arg(long, short = 'a')]
    action: String,

    /// Request parameter, repeatable (name=value)
    #[arg(long = "param", short = 'p', value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Request model loaded from an RDF file, repeatable (name=path)
    #[arg(long = "model", short = 'm', value_parser = parse_pair)]
    models: Vec<(String, String)>,

    /// Override the set's homeDirectory
    #[arg(long)]
    home: Option<PathBuf>,

    /// Abandon the request after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if cli.quiet {
        "datadist_core=error"
    } else {
        match cli.verbose {
            0 => "datadist_core=warn",
            1 => "datadist_core=debug",
            _ => "datadist_core=trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match &cli.command {
        Commands::Validate(args) => handle_validate(args),
        Commands::List(args) => handle_list(args),
        Commands::Run(args) => handle_run(args),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(args: &ConfigArgs) -> Result<DistributorSetConfig> {
    DistributorSetConfig::load_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))
}

fn handle_validate(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    eprintln!(
        "{} {} ({} model builder(s), {} distributor(s))",
        "✓".green(),
        args.config.display(),
        config.model_builders.len(),
        config.distributors.len()
    );
    Ok(())
}

fn handle_list(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    if config.distributors.is_empty() {
        println!("No distributors found.");
        return Ok(());
    }

    println!("\n{:<32} {:<20} {:<24} {:<24}", "ACTION", "TYPE", "CONTENT TYPE", "MODEL BUILDER");
    println!("{}", "-".repeat(100));
    for distributor in &config.distributors {
        let builder = match distributor {
            DistributorConfig::RdfGraph { model_builder, .. }
            | DistributorConfig::SelectFromGraph { model_builder, .. } => model_builder.as_str(),
            DistributorConfig::PatternMatchingFile { .. } => "-",
        };
        println!(
            "{:<32} {:<20} {:<24} {:<24}",
            distributor.action_name(),
            distributor.kind_name(),
            distributor.content_type(),
            builder
        );
    }
    println!("\nTotal: {} action(s)", config.distributors.len());
    Ok(())
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let registry = config.into_registry(args.home.clone())?;

    let mut models = ModelAccess::new();
    for (name, path) in &args.models {
        models.insert(name.clone(), load_model(Path::new(path))?);
    }

    let cancel = match args.timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };

    let mut request = RequestContext::new(Arc::new(models), Arc::new(AllowAll)).with_cancel_token(cancel);
    for (name, value) in &args.params {
        request = request.with_parameter(name.clone(), value.clone());
    }
    let context: Arc<dyn DistributorContext> = Arc::new(request);

    let stdout = io::stdout();
    let mut output = stdout.lock();
    let content_type = registry.serve(&args.action, context, &mut output)?;
    output.flush()?;

    eprintln!("{} {} ({})", "✓".green(), args.action, content_type);
    Ok(())
}

fn load_model(path: &Path) -> Result<Graph> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(RdfFormat::from_extension)
        .ok_or_else(|| anyhow!("cannot tell the RDF format of {}", path.display()))?;
    if format.supports_datasets() {
        bail!("{} holds a dataset; only graph formats can be request models", path.display());
    }

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Graph::from_reader(format, BufReader::new(file)).with_context(|| format!("failed to parse {}", path.display()))
}
