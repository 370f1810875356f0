//! CLI for `odata-swagger`.
//!
//! # Subcommands
//!
//! ```text
//! # Build a Swagger 2.0 document from a route table
//! odata-swagger generate \
//!   --routes api/routes.yaml \
//!   --config api/odata-swagger.yaml \
//!   --output api/swagger.json
//!
//! # Print the candidate operations discovered for a route table
//! odata-swagger discover --routes api/routes.yaml
//! ```

#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use odata_swagger::{DocsConfig, ProjectConfig, RouteTable};
use tracing_subscriber::EnvFilter;

/// Swagger 2.0 generator for OData metadata models and controllers.
#[derive(Parser)]
#[command(name = "odata-swagger", version, about)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Build the document and write it to `--output` (or stdout).
    Generate(GenerateArgs),

    /// Print candidate operations without binding or assembly.
    Discover(DiscoverArgs),
}

#[derive(Parser)]
struct GenerateArgs {
    /// Route table file (YAML or JSON, chosen by extension).
    #[arg(short, long)]
    routes: PathBuf,

    /// Path to a project config YAML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the document here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Read `info.version` from this `Cargo.toml`.
    /// Overrides `version` from the config file.
    #[arg(long)]
    cargo_toml: Option<PathBuf>,
}

#[derive(Parser)]
struct DiscoverArgs {
    /// Route table file (YAML or JSON, chosen by extension).
    #[arg(short, long)]
    routes: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => run_generate(&args),
        Command::Discover(args) => run_discover(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let project = match &args.config {
        Some(path) => {
            eprintln!("Loading config: {}", path.display());
            ProjectConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => ProjectConfig::default(),
    };
    let routes = load_routes(&args.routes)?;

    let mut config = DocsConfig::new().with_project_config(&project);
    if let Some(path) = &args.cargo_toml {
        let version = read_cargo_version(path)?;
        let title = project.title.as_deref().unwrap_or("OData API");
        config = config.info(title, &version);
    }

    let provider = config.build(routes);
    let document = provider.generate().context("Failed to generate document")?;
    eprintln!(
        "Generated {} paths, {} definitions",
        document.paths.len(),
        document.definitions.len(),
    );

    let output = match args.format {
        Format::Json => document.to_json(),
        Format::Yaml => document.to_yaml(),
    }
    .context("Failed to serialize document")?;

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("Wrote document to {}", path.display());
        }
        None => println!("{output}"),
    }
    Ok(())
}

fn run_discover(args: &DiscoverArgs) -> anyhow::Result<()> {
    let routes = load_routes(&args.routes)?;
    let provider = DocsConfig::new().build(routes);
    let candidates = provider.discover();

    println!("=== Candidate Operations: {} ===", candidates.len());
    for candidate in &candidates {
        println!();
        println!(
            "[{}] {} {} → {}",
            candidate.source,
            candidate.verb,
            candidate.path,
            candidate.operation_id(),
        );
        for param in &candidate.parameters {
            println!(
                "  {} : {}{}",
                param.name,
                param.ty.full_name(),
                if param.required { "" } else { " (optional)" },
            );
        }
        if let Some(ty) = candidate.response_type() {
            println!("  returns {}", ty.full_name());
        }
    }
    Ok(())
}

/// Load a route table, picking the parser by file extension.
fn load_routes(path: &Path) -> anyhow::Result<RouteTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read routes: {}", path.display()))?;
    parse_routes(&content, path)
}

fn parse_routes(content: &str, path: &Path) -> anyhow::Result<RouteTable> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content)
            .with_context(|| format!("Failed to parse routes: {}", path.display()))
    } else {
        serde_yaml_ng::from_str(content)
            .with_context(|| format!("Failed to parse routes: {}", path.display()))
    }
}

/// Read `version` from a Cargo.toml `[package]` or `[workspace.package]`.
fn read_cargo_version(path: &Path) -> anyhow::Result<String> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let doc: toml::Table =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if let Some(v) = doc
        .get("package")
        .and_then(|p| p.get("version"))
        .and_then(toml::Value::as_str)
    {
        return Ok(v.to_string());
    }

    if let Some(v) = doc
        .get("workspace")
        .and_then(|w| w.get("package"))
        .and_then(|p| p.get("version"))
        .and_then(toml::Value::as_str)
    {
        return Ok(v.to_string());
    }

    bail!("No version found in {}", path.display());
}
