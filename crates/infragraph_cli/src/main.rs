//! infragraph CLI
//!
//! Compiles infrastructure descriptions into ordered execution levels and
//! checks node definitions.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use console::style;
use infragraph_plan::{Compiler, CompilerConfig, CompilerOutput};
use infragraph_schema::{check_node_definitions, CheckerRegistry, KeysChecker, SectionCategory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "infragraph")]
#[command(about = "infragraph - infrastructure dependency compiler", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an infrastructure description
    Compile {
        /// Path to the description (YAML or JSON)
        #[arg(short, long)]
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Reject descriptions with more nodes (0 = no limit)
        #[arg(long, default_value_t = 0)]
        max_nodes: usize,
    },
    /// Check a node definition document
    CheckNodes {
        /// Path to the node definitions (YAML or JSON)
        #[arg(short, long)]
        file: PathBuf,
        /// Accept a section type without deep checks, as `category=type`
        #[arg(long = "accept", value_parser = parse_accept)]
        accept: Vec<(SectionCategory, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Topological levels, one per line
    Text,
    /// Full compiled description as JSON
    Json,
    /// Full compiled description as YAML
    Yaml,
}

fn init_logging(verbose: bool, json: bool) {
    let default = if verbose {
        "infragraph=debug"
    } else {
        "infragraph=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_accept(s: &str) -> Result<(SectionCategory, String), String> {
    let (category, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("expected category=type, got {:?}", s))?;
    let category = SectionCategory::from_key(category)
        .ok_or_else(|| format!("unknown section category {:?}", category))?;
    if kind.is_empty() {
        return Err("section type must not be empty".to_string());
    }
    Ok((category, kind.to_string()))
}

/// Checkers available to `check-nodes`
fn registry(accept: &[(SectionCategory, String)]) -> Result<CheckerRegistry> {
    let mut registry = CheckerRegistry::new();
    registry.register(Arc::new(
        KeysChecker::new(SectionCategory::HealthCheck, "basic")
            .with_allowed(["ping", "ports", "urls", "mysqldbs", "timeout"]),
    ))?;
    for (category, kind) in accept {
        if !registry.contains(*category, kind) {
            registry.register(Arc::new(KeysChecker::new(*category, kind.clone())))?;
        }
    }
    Ok(registry)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn compile_file(path: &Path, max_nodes: usize) -> Result<CompilerOutput> {
    tracing::debug!(path = %path.display(), max_nodes, "compiling description");
    let compiler = Compiler::with_config(CompilerConfig::new().with_max_nodes(max_nodes));
    compiler
        .compile(read(path)?)
        .wrap_err_with(|| format!("failed to compile {}", path.display()))
}

fn check_nodes_file(path: &Path, accept: &[(SectionCategory, String)]) -> Result<usize> {
    let defs: serde_json::Value = serde_yaml::from_str(&read(path)?)
        .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), accepted = accept.len(), "checking node definitions");
    check_node_definitions(&defs, &registry(accept)?)
        .wrap_err_with(|| format!("invalid node definitions in {}", path.display()))?;
    Ok(defs.as_object().map_or(0, |m| m.len()))
}

fn render(output: &CompilerOutput, format: Format) -> Result<String> {
    Ok(match format {
        Format::Text => output.description.topological_order.to_string(),
        Format::Json => serde_json::to_string_pretty(&output.description)?,
        Format::Yaml => serde_yaml::to_string(&output.description)?,
    })
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Compile {
            file,
            format,
            max_nodes,
        } => {
            let output = compile_file(&file, max_nodes)?;
            for warning in &output.warnings {
                eprintln!("{} {}", style("warning:").yellow().bold(), warning);
            }
            println!("{}", render(&output, format)?);
            Ok(())
        }
        Commands::CheckNodes { file, accept } => {
            let count = check_nodes_file(&file, &accept)?;
            println!(
                "{} {} node definition(s) valid",
                style("ok:").green().bold(),
                count
            );
            Ok(())
        }
    }
}
