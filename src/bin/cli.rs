// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! nefcore CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use nefcore::ast::{Evaluator, Geometry, Node};
use nefcore::geometry::write_stl;
use nefcore::nef::dump;
use nefcore::KernelConfig;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nefcore")]
#[command(about = "nefcore - exact Nef polyhedron CSG kernel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./nefcore.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a JSON CSG tree
    Eval {
        /// Input tree
        input: PathBuf,

        /// Output file (stdout when omitted; not allowed for stl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Report size and measure of an evaluated tree
    Info {
        /// Input tree
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Boundary mesh with exact coordinates
    Json,
    /// Binary STL
    Stl,
    /// Nef cell dump
    Nef,
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "nefcore=info",
            2 => "nefcore=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Eval {
            input,
            output,
            format,
        } => {
            let config = load_config(cli.config.as_deref())?;
            eval_command(input, output.as_deref(), *format, config, cli.verbose > 0)?;
        }
        Commands::Info { input } => {
            let config = load_config(cli.config.as_deref())?;
            info_command(input, config)?;
        }
        Commands::Version => {
            println!("nefcore v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<KernelConfig> {
    match path {
        Some(path) => {
            let mut config = KernelConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => KernelConfig::load(),
    }
}

fn read_tree(input: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read tree: {}", input.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid CSG tree: {}", input.display()))
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn eval_command(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    config: KernelConfig,
    verbose: bool,
) -> Result<()> {
    let tree = read_tree(input)?;
    let evaluator = Evaluator::with_config(config);

    let start = Instant::now();
    let geometry = evaluator.evaluate(&tree)?;
    if verbose {
        eprintln!("Evaluated in {:.2?}", start.elapsed());
    }

    match format {
        OutputFormat::Nef => {
            let text = match &*geometry {
                Geometry::Polygon(nef) => dump::to_json(nef)?,
                Geometry::Polyhedron(nef) => dump::to_json(nef)?,
                Geometry::Empty => dump::to_json(&nefcore::NefPolyhedron::empty())?,
            };
            let mut out = open_output(output)?;
            writeln!(out, "{text}")?;
        }
        OutputFormat::Json => {
            let mut out = open_output(output)?;
            match &*geometry {
                Geometry::Polygon(_) => {
                    serde_json::to_writer_pretty(&mut out, &evaluator.evaluate_to_polygon(&tree)?)?
                }
                _ => serde_json::to_writer_pretty(&mut out, &evaluator.evaluate_to_mesh(&tree)?)?,
            }
            writeln!(out)?;
        }
        OutputFormat::Stl => {
            let Some(path) = output else {
                bail!("STL output needs --output");
            };
            let mesh = evaluator.evaluate_to_mesh(&tree)?;
            let mut out = open_output(Some(path))?;
            write_stl(&mesh, &mut out)
                .with_context(|| format!("Failed to write STL: {}", path.display()))?;
            out.flush()?;
        }
    }

    if let Some(path) = output {
        eprintln!("{} {} -> {}", "✓".green(), input.display(), path.display());
    }
    Ok(())
}

fn info_command(input: &Path, config: KernelConfig) -> Result<()> {
    let tree = read_tree(input)?;
    let evaluator = Evaluator::with_config(config);

    let start = Instant::now();
    let geometry = match evaluator.evaluate(&tree) {
        Ok(geometry) => geometry,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let complexity = geometry.complexity();
    println!("{}", "═".repeat(60).bright_black());
    println!("{} {}", "Tree:".bold(), input.display().to_string().cyan());
    println!("{}", "═".repeat(60).bright_black());
    println!("  {} {}", "Dimension:".bright_black(), geometry.kind_name().cyan());
    println!("  {} {}", "Cells:".bright_black(), complexity.cells.to_string().cyan());
    println!("  {} {}", "Vertices:".bright_black(), complexity.vertices.to_string().cyan());
    println!("  {} {}", "Facets:".bright_black(), complexity.facets.to_string().cyan());
    match geometry.measure() {
        Some(measure) => println!(
            "  {} {} (≈ {:.6})",
            "Measure:".bright_black(),
            measure.to_string().green(),
            measure.to_f64()
        ),
        None => println!("  {} {}", "Measure:".bright_black(), "unbounded".yellow()),
    }

    let stats = evaluator.cache_stats();
    println!(
        "  {} {} cached, {} hits",
        "Cache:".bright_black(),
        stats.cached_nodes.to_string().cyan(),
        stats.hits.to_string().cyan()
    );
    println!("  {} {:.2?}", "Time:".bright_black(), elapsed);
    println!("{}", "═".repeat(60).bright_black());
    Ok(())
}
