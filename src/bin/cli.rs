// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Facemesh CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use facemesh::engine::{CsgEngine, Instrumented, MetricsRecorder};
use facemesh::{
    export_stl, import_stl_file, BooleanOp, FaceIdAllocator, IslandOptions, Kernel, KernelConfig, MeshBuffer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facemesh")]
#[command(about = "Facemesh - labelled triangle-mesh kernel: inspect, repair and combine STL meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kernel configuration file (defaults to ./facemesh.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print mesh statistics
    Info {
        /// Input STL file
        input: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the repair toolkit and write ASCII STL
    Repair {
        /// Input STL file
        input: PathBuf,

        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,

        /// Weld vertices closer than this before repairing
        #[arg(long)]
        weld: Option<f64>,

        /// Split self-intersecting triangles
        #[arg(long)]
        split: bool,

        /// Remove internal triangles
        #[arg(long, value_enum)]
        internal: Option<InternalMethod>,

        /// Remove islands of at most N triangles (inside or outside the main shell)
        #[arg(long, value_name = "N")]
        islands: Option<usize>,

        /// Flip seam triangles smaller than this area
        #[arg(long, value_name = "AREA")]
        flip_area: Option<f64>,

        /// Decimal places in the output
        #[arg(long, default_value_t = 6)]
        precision: usize,
    },

    /// Combine two STL meshes; faces are labelled by file stem
    Boolean {
        #[arg(value_enum)]
        op: OpArg,

        a: PathBuf,

        b: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Print engine timings as JSON
        #[arg(long)]
        metrics: bool,

        #[arg(long, default_value_t = 6)]
        precision: usize,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum InternalMethod {
    Raycast,
    Winding,
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Union,
    Subtract,
    Intersect,
}

impl From<OpArg> for BooleanOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Union => BooleanOp::Union,
            OpArg::Subtract => BooleanOp::Subtract,
            OpArg::Intersect => BooleanOp::Intersect,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => KernelConfig::from_file(path)?,
        None => KernelConfig::load()?,
    };

    match cli.command {
        Commands::Info { input, json } => info_command(&input, json, config),
        Commands::Repair {
            input,
            output,
            weld,
            split,
            internal,
            islands,
            flip_area,
            precision,
        } => {
            let steps = RepairSteps {
                weld,
                split,
                internal,
                islands,
                flip_area,
            };
            repair_command(&input, &output, &steps, precision, config)
        }
        Commands::Boolean {
            op,
            a,
            b,
            output,
            metrics,
            precision,
        } => boolean_command(op.into(), &a, &b, &output, metrics, precision, config),
        Commands::Version => {
            println!("Facemesh v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path, kernel: &Arc<Kernel>) -> Result<MeshBuffer> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh")
        .to_string();
    let mesh = import_stl_file(path, kernel, &label)
        .with_context(|| format!("failed to read STL file: {}", path.display()))?;
    Ok(mesh.with_feature(label))
}

fn info_command(input: &Path, json: bool, config: KernelConfig) -> Result<()> {
    let kernel = Kernel::with_config(config).shared();
    let mesh = load(input, &kernel)?;
    let stats = mesh.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{} {}", "File:".bold(), input.display().to_string().cyan());
        stats.print();
    }
    Ok(())
}

struct RepairSteps {
    weld: Option<f64>,
    split: bool,
    internal: Option<InternalMethod>,
    islands: Option<usize>,
    flip_area: Option<f64>,
}

fn repair_command(input: &Path, output: &Path, steps: &RepairSteps, precision: usize, config: KernelConfig) -> Result<()> {
    let kernel = Kernel::with_config(config).shared();
    let mut mesh = load(input, &kernel)?;
    let repair = kernel.config().repair.clone();
    let before = mesh.triangle_count();
    let start = Instant::now();

    println!("{} {}", "Repairing:".bold(), input.display().to_string().cyan());
    if let Some(eps) = steps.weld {
        report_step("weld", mesh.weld(eps)?, "vertices merged");
    }
    if steps.split {
        report_step("split", mesh.split_self_intersecting_triangles(), "triangles split");
    }
    match steps.internal {
        Some(InternalMethod::Raycast) => {
            report_step("internal", mesh.remove_internal_triangles_by_raycast(), "triangles removed")
        }
        Some(InternalMethod::Winding) => report_step(
            "internal",
            mesh.remove_internal_triangles_by_winding(repair.winding_offset_scale, repair.winding_crossing_tolerance),
            "triangles removed",
        ),
        None => {}
    }
    if let Some(max_triangles) = steps.islands {
        let options = IslandOptions {
            max_triangles,
            remove_internal: true,
            remove_external: true,
        };
        report_step("islands", mesh.remove_small_islands(options), "triangles removed");
    }
    if let Some(area) = steps.flip_area {
        report_step(
            "flips",
            mesh.remove_tiny_boundary_triangles(area, repair.tiny_max_iterations),
            "edges flipped",
        );
    }
    mesh.fix_windings();
    mesh.enforce_outward();

    export_stl(&mesh, output, &mesh_name(output), precision)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} {} -> {} triangles in {} ({})",
        "✅".green(),
        before,
        mesh.triangle_count(),
        format_duration(start.elapsed()).cyan(),
        output.display()
    );
    Ok(())
}

fn boolean_command(
    op: BooleanOp,
    a: &Path,
    b: &Path,
    output: &Path,
    metrics: bool,
    precision: usize,
    config: KernelConfig,
) -> Result<()> {
    let recorder = MetricsRecorder::new();
    let engine = CsgEngine::new(Arc::new(FaceIdAllocator::new()), config.engine.clone());
    let kernel = Kernel::with_engine(Arc::new(Instrumented::new(engine, recorder.clone())), config).shared();

    let mut mesh_a = load(a, &kernel)?;
    let mut mesh_b = load(b, &kernel)?;
    let start = Instant::now();
    let result = match mesh_a.boolean(&mut mesh_b, op) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{} {}", "❌".red(), format!("{op} failed: {err}").red().bold());
            return Err(err.into());
        }
    };

    export_stl(&result, output, &mesh_name(output), precision)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} {} {} triangles, volume {:.4}, faces [{}] in {}",
        "✅".green(),
        op.to_string().bold(),
        result.triangle_count(),
        result.signed_volume(),
        result.face_names().join(", "),
        format_duration(start.elapsed()).cyan()
    );
    if metrics {
        println!("{}", recorder.to_json());
    }
    Ok(())
}

fn report_step(step: &str, count: usize, what: &str) {
    let count = if count > 0 {
        count.to_string().yellow()
    } else {
        count.to_string().bright_black()
    };
    println!("  {:<10} {} {}", step.bright_black(), count, what);
}

fn mesh_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("facemesh")
        .to_string()
}

fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{ms:.2}ms")
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}
