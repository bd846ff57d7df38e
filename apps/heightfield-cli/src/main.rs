use anyhow::Context;
use clap::{Parser, Subcommand};
use heightfield_common::{TerrainParams, ViewerConfig};
use heightfield_heightmap::{Heightmap, HeightmapKind};
use heightfield_mesh::TerrainMesh;
use heightfield_render::{DebugTextRenderer, RenderView, Renderer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "heightfield-cli", about = "CLI tool for heightmap terrain")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Load a heightmap and report the terrain mesh built from it
    Inspect {
        /// Heightmap image
        path: PathBuf,
        /// Viewer config file (JSON) providing terrain parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Elevation per unit of pixel intensity
        #[arg(long)]
        scale: Option<f32>,
        /// Elevation offset added after scaling
        #[arg(long, allow_hyphen_values = true)]
        shift: Option<f32>,
    },
    /// Write a synthetic heightmap PNG
    Generate {
        /// Output PNG path
        output: PathBuf,
        #[arg(long, default_value = "512")]
        width: u32,
        #[arg(long, default_value = "512")]
        height: u32,
        /// Seed for reproducible output
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// ridges, crater or slope
        #[arg(short, long, default_value = "ridges")]
        kind: HeightmapKind,
    },
    /// Write the default viewer config as JSON
    InitConfig {
        /// Output path
        #[arg(default_value = "heightfield.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("heightfield-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("heightmap: {}", heightfield_heightmap::crate_info());
            println!("mesh: {}", heightfield_mesh::crate_info());
            println!("render: {}", heightfield_render::crate_info());
            let defaults = TerrainParams::default();
            println!(
                "default terrain: scale={} shift={}",
                defaults.scale, defaults.shift
            );
        }
        Commands::Inspect {
            path,
            config,
            scale,
            shift,
        } => {
            let mut params = ViewerConfig::load_or_default(config.as_deref())?.terrain;
            if let Some(scale) = scale {
                params.scale = scale;
            }
            if let Some(shift) = shift {
                params.shift = shift;
            }

            let heightmap = Heightmap::load(&path)
                .with_context(|| format!("loading heightmap {}", path.display()))?;
            let (lo, hi) = heightmap.min_max();
            println!(
                "Heightmap: {} ({}x{}, {} channel(s), intensity {lo:.1}..{hi:.1})",
                path.display(),
                heightmap.width(),
                heightmap.height(),
                heightmap.channels()
            );
            println!("Params: scale={} shift={}", params.scale, params.shift);

            let mesh = TerrainMesh::build(&heightmap, &params);
            let view = RenderView::framing(&mesh);
            print!("{}", DebugTextRenderer::new().render(&mesh, &view));
        }
        Commands::Generate {
            output,
            width,
            height,
            seed,
            kind,
        } => {
            let heightmap = Heightmap::generate(width, height, seed, kind)?;
            heightmap.save_png(&output)?;
            println!(
                "Wrote {kind} heightmap {width}x{height} (seed {seed}) to {}",
                output.display()
            );
        }
        Commands::InitConfig { output } => {
            ViewerConfig::default().save(&output)?;
            println!("Wrote default config to {}", output.display());
        }
    }

    Ok(())
}
