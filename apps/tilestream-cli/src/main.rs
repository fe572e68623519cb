use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec3;
use tracing_subscriber::EnvFilter;

use tilestream_assets::{BuildingModels, BuildingVariant, FloorTextures, GLTF_LOAD, TEXTURE_LOAD};
use tilestream_bus::EventBus;
use tilestream_render::{RenderView, SceneRecorder};
use tilestream_stream::{
    OrthoCamera, StreamConfig, TileStreamer, TopDownControls, UpdateWindow, detect_visible_edges,
};
use tilestream_tile::{FlexRowWrap, SimplexField, Tile};

#[derive(Parser)]
#[command(name = "tilestream-cli", about = "Headless driver for the tile streamer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML stream config; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON building model manifest; the built-in set is used when omitted
    #[arg(short, long, global = true)]
    models: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective config as YAML
    Config,
    /// Generate one tile and summarize its content
    Tile {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        z: f64,
        /// Override the config seed
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Let the idle auto-pan drive the camera and report streaming activity
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "3600")]
        frames: usize,
        /// Frame length in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Zoom steps before starting; negative zooms out
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        zoom: i32,
        /// Override the config seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print the final scene
        #[arg(long)]
        frame: bool,
    },
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> anyhow::Result<StreamConfig> {
    let mut config = match path {
        Some(path) => StreamConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => StreamConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    Ok(config)
}

fn load_models(path: Option<&Path>) -> anyhow::Result<BuildingModels> {
    match path {
        Some(path) => BuildingModels::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(BuildingModels::builtin()),
    }
}

fn describe_tile(tile: &Tile, config: &StreamConfig) {
    println!(
        "Tile {} at ({:.1}, {:.1}), size {:.1}",
        tile.id().short(),
        tile.position().x,
        tile.position().z,
        tile.size()
    );
    println!(
        "Blocks: {} ({} frustumable), houses: {}",
        tile.blocks().len(),
        tile.frustumable().len(),
        tile.variants().count()
    );

    let mut histogram: BTreeMap<BuildingVariant, usize> = BTreeMap::new();
    for variant in tile.variants() {
        *histogram.entry(variant).or_default() += 1;
    }
    println!("Variants:");
    for (variant, count) in &histogram {
        println!("  {:<8} {count}", variant.to_string());
    }

    // Tallest story count per block, one row per grid row.
    println!("Tallest building per block:");
    let n = config.tile.num_house_blocks;
    for row in tile.blocks().chunks(n) {
        let line: Vec<String> = row
            .iter()
            .map(|block| {
                let tallest = block.houses.iter().map(|h| h.variant.stories()).max().unwrap_or(0);
                match block.edge {
                    Some(_) => format!("{tallest}*"),
                    None => format!("{tallest} "),
                }
            })
            .collect();
        println!("  {}", line.join(" "));
    }

    let camera = OrthoCamera::new(config.camera.clone());
    let edges = detect_visible_edges(tile, &camera.frustum());
    println!("Edges visible from the default camera: {edges:?}");
}

fn simulate(
    config: StreamConfig,
    models: BuildingModels,
    frames: usize,
    frame_dt: Duration,
    zoom: i32,
    show_frame: bool,
) -> anyhow::Result<()> {
    let mut bus = EventBus::new();
    let mut controls = TopDownControls::new(OrthoCamera::new(config.camera.clone()), config.controls.clone());
    controls.connect(&mut bus)?;
    let mut streamer = TileStreamer::new(config, SceneRecorder::new(), &mut bus)?;

    bus.publisher(TEXTURE_LOAD)?.emit(FloorTextures::default())?;
    bus.publisher(GLTF_LOAD)?.emit(models)?;
    streamer.update(&mut bus)?;
    println!("Phase: {:?}, live tiles: {}", streamer.phase(), streamer.tile_count());

    for _ in 0..zoom.unsigned_abs() {
        controls.wheel(if zoom > 0 { -1.0 } else { 1.0 })?;
    }
    controls.camera().broadcast()?;
    streamer.update(&mut bus)?;

    let mut window = UpdateWindow::new(frames);
    let (mut spawned, mut disposed) = (0, 0);
    for frame in 1..=frames {
        controls.tick(frame_dt)?;
        let stats = streamer.update(&mut bus)?;
        window.record(&stats);
        spawned += stats.tiles_spawned;
        disposed += stats.tiles_disposed;
        if stats.tiles_spawned > 0 || stats.tiles_disposed > 0 {
            let target = controls.camera().target();
            tracing::info!(
                frame,
                target_x = target.x,
                target_z = target.z,
                spawned = stats.tiles_spawned,
                disposed = stats.tiles_disposed,
                live = stats.live_tiles,
                "tiles changed"
            );
        }
    }

    let camera = controls.camera();
    println!(
        "After {frames} frames ({:?}): pan {:?}, camera target ({:.1}, {:.1}), live tiles {}, spawned {spawned}, disposed {disposed}",
        frame_dt * frames as u32,
        controls.state(),
        camera.target().x,
        camera.target().z,
        streamer.tile_count()
    );
    println!(
        "Update time: avg {:?}, min {:?}, max {:?}; busiest recent update spawned {} and disposed {}",
        window.average(),
        window.min(),
        window.max(),
        window.peak_spawned(),
        window.peak_disposed()
    );

    if show_frame {
        let view = RenderView {
            eye: camera.position(),
            target: camera.target(),
            zoom: camera.zoom(),
        };
        print!("{}", streamer.renderer().frame(&view));
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tilestream-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", tilestream_assets::crate_info());
            println!("tile: {}", tilestream_tile::crate_info());
            println!("stream: {}", tilestream_stream::crate_info());
            println!("render: {}", tilestream_render::crate_info());
            println!("tile size: {}", StreamConfig::default().tile.size());
        }
        Commands::Config => {
            let config = load_config(cli.config.as_deref(), None)?;
            print!("{}", config.to_yaml()?);
        }
        Commands::Tile { x, z, seed } => {
            let config = load_config(cli.config.as_deref(), seed)?;
            let models = load_models(cli.models.as_deref())?;
            let tile = Tile::generate(
                DVec3::new(x, 0.0, z),
                &config.tile,
                &models,
                &FloorTextures::default(),
                &SimplexField::new(config.seed),
                &FlexRowWrap,
            )?;
            describe_tile(&tile, &config);
        }
        Commands::Simulate {
            frames,
            frame_ms,
            zoom,
            seed,
            frame,
        } => {
            let config = load_config(cli.config.as_deref(), seed)?;
            let models = load_models(cli.models.as_deref())?;
            println!(
                "Simulating {frames} frames of {frame_ms} ms with seed {} and tile size {}",
                config.seed,
                config.tile.size()
            );
            simulate(config, models, frames, Duration::from_millis(frame_ms), zoom, frame)?;
        }
    }

    Ok(())
}
