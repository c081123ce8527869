// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless physics driver (echo-phys-headless)
//!
//! Builds a ground and a row of breakable boxes over the in-memory doubles,
//! steps it at a fixed frame rate and logs collision events and fractures.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use echo_phys::{BodyConfig, CollisionKind, ConfigService, PhysicsConfig, Vec3};
use echo_phys_config_fs::FsConfigStore;
use echo_phys_dry_tests::SimulationBuilder;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Frames to simulate
    #[clap(short, long, default_value_t = 240)]
    frames: u32,

    /// Number of breakable boxes
    #[clap(short, long, default_value_t = 3)]
    boxes: u32,

    /// Height the boxes start at
    #[clap(short = 'H', long, default_value_t = 6.0)]
    drop_height: f32,

    /// Fracture impulse threshold (overrides the loaded config)
    #[clap(short, long)]
    threshold: Option<f32>,

    /// Directory holding physics.json
    #[clap(short, long)]
    config_dir: Option<PathBuf>,

    /// Frame length in milliseconds
    #[clap(long, default_value_t = 1000.0 / 60.0)]
    frame_ms: f64,

    /// Log every step summary
    #[clap(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<PhysicsConfig> {
    let mut config = match &args.config_dir {
        Some(dir) => {
            let store = FsConfigStore::at(dir)
                .with_context(|| format!("opening config dir {}", dir.display()))?;
            ConfigService::new(store)
                .load_physics()
                .context("loading physics config")?
        }
        None => PhysicsConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.fracture_impulse_threshold = threshold;
    }
    config.validate().context("validating physics config")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = load_config(&args)?;
    info!(
        threshold = config.fracture_impulse_threshold,
        max_depth = config.max_fragment_depth,
        "Starting headless physics run"
    );

    let mut builder = SimulationBuilder::new().with_config(config).with_ground();
    for i in 0..args.boxes {
        #[allow(clippy::cast_precision_loss)]
        let x = (i as f32).mul_add(2.0, -(args.boxes as f32 - 1.0));
        builder = builder.with_box(
            &format!("box-{i}"),
            Vec3::new(x, args.drop_height, 0.0),
            BodyConfig {
                breakable: true,
                ..BodyConfig::default()
            },
        );
    }
    let mut built = builder.build().context("attaching bodies")?;

    built.sim.on_collision(|event| {
        if event.kind != CollisionKind::Colliding {
            info!(
                a = event.a.name.as_deref().unwrap_or("?"),
                b = event.b.name.as_deref().unwrap_or("?"),
                kind = ?event.kind,
                "collision"
            );
        }
    });

    let mut fractures = 0_usize;
    let mut debris = 0_usize;
    for frame in 0..args.frames {
        let report = built.sim.frame(args.frame_ms);
        for id in &report.fractured {
            info!(frame, body = %id, "fractured");
        }
        fractures += report.fractured.len();
        debris += report.spawned.len();
        debug!(
            frame,
            pulled = report.sync.pulled.len(),
            events = report.events.len(),
            "frame"
        );
    }

    info!(
        frames = args.frames,
        fractures,
        debris,
        bodies = built.sim.registry().len(),
        "Run finished"
    );
    Ok(())
}
