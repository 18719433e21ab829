use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use overlay_tracker::cli::Cli;
use overlay_tracker::config::OverlayConfig;
use overlay_tracker::core::clock::{FrameClock, SystemClock};
use overlay_tracker::core::timer::{EveryNTicks, FixedHz};
use overlay_tracker::demo::{self, DemoHost};
use overlay_tracker::engine::EngineState;
use overlay_tracker::overlay::{build_draw_ops, DrawOp};
use overlay_tracker::projection::{FrameOutput, FrameParams, ProjectionPipeline};

// === Constants ===

const CAMERA_TURN_SPEED: f32 = 0.25;
/// Frames (as a fraction of the run) during which the camera is unmapped
const OUTAGE_WINDOW: (f32, f32) = (0.45, 0.55);

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OverlayConfig::default(),
    };

    let host = DemoHost::new();
    let engine = Arc::new(EngineState::with_config(
        host.memory(),
        Arc::new(SystemClock::new()),
        &config,
    ));
    host.attach(&engine);

    let stop = Arc::new(AtomicBool::new(false));
    let producers = demo::spawn_producers(
        engine.clone(),
        cli.objects,
        cli.producers,
        config.default_ttl_millis,
        stop.clone(),
    );

    let params = FrameParams::centered(cli.width, cli.height);
    let mut pipeline = ProjectionPipeline::new();
    let mut clock = FrameClock::new();
    let mut pacing = FixedHz::new(cli.hz.max(1.0));
    let mut report = EveryNTicks::new(cli.hz.max(1.0) as u64);
    let outage = (
        (cli.frames as f32 * OUTAGE_WINDOW.0) as u64,
        (cli.frames as f32 * OUTAGE_WINDOW.1) as u64,
    );

    let mut elapsed = 0.0f32;
    let mut frame = 0u64;
    let mut unavailable_frames = 0u64;
    let mut selections = 0u64;

    println!(
        "Overlay tracker - {} objects, {} producers, {} frames at {} Hz",
        cli.objects, cli.producers, cli.frames, cli.hz
    );

    while frame < cli.frames {
        let delta = clock.tick();
        elapsed += delta;
        if !pacing.tick(delta) {
            thread::sleep(Duration::from_secs_f32(pacing.remaining()));
            continue;
        }

        host.set_camera_mapped(!(outage.0..outage.1).contains(&frame));
        if let Err(err) = host.set_camera_yaw(elapsed * CAMERA_TURN_SPEED) {
            debug!("frame {frame}: camera not turned: {err}");
        }

        let output = engine.run_frame(&mut pipeline, &params);
        let ops = build_draw_ops(&output, &config.style);

        match &output {
            FrameOutput::Ready(list) => {
                if list.selected().is_some() {
                    selections += 1;
                }
                if report.tick() {
                    let nearest = list
                        .selected()
                        .map(|m| format!("#{} at {:.0}px / {:.1}m", m.id, m.screen_distance, m.world_distance))
                        .unwrap_or_else(|| "none".to_string());
                    info!(
                        "frame {frame}: {} tracked, {} visible, {} draw ops, nearest {nearest}",
                        list.tracked,
                        list.markers.len(),
                        ops.len()
                    );
                }
            }
            FrameOutput::Unavailable(_) => {
                unavailable_frames += 1;
                if let Some(DrawOp::Status { text }) = ops.first() {
                    debug!("frame {frame}: {text}");
                }
            }
        }

        frame += 1;
    }

    stop.store(true, Ordering::Relaxed);
    let mut updates = 0u64;
    for producer in producers {
        updates += producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }

    println!(
        "Done: {frame} frames, {unavailable_frames} without a view, {selections} with a selection, {updates} object updates, {} objects still tracked",
        engine.tracked_count()
    );

    Ok(())
}
