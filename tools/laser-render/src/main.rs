//! laser-render - renders demo scenes through the galvo simulator.
//!
//! Draws a scene for a number of frames, simulates the mirrors and writes the
//! persistence image to a PNG file. Useful for tuning galvo and renderer
//! parameters without a display.

mod scene;
mod surface;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use laser_emu::{
    ColorHsv, Error, FrameGenerator, GalvoConfig, GalvoSimulator, GeneratorConfig, LaserFrame,
    PersistenceRenderer, RendererConfig, Result, SimFrame, SimWorker,
};

use scene::Scene;
use surface::PngSurface;

#[derive(Parser)]
#[command(
    name = "laser-render",
    about = "Render laser-emu demo scenes through the galvo simulator to PNG"
)]
struct Args {
    /// Scene to draw
    #[arg(value_enum, default_value_t = Scene::Star)]
    scene: Scene,

    /// Output PNG path
    #[arg(short, long, default_value = "laser.png")]
    output: PathBuf,

    /// Image width and height in pixels
    #[arg(long, default_value_t = 800)]
    size: usize,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 1)]
    frames: usize,

    /// Display frame rate used for animation time
    #[arg(long, default_value_t = 30.0)]
    fps: f32,

    /// Energy kept from one frame to the next (0 clears every frame)
    #[arg(long, default_value_t = 0.0)]
    decay: f32,

    /// Hue step per frame in degrees
    #[arg(long, default_value_t = 3.0)]
    hue_step: f32,

    /// Mirror half-range in degrees (shared by generator and simulator)
    #[arg(long, default_value_t = 20.0)]
    max_angle: f32,

    /// Point spacing in drawing units
    #[arg(long, default_value_t = 0.025)]
    spacing: f32,

    /// Spring stiffness
    #[arg(long, default_value_t = 4.0e6)]
    stiffness: f32,

    /// Damping
    #[arg(long, default_value_t = 3200.0)]
    damping: f32,

    /// Maximum angular speed in degrees per second
    #[arg(long, default_value_t = 20_000.0)]
    max_speed: f32,

    /// Beam sigma in pixels
    #[arg(long, default_value_t = 0.8)]
    beam_radius: f32,

    /// Tone mapping exposure
    #[arg(long, default_value_t = 1.0)]
    exposure: f32,

    /// Display gamma
    #[arg(long, default_value_t = 2.2)]
    gamma: f32,

    /// Simulate on a background worker thread
    #[arg(long)]
    threaded: bool,
}

/// Runs the simulation either inline or on a worker.
enum Simulator {
    Inline(GalvoSimulator),
    Threaded(SimWorker),
}

impl Simulator {
    fn simulate(&mut self, frame: LaserFrame) -> Result<SimFrame> {
        match self {
            Simulator::Inline(galvo) => {
                let simulation = galvo.simulate(&frame);
                log::debug!("{} targets -> {:?}", frame.len(), simulation.outcome);
                Ok(simulation.frame)
            }
            Simulator::Threaded(worker) => {
                let before = worker.sequence();
                worker.submit_frame(frame)?;
                while worker.sequence() == before {
                    if !worker.is_alive() {
                        return Err(Error::disconnected("simulation worker died"));
                    }
                    thread::sleep(Duration::from_micros(200));
                }
                worker.update();
                let published = worker
                    .take_frame()
                    .ok_or_else(|| Error::disconnected("published frame missing"))?;
                log::debug!("frame #{} -> {:?}", published.sequence, published.outcome);
                Ok(published.frame.as_ref().clone())
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let gen_config = GeneratorConfig::new(args.max_angle).with_point_spacing(args.spacing);
    let galvo_config = GalvoConfig::new(args.max_angle)
        .with_spring(args.stiffness, args.damping)
        .with_max_speed(args.max_speed);
    let render_config = RendererConfig::default()
        .with_beam_radius(args.beam_radius)
        .with_exposure(args.exposure)
        .with_gamma(args.gamma);

    let mut gen = FrameGenerator::new(gen_config);
    let mut renderer = PersistenceRenderer::new(args.size, args.size, render_config)?;
    let mut simulator = if args.threaded {
        Simulator::Threaded(SimWorker::new(galvo_config))
    } else {
        Simulator::Inline(GalvoSimulator::new(galvo_config))
    };

    let mut color = ColorHsv::new(0.0, 1.0, 1.0);
    let started = Instant::now();
    let mut total_steps = 0usize;

    for index in 0..args.frames {
        let t = index as f32 / args.fps;
        gen.new_frame();
        scene::draw(args.scene, &mut gen, t, color);
        color.add_hue(args.hue_step);

        let laser_frame = gen.take_frame();
        let points = laser_frame.len();
        let sim_frame = simulator.simulate(laser_frame)?;
        total_steps += sim_frame.len();

        if args.decay > 0.0 {
            renderer.decay(args.decay);
        } else {
            renderer.clear();
        }
        renderer.accumulate(&sim_frame);

        log::info!(
            "frame {}/{}: {} points -> {} steps",
            index + 1,
            args.frames,
            points,
            sim_frame.len()
        );
    }

    let mut surface = PngSurface::new(&args.output);
    renderer.present(&mut surface)?;

    log::info!(
        "wrote {} ({} frames, {} simulated steps, {:.1?})",
        args.output.display(),
        args.frames,
        total_steps,
        started.elapsed()
    );
    Ok(())
}
