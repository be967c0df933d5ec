//! Galvanometer laser projector emulator.
//!
//! This crate turns vector drawings into what a galvo laser projector would
//! actually show, in three stages:
//!
//! 1. [`FrameGenerator`] converts drawing calls (lines, arcs, point lists) into
//!    the ordered [`LaserFrame`] a laser DAC would play back, with adaptive
//!    subdivision, corner braking and flat-screen distortion pre-correction.
//! 2. [`GalvoSimulator`] tracks that point stream with a spring-damper mirror
//!    model limited by speed and mechanical range, producing the [`SimFrame`]
//!    the beam really traced. [`SimWorker`] runs it on a background thread.
//! 3. [`PersistenceRenderer`] deposits the trajectory into an energy buffer and
//!    tone-maps it into an image, the way the eye integrates a scanned beam.
//!
//! ```
//! use laser_emu::{
//!     FrameGenerator, GalvoSimulator, LaserColor, PersistenceRenderer, Point2D,
//!     RendererConfig, ShapeBuilder,
//! };
//!
//! let mut gen = FrameGenerator::default();
//! ShapeBuilder::new(&mut gen).square(Point2D::ZERO, 1.0, LaserColor::solid(120.0, 1.0, 1.0));
//!
//! let mut galvo = GalvoSimulator::default();
//! let simulation = galvo.simulate(gen.frame());
//!
//! let mut renderer = PersistenceRenderer::new(256, 256, RendererConfig::default())?;
//! renderer.accumulate(&simulation.frame);
//! let image = renderer.tonemap();
//! assert_eq!(image.dimensions(), (256, 256));
//! # Ok::<(), laser_emu::Error>(())
//! ```
//!
//! # Coordinate System
//!
//! Drawing coordinates and simulated beam positions are normalized:
//! - X: -1.0 (left) to 1.0 (right)
//! - Y: -1.0 (bottom) to 1.0 (top)
//!
//! Device points use signed 16-bit coordinates (±32767) and 8-bit color.
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configuration and point types.

pub mod color;
pub mod distortion;
pub mod easing;
mod error;
pub mod galvo;
pub mod generator;
pub mod geometry;
pub mod persistence;
pub mod shapes;
pub mod types;
pub mod worker;

// Error types
pub use error::{Error, Result};

// Points and frames
pub use types::{LaserFrame, LaserPoint, PointFlags, SimFrame, SimPoint};

// Drawing
pub use color::{ColorHsv, LaserColor, Rgb8};
pub use distortion::RadialDistortion;
pub use easing::{CornerTail, Easing, PointSharpness};
pub use generator::{ArcDirection, FrameGenerator, GeneratorConfig, LaserState};
pub use geometry::{Point2D, Transform2D};
pub use shapes::{FourBarLinkage, ShapeBuilder};

// Simulation
pub use galvo::{GalvoConfig, GalvoSimulator, GalvoState, SimOutcome, Simulation};
pub use worker::{PublishedFrame, SimWorker, WorkerStats, WorkerStatus};

// Rendering
pub use persistence::{render_frame, DisplaySurface, PersistenceRenderer, RendererConfig};
