//! End-to-end tests: drawing -> laser frame -> galvo trajectory -> image.

use std::thread;
use std::time::{Duration, Instant};

use laser_emu::{
    FrameGenerator, GalvoConfig, GalvoSimulator, GeneratorConfig, LaserColor, LaserState,
    PersistenceRenderer, Point2D, PointSharpness, RendererConfig, ShapeBuilder, SimWorker,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn white() -> LaserColor {
    LaserColor::solid(0.0, 0.0, 1.0)
}

fn renderer(size: usize) -> PersistenceRenderer {
    match PersistenceRenderer::new(size, size, RendererConfig::default()) {
        Ok(r) => r,
        Err(e) => panic!("failed to create renderer: {}", e),
    }
}

/// Sum of the red channel in a square window around a pixel.
fn window_energy(r: &PersistenceRenderer, cx: f32, cy: f32, half: i64) -> f32 {
    let mut sum = 0.0;
    for dy in -half..=half {
        for dx in -half..=half {
            let x = cx as i64 + dx;
            let y = cy as i64 + dy;
            if x < 0 || y < 0 {
                continue;
            }
            if let Some(e) = r.energy_at(x as usize, y as usize) {
                sum += e[0];
            }
        }
    }
    sum
}

#[test]
fn test_settled_beam_lands_where_it_was_drawn() {
    init_logging();
    let gen_config = GeneratorConfig::new(25.0);
    let galvo_config = GalvoConfig::new(25.0).with_tolerance(0.001);

    for &(x, y) in &[(0.5, 0.0), (-0.3, 0.6), (0.7, -0.7), (0.0, 0.0)] {
        let target = Point2D::new(x, y);
        let mut gen = FrameGenerator::new(gen_config);
        gen.draw_shape(&[target], white());

        let mut galvo = GalvoSimulator::new(galvo_config);
        let simulation = galvo.simulate(gen.frame());
        assert!(simulation.outcome.is_completed());

        let expected = target * gen_config.max_extent;
        let (sx, sy) = galvo.screen_position();
        let landed = Point2D::new(sx, sy);
        assert!(
            (landed - expected).length() < 1e-3,
            "drawn {:?}, expected {:?}, landed {:?}",
            target,
            expected,
            landed
        );
    }
}

#[test]
fn test_square_renders_with_bright_corners_and_dark_center() {
    init_logging();
    let mut gen = FrameGenerator::default();
    ShapeBuilder::new(&mut gen).square(Point2D::ZERO, 1.0, white());

    let mut galvo = GalvoSimulator::default();
    let simulation = galvo.simulate(gen.frame());
    assert!(simulation.outcome.is_completed(), "{:?}", simulation.outcome);
    assert!(simulation.frame.len() > gen.frame().len());

    let mut r = renderer(200);
    r.accumulate(&simulation.frame);

    let extent = gen.config().max_extent * 0.5;
    let (ccx, ccy) = r.norm_to_pixel(0.0, 0.0);
    assert_eq!(window_energy(&r, ccx, ccy, 5), 0.0, "center must stay dark");

    let (kx, ky) = r.norm_to_pixel(extent, extent);
    let (ex, ey) = r.norm_to_pixel(0.0, extent);
    let corner = window_energy(&r, kx, ky, 3);
    let edge = window_energy(&r, ex, ey, 3);
    assert!(edge > 0.0, "edge should be lit");
    assert!(
        corner > edge,
        "dwelling corner ({}) should outshine the edge ({})",
        corner,
        edge
    );
}

#[test]
fn test_blanked_travel_leaves_no_trail() {
    init_logging();
    let mut gen = FrameGenerator::default();
    gen.blank_to(Point2D::new(-0.9, 0.0));
    gen.line_to(
        Point2D::new(-0.9, 0.0),
        LaserState::On,
        PointSharpness::Sharp,
        white(),
    );
    gen.blank_to(Point2D::new(0.9, 0.0));
    gen.line_to(
        Point2D::new(0.9, 0.0),
        LaserState::On,
        PointSharpness::Sharp,
        white(),
    );

    let simulation = GalvoSimulator::default().simulate(gen.frame());
    let mut r = renderer(200);
    r.accumulate(&simulation.frame);

    let extent = gen.config().max_extent;
    let (mx, my) = r.norm_to_pixel(0.0, 0.0);
    let (lx, ly) = r.norm_to_pixel(-0.9 * extent, 0.0);
    assert_eq!(window_energy(&r, mx, my, 4), 0.0);
    assert!(window_energy(&r, lx, ly, 4) > 0.0, "dot at the left end should be lit");

    let image = r.tonemap();
    assert_eq!(image.get_pixel(mx as u32, my as u32).0, [0, 0, 0, 255]);
}

#[test]
fn test_worker_publishes_renderable_frames() {
    init_logging();
    let mut gen = FrameGenerator::default();
    ShapeBuilder::new(&mut gen).circle(Point2D::ZERO, 0.5, white());

    let worker = SimWorker::new(GalvoConfig::default());
    if let Err(e) = worker.submit_frame(gen.take_frame()) {
        panic!("submit failed: {}", e);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while worker.sequence() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let Some(published) = worker.latest_frame() else {
        panic!("no frame published");
    };
    assert!(published.outcome.is_completed());

    let mut r = renderer(128);
    r.accumulate(&published.frame);
    assert!(r.total_energy() > 0.0);
}
