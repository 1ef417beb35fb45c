use std::path::PathBuf;
use std::time::{Duration, Instant};

use railyard::app::{RailEvent, Railway};
use railyard::game::config::RailwayConfig;
use railyard::game::grid::Direction;
use railyard::game::layout::{CrossingEntry, Layout, TrackEntry, TrainEntry};
use railyard::game::track::PieceType;
use railyard::sim::tick::FrameClock;
use railyard::sim::train::{CarKind, EngineKind};

const USAGE: &str = "usage: railyard [layout.json | --resume] [--seconds N]";
const FRAME_RATE: f64 = 60.0;

struct Args {
    layout: Option<PathBuf>,
    /// Start from the autosave slot when no layout path is given.
    resume: bool,
    seconds: f64,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        layout: None,
        resume: false,
        seconds: 20.0,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seconds" => {
                let value = args.next().ok_or("--seconds needs a value")?;
                parsed.seconds = value
                    .parse()
                    .ok()
                    .filter(|s: &f64| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| format!("bad --seconds value: {value}"))?;
            }
            "--resume" => parsed.resume = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
            path if parsed.layout.is_none() => parsed.layout = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    if parsed.resume && parsed.layout.is_some() {
        return Err("--resume and a layout path are exclusive".to_string());
    }
    Ok(parsed)
}

/// The layout to start from: the given file, the autosave slot, or the demo.
fn starting_layout(args: &Args) -> railyard::error::Result<Layout> {
    if let Some(path) = &args.layout {
        return Layout::load_json(path);
    }
    if args.resume {
        match Layout::restore_autosave() {
            Some(layout) => return Ok(layout),
            None => log::warn!("No autosave to resume, starting the demo loop"),
        }
    }
    Ok(demo_layout())
}

/// A loop around rows 2..=7 and columns 2..=11 with a level crossing on the
/// top run, a tunnel on the bottom run and a steam train with three cars.
fn demo_layout() -> Layout {
    let (top, bottom, left, right) = (2, 7, 2, 11);
    let mut tracks = vec![
        TrackEntry { row: top, col: left, track_type: PieceType::CurveBR },
        TrackEntry { row: top, col: right, track_type: PieceType::CurveBL },
        TrackEntry { row: bottom, col: left, track_type: PieceType::CurveTR },
        TrackEntry { row: bottom, col: right, track_type: PieceType::CurveTL },
    ];
    for col in left + 1..right {
        if col != 5 && col != 6 {
            tracks.push(TrackEntry { row: top, col, track_type: PieceType::StraightH });
        }
        let piece = if col == 8 { PieceType::TunnelH } else { PieceType::StraightH };
        tracks.push(TrackEntry { row: bottom, col, track_type: piece });
    }
    for row in top + 1..bottom {
        tracks.push(TrackEntry { row, col: left, track_type: PieceType::StraightV });
        tracks.push(TrackEntry { row, col: right, track_type: PieceType::StraightV });
    }

    Layout {
        tracks,
        trains: vec![TrainEntry {
            row: top,
            col: 3,
            engine_type: EngineKind::Steam,
            dir: Direction::Right,
            enter_dir: Direction::Right,
            cars: vec![CarKind::Passenger, CarKind::Coal, CarKind::Caboose],
        }],
        crossings: vec![CrossingEntry { row: top, col: 5, horizontal: true }],
    }
}

fn log_trains(railway: &Railway, seconds: f64) {
    for (id, train) in railway.trains().iter() {
        let engine = train.engine();
        log::info!(
            "t={seconds:.1}s train {id:?} at ({}, {}) heading {} progress {:.2}{}",
            engine.pos.row,
            engine.pos.col,
            engine.pos.travel_dir.arrow_char(),
            engine.pos.progress,
            if train.stopped { " [stopped]" } else { "" }
        );
    }
}

fn log_event(railway: &Railway, event: RailEvent) {
    match event {
        RailEvent::CrossingActivated(id) | RailEvent::CrossingDeactivated(id) => {
            if let Some(c) = railway.crossings().get(id) {
                log::info!("crossing at ({}, {}) active={}", c.row, c.col, c.active);
            }
        }
        other => log::debug!("{other:?}"),
    }
}

fn main() {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = RailwayConfig::load();
    let layout = match starting_layout(&args) {
        Ok(layout) => layout,
        Err(e) => {
            log::error!("Failed to load layout: {e}");
            std::process::exit(1);
        }
    };

    let log_ticks = config.debug.log_ticks;
    let mut clock = FrameClock::new(config.sim.max_frame_dt);
    let mut railway = Railway::new(config);
    railway.load_layout(&layout);
    railway.set_playing(true);

    // Frames are stamped on a synthetic 60 Hz timeline so a run is
    // reproducible regardless of host speed.
    let start = Instant::now();
    let frames = (args.seconds * FRAME_RATE).round() as u64;
    for frame in 0..=frames {
        let now = start + Duration::from_secs_f64(frame as f64 / FRAME_RATE);
        if let Some(dt) = clock.begin_frame(now) {
            railway.tick(dt);
            if log_ticks {
                log::debug!("frame {} dt {dt:.4}", clock.frame);
            }
        }
        for event in railway.drain_events() {
            log_event(&railway, event);
        }
        if frame % FRAME_RATE as u64 == 0 {
            log_trains(&railway, frame as f64 / FRAME_RATE);
        }
    }

    railway.export_layout().autosave();
}
