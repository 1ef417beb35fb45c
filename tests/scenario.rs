use railyard::app::{RailEvent, Railway};
use railyard::game::config::RailwayConfig;
use railyard::game::grid::Direction;
use railyard::game::layout::Layout;
use railyard::game::placement::Tool;
use railyard::game::track::PieceType;
use railyard::sim::train::{CarKind, EngineKind, Train};

fn railway() -> Railway {
    Railway::new(RailwayConfig::default())
}

fn only_train(railway: &Railway) -> &Train {
    let mut trains = railway.trains().iter();
    let (_, train) = trains.next().expect("one train");
    assert!(trains.next().is_none());
    train
}

fn run(railway: &mut Railway, ticks: usize) {
    for _ in 0..ticks {
        railway.tick(0.1);
    }
}

#[test]
fn three_cell_strip_runs_to_the_end() {
    let mut railway = railway();
    for col in 0..3 {
        railway.apply_tool_str("straight", 0, col).unwrap();
    }
    assert!(railway.apply_tool_str("engine:steam", 0, 0).unwrap());
    let engine = only_train(&railway).engine().pos;
    assert_eq!(engine.travel_dir, Direction::Right);
    railway.set_playing(true);

    run(&mut railway, 10);
    let engine = only_train(&railway).engine().pos;
    assert_eq!(engine.cell(), (0, 1));
    assert!(engine.progress.abs() < 1e-6);

    run(&mut railway, 20);
    let train = only_train(&railway);
    assert!(train.stopped);
    assert_eq!(train.engine().pos.cell(), (0, 2));
    assert_eq!(train.engine().pos.progress, 1.0);
    assert!(railway
        .drain_events()
        .iter()
        .any(|e| matches!(e, RailEvent::TrainStopped(_))));

    run(&mut railway, 10);
    assert_eq!(only_train(&railway).engine().pos.progress, 1.0);
    assert_eq!(only_train(&railway).engine().pos.cell(), (0, 2));
}

#[test]
fn deleting_track_under_engine_removes_the_train() {
    let mut railway = railway();
    for col in 0..6 {
        railway.apply_tool(Tool::Straight, 4, col);
    }
    railway.apply_tool(Tool::Engine(EngineKind::Electric), 4, 3);
    railway.apply_tool(Tool::Car(CarKind::Passenger), 4, 3);
    railway.apply_tool(Tool::Car(CarKind::Freight), 4, 3);
    assert_eq!(only_train(&railway).segments.len(), 3);
    railway.drain_events();

    assert!(railway.apply_tool(Tool::Delete, 4, 3));
    assert!(railway.trains().is_empty());
    let events = railway.drain_events();
    assert!(events.contains(&RailEvent::Removed { row: 4, col: 3 }));
    assert!(events.iter().any(|e| matches!(e, RailEvent::TrainRemoved(_))));
}

#[test]
fn deleting_half_a_crossing_removes_all_of_it() {
    let mut railway = railway();
    for row in 0..5 {
        railway.apply_tool(Tool::Straight, row, 8);
    }
    assert_eq!(railway.grid().piece_at(1, 8), Some(PieceType::StraightV));
    assert!(railway.apply_tool(Tool::Crossing, 2, 8));
    assert_eq!(railway.grid().piece_at(3, 8), Some(PieceType::CrossingV));

    assert!(railway.apply_tool(Tool::Delete, 3, 8));
    assert!(railway.crossings().is_empty());
    assert!(!railway.grid().has_track(2, 8));
    assert!(!railway.grid().has_track(3, 8));
    assert!(railway.grid().has_track(4, 8));
}

#[test]
fn deleting_a_car_cell_keeps_the_engine_running() {
    let mut railway = railway();
    for col in 0..4 {
        railway.apply_tool(Tool::Straight, 0, col);
    }
    railway.apply_tool(Tool::Engine(EngineKind::Diesel), 0, 2);
    railway.apply_tool(Tool::Car(CarKind::Tanker), 0, 2);
    // Removing the car's cell leaves the engine on track
    railway.apply_tool(Tool::Delete, 0, 1);
    assert_eq!(railway.trains().len(), 1);

    railway.set_playing(true);
    run(&mut railway, 30);
    let train = only_train(&railway);
    assert!(train.stopped);
    assert_eq!(train.engine().pos.cell(), (0, 3));
}

#[test]
fn layout_survives_a_file_round_trip() {
    let mut railway = railway();
    for col in 0..6 {
        railway.apply_tool(Tool::Straight, 9, col);
    }
    railway.apply_tool(Tool::Crossing, 9, 2);
    railway.apply_tool(Tool::Tunnel, 9, 5);
    railway.apply_tool(Tool::Engine(EngineKind::Steam), 9, 1);
    railway.apply_tool(Tool::Car(CarKind::Caboose), 9, 1);
    railway.set_playing(true);
    run(&mut railway, 7);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yard.json");
    let layout = railway.export_layout();
    layout.save_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"trackType\": \"crossing-h\""));
    assert!(text.contains("\"engineType\": \"steam\""));
    assert!(text.contains("\"enterDir\": \"right\""));

    let mut restored = Railway::new(RailwayConfig::default());
    restored.load_layout(&Layout::load_json(&path).unwrap());
    assert_eq!(restored.export_layout(), layout);
    assert_eq!(restored.grid().piece_at(9, 3), Some(PieceType::CrossingH));
    assert_eq!(restored.grid().piece_at(9, 5), Some(PieceType::TunnelH));
    assert!(!restored.is_playing());

    let train = only_train(&restored);
    assert_eq!(train.engine().pos.cell(), (9, 1));
    assert_eq!(train.engine().pos.progress, 0.0);
    assert_eq!(train.segments.len(), 2);
}

#[test]
fn crossing_on_a_loop_opens_and_closes_every_lap() {
    let mut railway = railway();
    // 2x4 loop: four corners, a crossing on top, straights below
    let corners = [((0, 0), 3), ((0, 3), 2), ((1, 0), 1), ((1, 3), 0)];
    for ((row, col), clicks) in corners {
        for _ in 0..=clicks {
            railway.apply_tool(Tool::Curve, row, col);
        }
    }
    assert_eq!(railway.grid().piece_at(0, 0), Some(PieceType::CurveBR));
    assert_eq!(railway.grid().piece_at(0, 3), Some(PieceType::CurveBL));
    assert_eq!(railway.grid().piece_at(1, 0), Some(PieceType::CurveTR));
    assert_eq!(railway.grid().piece_at(1, 3), Some(PieceType::CurveTL));
    for col in 1..3 {
        railway.apply_tool(Tool::Straight, 1, col);
    }
    assert!(railway.apply_tool(Tool::Crossing, 0, 1));
    assert_eq!(railway.grid().piece_at(0, 2), Some(PieceType::CrossingH));

    railway.apply_tool(Tool::Engine(EngineKind::Steam), 1, 1);
    railway.drain_events();
    railway.set_playing(true);

    let mut activations = 0;
    let mut deactivations = 0;
    for _ in 0..200 {
        railway.tick(0.1);
        for event in railway.drain_events() {
            match event {
                RailEvent::CrossingActivated(_) => activations += 1,
                RailEvent::CrossingDeactivated(_) => deactivations += 1,
                RailEvent::TrainStopped(_) => panic!("loop train stopped"),
                _ => {}
            }
        }
    }
    // 8 cells per lap at 1 cell/s over 20s
    assert!(activations >= 2);
    assert!(deactivations >= 2);
    assert!(activations - deactivations <= 1);
}
