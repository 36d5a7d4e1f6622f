use std::io::Write;

use hexsite::{
    config::{ConfigLoader, ModelConfig},
    engine::{Engine, PassTrigger},
    filter::{self, Constraint, Operator, Threshold},
    grid::{synthetic::SyntheticRegion, FarmType, InfraKind, UNREACHED},
    objective::FishModel,
    snapshot::SnapshotWriter,
};

fn region() -> SyntheticRegion {
    SyntheticRegion::new(12, 12, 21)
}

fn build_engine(region: &SyntheticRegion) -> Engine {
    let config = ModelConfig::builtin().unwrap();
    Engine::new(
        region.build().unwrap(),
        config.parameter_set().unwrap(),
        FishModel::new(),
        config.engine_settings(),
    )
    .unwrap()
}

fn distances(engine: &Engine) -> Vec<(f64, f64)> {
    engine
        .snapshot()
        .grid()
        .cells()
        .map(|c| (c.distances().grid_dist, c.distances().road_dist))
        .collect()
}

#[test]
fn drawing_a_grid_line_seeds_and_spreads_distance() {
    let region = region();
    let mut engine = build_engine(&region);
    let (id, summary) = engine
        .draw_line(InfraKind::Grid, vec![region.centre(6, 0), region.centre(6, 11)])
        .unwrap();

    assert_eq!(summary.trigger, PassTrigger::Draw);
    assert_eq!(summary.line, Some(id));
    assert!(summary.seeds >= 12);
    assert_eq!(summary.pass, 2);

    let snapshot = engine.snapshot();
    let grid = snapshot.grid();
    assert_eq!(grid.distance(region.cell_id(6, 5), InfraKind::Grid), 0.0);
    assert_eq!(grid.distance(region.cell_id(7, 5), InfraKind::Grid), 10.0);
    assert!(grid.cells().all(|c| c.distances().grid_dist.is_finite()));
    assert_eq!(engine.line(id).unwrap().kind, InfraKind::Grid);
}

#[test]
fn parameter_change_leaves_distances_alone() {
    let region = region();
    let mut engine = build_engine(&region);
    engine
        .draw_line(InfraKind::Grid, vec![region.centre(3, 2), region.centre(9, 8)])
        .unwrap();
    let before = distances(&engine);
    let revenue_before: f64 = engine.snapshot().grid().cells().map(|c| c.derived().revenue).sum();

    let summary = engine.set_param("fish_price", 9000.0).unwrap();
    assert_eq!(summary.trigger, PassTrigger::Parameters);
    assert_eq!(summary.updated, 0);
    assert_eq!(distances(&engine), before);

    let revenue_after: f64 = engine.snapshot().grid().cells().map(|c| c.derived().revenue).sum();
    assert!(revenue_before > 0.0);
    assert!((revenue_after - revenue_before * 1.5).abs() < revenue_before * 1e-9);
}

#[test]
fn raising_min_precip_shuts_down_dry_cells() {
    let region = region();
    let mut engine = build_engine(&region);
    engine.set_param("min_precip", 1000.0).unwrap();

    let snapshot = engine.snapshot();
    let mut dry = 0;
    for cell in snapshot.grid().cells() {
        if cell.static_attrs().precip < 1000.0 {
            dry += 1;
            assert_eq!(cell.derived().fish_output, 0.0);
            assert_eq!(cell.derived().profit, 0.0);
            assert_eq!(cell.derived().tech, FarmType::None);
        }
    }
    assert!(dry > 0);
}

#[test]
fn identical_inputs_give_identical_snapshots() {
    let region = region();
    let run = || {
        let mut engine = build_engine(&region);
        engine
            .draw_line(InfraKind::Road, vec![region.centre(11, 0), region.centre(4, 7)])
            .unwrap();
        engine
            .draw_line(InfraKind::Grid, vec![region.centre(0, 11), region.centre(11, 11)])
            .unwrap();
        engine.set_param("wage", 900.0).unwrap();
        engine.snapshot().to_geojson().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn deleting_the_last_line_resets_to_unreached() {
    let region = region();
    let mut engine = build_engine(&region);
    let (id, _) = engine
        .draw_line(InfraKind::Grid, vec![region.centre(5, 5)])
        .unwrap();
    let summary = engine.delete_line(id).unwrap();
    assert_eq!(summary.trigger, PassTrigger::Delete);
    assert!(engine.line(id).is_none());
    assert!(engine
        .snapshot()
        .grid()
        .cells()
        .all(|c| c.distances().grid_dist == UNREACHED));
}

#[test]
fn deleting_one_line_keeps_the_others() {
    let region = region();
    let mut engine = build_engine(&region);
    let (west, _) = engine
        .draw_line(InfraKind::Grid, vec![region.centre(0, 0), region.centre(11, 0)])
        .unwrap();
    engine
        .draw_line(InfraKind::Grid, vec![region.centre(0, 11), region.centre(11, 11)])
        .unwrap();
    engine.delete_line(west).unwrap();

    let snapshot = engine.snapshot();
    let grid = snapshot.grid();
    assert_eq!(grid.distance(region.cell_id(4, 11), InfraKind::Grid), 0.0);
    assert!(grid.distance(region.cell_id(4, 0), InfraKind::Grid) > 0.0);
    assert!(grid.cells().all(|c| c.distances().grid_dist.is_finite()));
}

#[test]
fn editing_a_line_matches_drawing_it_fresh() {
    let region = region();
    let moved = vec![region.centre(10, 2), region.centre(10, 9)];

    let mut edited = build_engine(&region);
    let (id, _) = edited
        .draw_line(InfraKind::Grid, vec![region.centre(1, 2), region.centre(1, 9)])
        .unwrap();
    let summary = edited.update_line(id, moved.clone()).unwrap();
    assert_eq!(summary.trigger, PassTrigger::Edit);

    let mut fresh = build_engine(&region);
    fresh.draw_line(InfraKind::Grid, moved).unwrap();

    assert_eq!(distances(&edited), distances(&fresh));
}

#[test]
fn filter_hides_cells_without_a_farm() {
    let region = region();
    let engine = build_engine(&region);
    let filter = filter::build(&[Constraint::new(
        "tech",
        Operator::Ne,
        Threshold::Text("none".into()),
    )])
    .unwrap();
    let snapshot = engine.snapshot();
    let visible: Vec<_> = snapshot.visible(&filter).collect();
    assert!(visible.iter().all(|c| c.derived().tech != FarmType::None));
    let producing = snapshot
        .grid()
        .cells()
        .filter(|c| c.derived().fish_output > 0.0)
        .count();
    assert_eq!(visible.len(), producing);
}

#[test]
fn drawing_file_replays_into_snapshots() {
    let region = region();
    let dir = tempfile::tempdir().unwrap();
    let a = region.centre(2, 2);
    let b = region.centre(2, 9);
    let mut file = std::fs::File::create(dir.path().join("drawing.yaml")).unwrap();
    writeln!(
        file,
        "lines:\n  - kind: road\n    points:\n      - {{ lon: {}, lat: {} }}\n      - {{ lon: {}, lat: {} }}",
        a.lon, a.lat, b.lon, b.lat
    )
    .unwrap();

    let drawing = ConfigLoader::new(dir.path()).load_drawing("drawing.yaml").unwrap();
    assert_eq!(drawing.lines.len(), 1);

    let mut engine = build_engine(&region);
    let writer = SnapshotWriter::new(dir.path().join("snapshots"));
    writer.write(&engine.snapshot()).unwrap();
    for line in drawing.lines {
        engine.draw_line(line.kind, line.points).unwrap();
        writer.write(&engine.snapshot()).unwrap();
    }
    assert!(dir.path().join("snapshots/pass_000001.geojson").exists());
    assert!(dir.path().join("snapshots/pass_000002.geojson").exists());
    assert_eq!(
        engine.snapshot().grid().distance(region.cell_id(2, 5), InfraKind::Road),
        0.0
    );
}
