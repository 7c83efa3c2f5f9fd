//! End-to-end chaining scenarios: zones, split zones and ported tubes.

#![allow(clippy::unwrap_used)]

use beamcsg::component::{Marker, Pipe, PortTube};
use beamcsg::diagnostics::ConsistencyWarning;
use beamcsg::error::{BeamcsgError, CellError};
use beamcsg::geometry::Plane;
use beamcsg::link::{BACK, FRONT};
use beamcsg::math::{Point3, Vector3};
use beamcsg::operations::chain::{ConstructUnit, IntersectPorts};
use beamcsg::operations::query::SampleVolume;
use beamcsg::registry::{CellId, CellRecord};
use beamcsg::rule::{HeadRule, SignedSurface};
use beamcsg::vars::VariableStore;
use beamcsg::zone::{Zone, ZoneState};
use beamcsg::{BuildContext, ComponentId};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

fn origin(ctx: &mut BuildContext) -> ComponentId {
    let id = ctx
        .register(Marker::new("origin", Point3::origin(), Vector3::y()))
        .unwrap();
    ctx.create_all(id, None).unwrap();
    id
}

fn pipe_vars(vars: &mut VariableStore, key: &str, length: f64) {
    vars.add_variable(format!("{key}Length"), length);
    vars.add_variable(format!("{key}Radius"), 1.0);
    vars.add_variable(format!("{key}WallThick"), 0.5);
}

fn inside(ctx: &BuildContext, cell: CellId, p: Point3) -> bool {
    ctx.geometry
        .cells
        .rule(cell)
        .unwrap()
        .is_valid(&p, &ctx.geometry.surfaces)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Straight chain
// ---------------------------------------------------------------------------

#[test]
fn three_pipes_tile_the_zone() {
    init_tracing();
    let mut vars = VariableStore::new();
    for key in ["a", "b", "c"] {
        pipe_vars(&mut vars, key, 10.0);
    }
    let mut ctx = BuildContext::new(vars);
    let start = origin(&mut ctx);
    let entry = ctx.link(start, BACK).unwrap();
    let mut zone = Zone::new("line", HeadRule::universe());
    zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();

    let mut previous = start;
    let mut carved = Vec::new();
    for key in ["a", "b", "c"] {
        let next = ctx.register(Pipe::new(key)).unwrap();
        let cell = ConstructUnit::new(previous, BACK, next)
            .execute(&mut ctx, &mut zone)
            .unwrap()
            .unwrap();
        carved.push(cell);
        previous = next;
    }
    assert!(ctx.diagnostics().is_empty());
    assert_eq!(zone.cells().len(), 3);

    let a = ctx.lookup("a").unwrap();
    let b = ctx.lookup("b").unwrap();
    let c = ctx.lookup("c").unwrap();
    assert_eq!(
        ctx.link(a, BACK).unwrap().rule,
        ctx.link(b, FRONT).unwrap().rule.complement()
    );
    assert_eq!(
        ctx.link(b, BACK).unwrap().rule,
        ctx.link(c, FRONT).unwrap().rule.complement()
    );
    let shared = ctx
        .link(a, BACK)
        .unwrap()
        .rule
        .intersect(&ctx.link(b, FRONT).unwrap().rule);
    assert!(shared.simplify().is_null());
    assert_eq!(zone.divider(), &ctx.link(c, BACK).unwrap().rule);

    // beside the pipes each sample lies in exactly one carved void
    for (k, y) in [5.0, 15.0, 25.0].into_iter().enumerate() {
        let p = Point3::new(3.0, y, 0.0);
        let hits: Vec<usize> = (0..3).filter(|&i| inside(&ctx, carved[i], p)).collect();
        assert_eq!(hits, vec![k]);
    }
    // the pipes themselves are excluded from the zone cells
    assert!(carved
        .iter()
        .all(|&cell| !inside(&ctx, cell, Point3::new(0.0, 15.0, 0.0))));

    let master = zone.master_cell().unwrap();
    assert!(inside(&ctx, master, Point3::new(0.0, 35.0, 0.0)));
    assert!(!inside(&ctx, master, Point3::new(0.0, 25.0, 0.0)));

    zone.remove_last_master(&mut ctx.geometry).unwrap();
    assert_eq!(zone.state(), ZoneState::Closed);

    let mut records: Vec<CellRecord> = Vec::new();
    ctx.write_cells(&mut records);
    assert!(records.iter().any(|r| r.tag == "b"));
    assert!(records.iter().any(|r| r.tag == "bWall"));
    assert!(!records.iter().any(|r| r.tag == "lineMaster"));
}

#[test]
fn optional_gap_keeps_chain_continuous() {
    let mut vars = VariableStore::new();
    pipe_vars(&mut vars, "a", 10.0);
    pipe_vars(&mut vars, "gap", 0.0);
    pipe_vars(&mut vars, "b", 10.0);
    let mut ctx = BuildContext::new(vars);
    let start = origin(&mut ctx);
    let entry = ctx.link(start, BACK).unwrap();
    let mut zone = Zone::new("line", HeadRule::universe());
    zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();

    let a = ctx.register(Pipe::new("a")).unwrap();
    let gap = ctx.register(Pipe::new("gap")).unwrap();
    let b = ctx.register(Pipe::new("b")).unwrap();
    ConstructUnit::new(start, BACK, a)
        .execute(&mut ctx, &mut zone)
        .unwrap();
    let skipped = ConstructUnit::new(a, BACK, gap)
        .optional()
        .execute(&mut ctx, &mut zone)
        .unwrap();
    assert!(skipped.is_none());
    let cell = ConstructUnit::new(gap, BACK, b)
        .execute(&mut ctx, &mut zone)
        .unwrap()
        .unwrap();

    assert!(ctx.diagnostics().is_empty());
    assert_eq!(zone.cells().len(), 2);
    assert!(inside(&ctx, cell, Point3::new(3.0, 15.0, 0.0)));
    assert!(!inside(&ctx, cell, Point3::new(3.0, 5.0, 0.0)));
}

#[test]
fn required_gap_is_reported() {
    let mut vars = VariableStore::new();
    pipe_vars(&mut vars, "a", 10.0);
    pipe_vars(&mut vars, "gap", 0.0);
    let mut ctx = BuildContext::new(vars);
    let start = origin(&mut ctx);
    let entry = ctx.link(start, BACK).unwrap();
    let mut zone = Zone::new("line", HeadRule::universe());
    zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();

    let a = ctx.register(Pipe::new("a")).unwrap();
    let gap = ctx.register(Pipe::new("gap")).unwrap();
    ConstructUnit::new(start, BACK, a)
        .execute(&mut ctx, &mut zone)
        .unwrap();
    let carved = ConstructUnit::new(a, BACK, gap)
        .execute(&mut ctx, &mut zone)
        .unwrap();
    assert!(carved.is_none());
    match ctx.diagnostics().warnings() {
        [ConsistencyWarning::LengthMismatch {
            component,
            collapsed: true,
            ..
        }] => assert_eq!(component, "gap"),
        other => panic!("unexpected warnings: {other:?}"),
    }
}

#[test]
fn marker_is_not_chainable() {
    let mut ctx = BuildContext::new(VariableStore::new());
    let start = origin(&mut ctx);
    let entry = ctx.link(start, BACK).unwrap();
    let mut zone = Zone::new("line", HeadRule::universe());
    zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();
    let stop = ctx
        .register(Marker::new("stop", Point3::new(0.0, 5.0, 0.0), Vector3::y()))
        .unwrap();
    let err = ConstructUnit::new(start, BACK, stop)
        .execute(&mut ctx, &mut zone)
        .unwrap_err();
    assert!(matches!(err, BeamcsgError::Component(_)));
    assert!(zone.cells().is_empty());
}

// ---------------------------------------------------------------------------
// Split zones
// ---------------------------------------------------------------------------

#[test]
fn split_children_share_the_partition_plane() {
    init_tracing();
    let mut vars = VariableStore::new();
    for (key, z) in [("low", -10.0), ("high", 10.0)] {
        pipe_vars(&mut vars, key, 10.0);
        vars.add_variable(format!("{key}ZStep"), z);
    }
    let mut ctx = BuildContext::new(vars);
    let start = origin(&mut ctx);

    let planes = [
        (1, Point3::new(-20.0, 0.0, 0.0), Vector3::x()),
        (2, Point3::new(20.0, 0.0, 0.0), Vector3::x()),
        (3, Point3::new(0.0, 0.0, -20.0), Vector3::z()),
        (4, Point3::new(0.0, 0.0, 20.0), Vector3::z()),
        (5, Point3::origin(), Vector3::z()),
    ];
    for (id, origin, normal) in planes {
        ctx.geometry
            .surfaces
            .add(id, Plane::from_normal(origin, normal).unwrap())
            .unwrap();
    }
    let surround: HeadRule = "1 -2 3 -4".parse().unwrap();
    let mut hall = Zone::new("hall", surround);
    let partition = [SignedSurface::new(5).unwrap()];
    let mut children = hall.split_into(&mut ctx.geometry, 2, &partition).unwrap();
    assert_eq!(hall.state(), ZoneState::Closed);

    let plane = SignedSurface::new(5).unwrap();
    assert!(children[0].surround().contains(-plane));
    assert!(children[1].surround().contains(plane));

    let entry = ctx.link(start, BACK).unwrap();
    let mut cells = Vec::new();
    for (child, key) in children.iter_mut().zip(["low", "high"]) {
        child.construct_master_cell(&mut ctx.geometry, &entry).unwrap();
        let pipe = ctx.register(Pipe::new(key)).unwrap();
        let cell = ConstructUnit::new(start, BACK, pipe)
            .execute(&mut ctx, child)
            .unwrap()
            .unwrap();
        cells.push(cell);
    }
    assert!(ctx.diagnostics().is_empty());

    let below = Point3::new(5.0, 5.0, -3.0);
    let above = Point3::new(5.0, 5.0, 3.0);
    assert!(inside(&ctx, cells[0], below));
    assert!(!inside(&ctx, cells[1], below));
    assert!(inside(&ctx, cells[1], above));
    assert!(!inside(&ctx, cells[0], above));
    assert!(!inside(&ctx, cells[0], Point3::new(0.0, 5.0, -10.0)));
}

// ---------------------------------------------------------------------------
// Ported tubes
// ---------------------------------------------------------------------------

fn tube_vars() -> VariableStore {
    let mut vars = VariableStore::new();
    vars.add_variable("tubeLength", 30.0);
    vars.add_variable("tubeRadius", 10.0);
    vars.add_variable("tubeWallThick", 1.0);
    vars.add_variable("tubeNPorts", 2_usize);
    for (i, y) in [(0, 12.0), (1, 18.0)] {
        vars.add_variable(format!("tubePort{i}YStep"), y);
        vars.add_variable(format!("tubePort{i}Radius"), 5.0);
        vars.add_variable(format!("tubePort{i}Wall"), 1.0);
        vars.add_variable(format!("tubePort{i}Length"), 25.0);
    }
    vars
}

fn chained_tube() -> (BuildContext, ComponentId, Zone) {
    let mut ctx = BuildContext::new(tube_vars());
    let start = origin(&mut ctx);
    let entry = ctx.link(start, BACK).unwrap();
    let mut zone = Zone::new("line", HeadRule::universe());
    zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();
    let tube = ctx.register(PortTube::new("tube").deferred()).unwrap();
    ConstructUnit::new(start, BACK, tube)
        .execute(&mut ctx, &mut zone)
        .unwrap();
    (ctx, tube, zone)
}

fn port_voids(ctx: &BuildContext, tube: ComponentId) -> Vec<HeadRule> {
    let named = ctx.component(tube).unwrap().named_cells();
    ["Port0Void", "Port1Void"]
        .iter()
        .map(|tag| {
            let id = named.get(tag, 0).unwrap();
            ctx.geometry.cells.rule(id).unwrap().clone()
        })
        .collect()
}

#[test]
fn deferred_ports_cut_the_host_cell() {
    init_tracing();
    let (mut ctx, tube, zone) = chained_tube();
    let host = zone.cell("tube").unwrap();
    let in_port = Point3::new(15.0, 12.0, 0.0);
    assert!(inside(&ctx, host, in_port));

    ctx.retrofit_ports(tube).unwrap();
    assert!(!inside(&ctx, host, in_port));
    assert!(inside(&ctx, host, Point3::new(15.0, 25.0, 0.0)));
}

#[test]
fn intersected_ports_no_longer_double_count() {
    let (mut ctx, tube, _zone) = chained_tube();
    ctx.retrofit_ports(tube).unwrap();
    let sampler = SampleVolume::new(Point3::new(0.0, 5.0, -6.0), Point3::new(26.0, 25.0, 6.0))
        .with_samples(20_000)
        .with_seed(7);

    let before = port_voids(&ctx, tube);
    let naive = sampler
        .execute(&[&before[0], &before[1]], &ctx.geometry.surfaces)
        .unwrap();
    assert!(naive.overlap() > 0.0);

    IntersectPorts::new(tube, 1, 0).execute(&mut ctx).unwrap();
    let after = port_voids(&ctx, tube);
    let fixed = sampler
        .execute(&[&after[0], &after[1]], &ctx.geometry.surfaces)
        .unwrap();
    assert!(fixed.overlap().abs() < 1e-9);
    assert!((fixed.union - naive.union).abs() < 1e-9);

    // repeating the correction changes nothing
    IntersectPorts::new(tube, 0, 1).execute(&mut ctx).unwrap();
    assert_eq!(port_voids(&ctx, tube), after);
}

#[test]
fn port_intersection_order_does_not_matter() {
    let (mut forward, tube_f, _) = chained_tube();
    let (mut backward, tube_b, _) = chained_tube();
    forward.retrofit_ports(tube_f).unwrap();
    backward.retrofit_ports(tube_b).unwrap();
    IntersectPorts::new(tube_f, 0, 1).execute(&mut forward).unwrap();
    IntersectPorts::new(tube_b, 1, 0).execute(&mut backward).unwrap();
    assert_eq!(port_voids(&forward, tube_f), port_voids(&backward, tube_b));
}

#[test]
fn retrofit_after_capture_is_refused() {
    let (mut ctx, tube, zone) = chained_tube();
    let wall = ctx.capture_cell(tube, "Wall", 0).unwrap();
    let host = zone.cell("tube").unwrap();
    let host_rule = ctx.geometry.cells.rule(host).unwrap().clone();
    let cells = ctx.geometry.cells.len();

    let err = ctx.retrofit_ports(tube).unwrap_err();
    assert!(matches!(
        err,
        BeamcsgError::Cell(CellError::RetrofitAfterObservation(n)) if n == wall.number()
    ));
    assert_eq!(ctx.geometry.cells.len(), cells);
    assert_eq!(ctx.geometry.cells.rule(host).unwrap(), &host_rule);
}
