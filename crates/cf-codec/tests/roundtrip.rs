use cf_codec::{EncodeOptions, decode, encode_with};
use cf_core::UnitSystem;
use cf_project::*;
use proptest::prelude::*;

fn thousandths(n: i64) -> f64 {
    n as f64 / 1000.0
}

fn assert_close(a: f64, b: f64, what: &str) {
    assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0), "{what}: {a} != {b}");
}

fn assert_projects_close(a: &Project, b: &Project) {
    assert_eq!(a.title, b.title);
    assert_eq!(a.designer, b.designer);
    assert_eq!(a.notes, b.notes);
    assert_eq!(a.units, b.units);
    assert_eq!(a.exit_loss_option, b.exit_loss_option);
    assert_eq!(a.crossings.len(), b.crossings.len());
    for (x, y) in a.crossings.iter().zip(&b.crossings) {
        assert_eq!(x.name, y.name);
        assert_eq!(x.notes, y.notes);
        assert_eq!(x.guid, y.guid);
        assert_eq!(x.flow.method(), y.flow.method());
        assert_eq!(x.flow.labels(), y.flow.labels());
        assert_eq!(x.flow.sequence().len(), y.flow.sequence().len());
        for (p, q) in x.flow.sequence().iter().zip(y.flow.sequence()) {
            assert_close(*p, q, "flow");
        }

        let (tw, other) = (&x.tailwater, &y.tailwater);
        assert_eq!(tw.kind, other.kind);
        assert_close(tw.constant_elevation, other.constant_elevation, "tailwater");
        assert_close(tw.invert_elevation, other.invert_elevation, "channel invert");
        assert_close(tw.bottom_width, other.bottom_width, "bottom width");
        assert_close(tw.sideslope, other.sideslope, "sideslope");
        assert_close(tw.channel_slope, other.channel_slope, "channel slope");
        assert_close(tw.manning_n, other.manning_n, "channel manning");
        assert_eq!(tw.rating_curve_entries, other.rating_curve_entries);

        assert_eq!(x.roadway.shape, y.roadway.shape);
        assert_eq!(x.roadway.surface, y.roadway.surface);
        assert_close(x.roadway.width, y.roadway.width, "roadway width");
        assert_eq!(x.roadway.stations.len(), y.roadway.stations.len());
        for ((s, e), (t, f)) in x.roadway.points().zip(y.roadway.points()) {
            assert_close(s, t, "roadway station");
            assert_close(e, f, "roadway elevation");
        }

        assert_eq!(x.barrels.len(), y.barrels.len());
        for (p, q) in x.barrels.iter().zip(&y.barrels) {
            assert_eq!(p.name, q.name);
            assert_eq!(p.notes, q.notes);
            assert_eq!(p.shape, q.shape);
            assert_eq!(p.material, q.material);
            assert_eq!(p.inlet_type, q.inlet_type);
            assert_eq!(p.inlet_edge_type, q.inlet_edge_type);
            assert_eq!(p.inlet_edge_type71, q.inlet_edge_type71);
            assert_eq!(p.improved_inlet_edge_type, q.improved_inlet_edge_type);
            assert_eq!(p.number_of_barrels, q.number_of_barrels);
            assert_close(p.span, q.span, "span");
            assert_close(p.rise, q.rise, "rise");
            assert_close(p.inlet_invert_elevation, q.inlet_invert_elevation, "invert");
            assert_close(p.outlet_invert_elevation, q.outlet_invert_elevation, "outlet invert");
            assert_close(p.inlet_invert_station, q.inlet_invert_station, "inlet station");
            assert_close(p.outlet_invert_station, q.outlet_invert_station, "outlet station");
            assert_close(p.roadway_station, q.roadway_station, "roadway station");
            assert_eq!(p.manning, q.manning);
            assert_eq!(p.barrel_spacing.is_some(), q.barrel_spacing.is_some());
            if let (Some(s), Some(t)) = (p.barrel_spacing, q.barrel_spacing) {
                assert_close(s, t, "spacing");
            }
        }
    }
}

/// One line of text with no leading, trailing or doubled spaces.
fn words() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}( [a-z0-9]{1,8}){0,3}"
}

fn line_or_empty() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), words()]
}

fn block_text() -> impl Strategy<Value = String> {
    prop::collection::vec(words(), 0..3).prop_map(|lines| lines.join("\n"))
}

/// Strictly increasing thousandths from positive steps.
fn rising(steps: &[i64]) -> Vec<f64> {
    let mut acc = 0i64;
    steps
        .iter()
        .map(|s| {
            acc += s;
            thousandths(acc)
        })
        .collect()
}

// Single-value user lists are padded on write and excluded here.
fn flow_strategy() -> impl Strategy<Value = Flow> {
    prop_oneof![
        (1i64..20_000, 1i64..20_000, 1i64..20_000).prop_map(|(a, b, c)| {
            Flow::min_design_max(thousandths(a), thousandths(a + b), thousandths(a + b + c))
        }),
        prop::collection::vec(1i64..50_000, 2..6).prop_map(|steps| Flow::user_defined(rising(&steps))),
        prop::collection::vec(1i64..50_000, 2..6)
            .prop_flat_map(|steps| {
                let n = steps.len();
                (Just(steps), prop::collection::vec("[a-z0-9]{0,8}", n))
            })
            .prop_map(|(steps, labels)| Flow::labelled(rising(&steps), labels)),
    ]
}

fn barrel_strategy(base: i64) -> impl Strategy<Value = Barrel> {
    (
        (
            any::<bool>(),
            prop::sample::select(CulvertMaterial::ALL),
            1i64..8_000,
            1i64..8_000,
            1i64..4,
        ),
        (
            prop::sample::select(InletType::ALL),
            prop::sample::select(InletEdgeType::ALL),
            prop::sample::select(InletEdgeType71::ALL),
            prop::sample::select(ImprovedInletEdgeType::ALL),
        ),
        (prop::option::of(0i64..6), prop::option::of(1i64..3_000)),
        ("[A-Z][a-z0-9]{0,6}", block_text(), 0i64..50_000, 1i64..100_000),
    )
        .prop_map(
            move |(
                (is_box, material, span, rise, count),
                (inlet_type, edge, edge71, improved),
                (manning, spacing),
                (name, notes, station, length),
            )| {
                let span_n = span + 500;
                let span = thousandths(span_n);
                let mut barrel = if is_box {
                    // Boxes are always written as concrete.
                    Barrel::box_section(name, span, thousandths(rise + 500))
                } else {
                    let mut pipe = Barrel::circle(name, span);
                    pipe.material = material;
                    pipe
                };
                barrel.number_of_barrels = count;
                barrel.inlet_type = inlet_type;
                barrel.inlet_edge_type = edge;
                barrel.inlet_edge_type71 = edge71;
                barrel.improved_inlet_edge_type = improved;
                barrel.inlet_invert_station = thousandths(station);
                barrel.outlet_invert_station = thousandths(station + length);
                barrel.roadway_station = thousandths(station + length / 2);
                barrel.inlet_invert_elevation = thousandths(base);
                barrel.outlet_invert_elevation = thousandths(base - 250);
                // Bottom 0.013 never matches a material default, so the pair survives.
                barrel.manning = manning.map(|k| ManningPair {
                    top: thousandths(13 + k),
                    bottom: 0.013,
                });
                barrel.barrel_spacing = spacing.map(|k| thousandths(2 * span_n + k));
                barrel.notes = notes;
                barrel
            },
        )
}

fn crossing_strategy() -> impl Strategy<Value = Crossing> {
    (90_000i64..110_000).prop_flat_map(|base| {
        (
            (
                prop_oneof![Just(String::new()), "[A-Z][a-z0-9 ]{0,10}[a-z0-9]"],
                line_or_empty(),
                prop::option::of("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"),
                flow_strategy(),
            ),
            (0i64..2_000, 1i64..5_000, (0i64..20_000, 0i64..4_000, 0i64..100, 10i64..80), 1i64..8),
            (
                1i64..60_000,
                1i64..4,
                prop::sample::select(RoadwaySurface::ALL),
                prop::collection::vec(0i64..1_500, 2..5),
            ),
            prop::collection::vec(barrel_strategy(base), 1..3),
        )
            .prop_map(
                move |(
                    (name, notes, guid, flow),
                    (tw_gap, crest_gap, (bottom, sideslope, slope, channel_n), entries),
                    (width, shape, surface, rises),
                    barrels,
                )| {
                    let mut crossing = Crossing::new(name);
                    crossing.notes = notes;
                    crossing.guid = guid;
                    crossing.flow = flow;

                    let mut tailwater = Tailwater::constant(thousandths(base + tw_gap), thousandths(base));
                    tailwater.bottom_width = thousandths(bottom);
                    tailwater.sideslope = thousandths(sideslope);
                    tailwater.channel_slope = thousandths(slope);
                    tailwater.manning_n = thousandths(channel_n);
                    tailwater.rating_curve_entries = entries;
                    crossing.tailwater = tailwater;

                    let crest = base + tw_gap + crest_gap;
                    let mut roadway = Roadway::new(thousandths(width), surface);
                    roadway.shape = shape;
                    for (idx, rise) in rises.iter().enumerate() {
                        roadway.add_point(20.0 * idx as f64, thousandths(crest + rise));
                    }
                    crossing.roadway = roadway;
                    crossing.barrels = barrels;
                    crossing
                },
            )
    })
}

fn project_strategy(units: UnitSystem) -> impl Strategy<Value = Project> {
    (
        line_or_empty(),
        line_or_empty(),
        block_text(),
        0i64..2,
        prop::collection::vec(crossing_strategy(), 1..4),
    )
        .prop_map(move |(title, designer, notes, exit_loss, crossings)| Project {
            title,
            designer,
            notes,
            units,
            exit_loss_option: exit_loss,
            crossings,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn english_round_trip_is_exact(project in project_strategy(UnitSystem::English)) {
        let text = encode_with(&project, &EncodeOptions::reproducible()).unwrap();
        let decoded = decode(&text).unwrap();
        prop_assert_eq!(decoded, project);
    }

    #[test]
    fn si_round_trip_within_six_decimals(project in project_strategy(UnitSystem::Si)) {
        let text = encode_with(&project, &EncodeOptions::reproducible()).unwrap();
        let decoded = decode(&text).unwrap();
        assert_projects_close(&project, &decoded);
    }
}

#[test]
fn empty_crossing_name_stays_empty() {
    let mut crossing = Crossing::new("");
    crossing.flow = Flow::user_defined(vec![1.0, 2.0]);
    crossing.tailwater = Tailwater::constant(100.5, 100.0);
    let mut roadway = Roadway::new(24.0, RoadwaySurface::Paved);
    roadway.add_point(0.0, 110.0).add_point(20.0, 110.0);
    crossing.roadway = roadway;
    crossing.add_barrel(Barrel::circle("Pipe", 3.0).with_inverts(100.0, 99.5));

    let mut project = Project::new("Unnamed crossing", UnitSystem::English);
    project.add_crossing(crossing);
    let text = encode_with(&project, &EncodeOptions::reproducible()).unwrap();
    let decoded = decode(&text).unwrap();
    assert_eq!(decoded.crossings[0].name, "");
    assert_eq!(decoded, project);
}
