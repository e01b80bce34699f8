//! Map generation: team bases, control points or payload route, pickups
//!
//! Everything is drawn from one generator so a seeded generator always
//! produces the same map for the same boundary.

use std::collections::BTreeMap;

use rand::Rng;

use super::error::SetupError;
use super::geometry::{distance, Boundary, BoundingBox, Direction, Location};
use super::objective::ControlPoint;
use super::pickup::{roll_pickup, PickupSpot};
use super::setup::GameMode;

/// Control point capture radius (meters)
pub const CP_RADIUS: f64 = 5.0;
/// Pickup radius (meters)
pub const PICKUP_RADIUS: f64 = 1.0;
/// Side of the grid cell that holds at most one pickup (meters)
pub const PICKUP_DISTRIBUTION: f64 = 10.0;

pub const MIN_BASE_RADIUS: f64 = 1.0;
pub const MAX_BASE_RADIUS: f64 = 20.0;
/// Gap kept between a base and the edge of the bounding box
pub const BASE_MARGIN: f64 = 2.0;
/// Below this extent an axis counts as narrow and base offsets shrink
pub const NARROW_EXTENT: f64 = 20.0;

/// Payload never moves faster than this (meters per second)
pub const MAX_PAYLOAD_SPEED: f64 = 1.5;
/// Time an uncontested escort needs to cross the long side of the map
pub const PAYLOAD_TRAVERSAL_SECS: f64 = 300.0;

/// Base positions of both teams
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bases {
    pub radius: f64,
    pub red: Location,
    pub blue: Location,
}

/// Route the payload follows, from the Red base towards the Blue base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayloadRoute {
    pub speed: f64,
    pub direction: Direction,
    pub destination: Location,
}

/// Result of map generation
#[derive(Debug, Clone)]
pub struct Layout {
    pub bases: Bases,
    pub control_points: BTreeMap<String, ControlPoint>,
    pub pickups: Vec<PickupSpot>,
    pub payload: Option<PayloadRoute>,
}

/// Base radius for a map of the given extents
pub fn base_radius(x_range: f64, y_range: f64) -> f64 {
    let short = x_range.min(y_range);
    (short / 8.0)
        .clamp(MIN_BASE_RADIUS, MAX_BASE_RADIUS)
        .min(short / 2.0)
}

/// Distance of a base center from the box edge along an axis of `extent`
pub fn base_offset(extent: f64, radius: f64) -> f64 {
    let offset = if extent < NARROW_EXTENT {
        (extent - radius * 2.0) / 4.0 + radius
    } else {
        radius + BASE_MARGIN
    };
    offset.clamp(0.0, extent / 2.0)
}

/// Place both bases on the longer axis, centered on the shorter one
pub fn place_bases(bbox: &BoundingBox) -> Bases {
    let (width, height) = (bbox.width(), bbox.height());
    let radius = base_radius(width, height);
    let center = bbox.center();

    if width > height {
        let offset = base_offset(width, radius);
        Bases {
            radius,
            red: Location::new(bbox.max_x - offset, center.y),
            blue: Location::new(bbox.min_x + offset, center.y),
        }
    } else {
        let offset = base_offset(height, radius);
        Bases {
            radius,
            red: Location::new(center.x, bbox.max_y - offset),
            blue: Location::new(center.x, bbox.min_y + offset),
        }
    }
}

/// Generate the full map for a boundary.
///
/// `control_points` is only used in multi-capture mode. Each control point
/// gets at most `max_attempts` draws; running out fails the whole layout.
pub fn plan_layout<R: Rng + ?Sized>(
    boundary: &Boundary,
    mode: GameMode,
    control_points: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Layout, SetupError> {
    let bbox = boundary.bounding_box();
    let bases = place_bases(&bbox);

    let mut layout = Layout {
        bases,
        control_points: BTreeMap::new(),
        pickups: Vec::new(),
        payload: None,
    };

    match mode {
        GameMode::SingleCap => {
            let cp = ControlPoint::new("CP1", boundary.find_center(), CP_RADIUS);
            layout.control_points.insert(cp.id.clone(), cp);
        }
        GameMode::MultiCap => {
            place_control_points(&mut layout, boundary, &bbox, control_points, max_attempts, rng)?;
        }
        GameMode::Payload => {
            let cp = ControlPoint::new("CP1", bases.red.midpoint(bases.blue), CP_RADIUS);
            layout.control_points.insert(cp.id.clone(), cp);
            layout.payload = Some(PayloadRoute {
                speed: (bbox.max_extent() / PAYLOAD_TRAVERSAL_SECS).min(MAX_PAYLOAD_SPEED),
                direction: Direction::between(bases.red, bases.blue),
                destination: bases.blue,
            });
        }
    }

    place_pickups(&mut layout, boundary, &bbox, rng);
    Ok(layout)
}

/// Rejection-sample `requested` control points away from the bases
fn place_control_points<R: Rng + ?Sized>(
    layout: &mut Layout,
    boundary: &Boundary,
    bbox: &BoundingBox,
    requested: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<(), SetupError> {
    let bases = layout.bases;
    let (width, height) = (bbox.width(), bbox.height());

    // Keep the base zones (edge → offset + radius) out of the sampling box
    let (x_inset, y_inset) = if width > height {
        (base_offset(width, bases.radius) + bases.radius + CP_RADIUS, CP_RADIUS)
    } else {
        (CP_RADIUS, base_offset(height, bases.radius) + bases.radius + CP_RADIUS)
    };
    let (min_x, max_x) = (bbox.min_x + x_inset, bbox.max_x - x_inset);
    let (min_y, max_y) = (bbox.min_y + y_inset, bbox.max_y - y_inset);

    let exhausted = |placed: usize| SetupError::PlacementExhausted { placed, requested };

    if min_x >= max_x || min_y >= max_y {
        return Err(exhausted(0));
    }

    for index in 0..requested {
        let mut accepted = None;
        for _ in 0..max_attempts {
            let candidate = Location::new(rng.gen_range(min_x..max_x), rng.gen_range(min_y..max_y));
            if boundary.contains(candidate) && clear_of_points(layout, candidate, CP_RADIUS) {
                accepted = Some(candidate);
                break;
            }
        }

        let Some(location) = accepted else {
            return Err(exhausted(index));
        };
        let id = format!("CP{}", index + 1);
        layout
            .control_points
            .insert(id.clone(), ControlPoint::new(id, location, CP_RADIUS));
    }

    Ok(())
}

/// One pickup per grid cell where a jittered point fits (two tries).
///
/// Cells are wider than two pickup radii, so a candidate can only touch
/// pickups in the eight neighbouring cells.
fn place_pickups<R: Rng + ?Sized>(
    layout: &mut Layout,
    boundary: &Boundary,
    bbox: &BoundingBox,
    rng: &mut R,
) {
    let columns = (bbox.width() / PICKUP_DISTRIBUTION).floor() as usize;
    let rows = (bbox.height() / PICKUP_DISTRIBUTION).floor() as usize;
    let half_range = bbox.min_extent() / 2.0;
    let center = boundary.find_center();
    let mut grid: Vec<Option<Location>> = vec![None; columns * rows];

    for i in 0..columns {
        for j in 0..rows {
            let cell_x = bbox.min_x + i as f64 * PICKUP_DISTRIBUTION;
            let cell_y = bbox.min_y + j as f64 * PICKUP_DISTRIBUTION;

            let spot = (0..2).find_map(|_| {
                let candidate = Location::new(
                    cell_x + rng.gen::<f64>() * PICKUP_DISTRIBUTION,
                    cell_y + rng.gen::<f64>() * PICKUP_DISTRIBUTION,
                );
                (boundary.contains(candidate)
                    && clear_of_points(layout, candidate, PICKUP_RADIUS)
                    && clear_of_neighbours(&grid, rows, i, j, candidate))
                .then_some(candidate)
            });

            if let Some(location) = spot {
                grid[i * rows + j] = Some(location);
                let pickup = roll_pickup(rng, distance(center, location), half_range);
                layout.pickups.push(PickupSpot::new(location, pickup));
            }
        }
    }
}

/// True when a circle at `loc` with radius `r` touches no control point
fn clear_of_points(layout: &Layout, loc: Location, r: f64) -> bool {
    layout
        .control_points
        .values()
        .all(|cp| distance(loc, cp.location) > r + cp.radius)
}

/// True when a pickup at `loc` in cell `(i, j)` touches no pickup placed in
/// the surrounding cells
fn clear_of_neighbours(grid: &[Option<Location>], rows: usize, i: usize, j: usize, loc: Location) -> bool {
    let columns = grid.len() / rows.max(1);
    let near = |n: usize, len: usize| n.saturating_sub(1)..=(n + 1).min(len - 1);

    near(i, columns).all(|ni| {
        near(j, rows).all(|nj| match grid[ni * rows + nj] {
            Some(other) => distance(loc, other) > PICKUP_RADIUS * 2.0,
            None => true,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rect(w: f64, h: f64) -> Boundary {
        Boundary::from_locations(vec![
            Location::new(0.0, 0.0),
            Location::new(w, 0.0),
            Location::new(w, h),
            Location::new(0.0, h),
        ])
        .unwrap()
    }

    fn assert_no_overlaps(boundary: &Boundary, layout: &Layout) {
        let mut circles: Vec<(Location, f64)> = layout
            .control_points
            .values()
            .map(|cp| (cp.location, cp.radius))
            .collect();
        circles.extend(layout.pickups.iter().map(|p| (p.location, PICKUP_RADIUS)));

        for (i, (a, ra)) in circles.iter().enumerate() {
            assert!(boundary.contains(*a), "object outside boundary at {:?}", a);
            for (b, rb) in &circles[i + 1..] {
                assert!(distance(*a, *b) >= ra + rb, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn single_cap_point_sits_on_centroid() {
        let boundary = rect(100.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layout = plan_layout(&boundary, GameMode::SingleCap, 1, 100, &mut rng).unwrap();

        assert_eq!(layout.control_points.len(), 1);
        assert_eq!(layout.control_points["CP1"].location, Location::new(50.0, 50.0));
        assert!(layout.payload.is_none());
        assert!(!layout.pickups.is_empty());
        assert_no_overlaps(&boundary, &layout);
    }

    #[test]
    fn bases_are_symmetric_in_a_square() {
        let boundary = rect(100.0, 100.0);
        let bases = place_bases(&boundary.bounding_box());
        let center = boundary.find_center();
        assert!((distance(bases.red, center) - distance(bases.blue, center)).abs() < 1e-9);
        assert!(bases.red.y > bases.blue.y);
    }

    #[test]
    fn bases_follow_the_long_axis() {
        let bases = place_bases(&rect(200.0, 50.0).bounding_box());
        assert_eq!(bases.red.y, 25.0);
        assert_eq!(bases.blue.y, 25.0);
        assert!(bases.red.x > 100.0 && bases.blue.x < 100.0);
    }

    #[test]
    fn narrow_offsets_shrink_but_stay_in_the_box() {
        let wide = base_offset(100.0, 5.0);
        assert_eq!(wide, 7.0);

        let narrow = base_offset(12.0, 1.5);
        assert!(narrow < wide);
        assert!((0.0..=6.0).contains(&narrow));

        // Radius larger than half the extent still stays inside
        assert!(base_offset(2.0, 5.0) <= 1.0);
    }

    #[test]
    fn multi_cap_places_requested_points_without_overlap() {
        let boundary = rect(300.0, 200.0);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let layout = plan_layout(&boundary, GameMode::MultiCap, 5, 500, &mut rng).unwrap();

        assert_eq!(layout.control_points.len(), 5);
        let ids: Vec<&str> = layout.control_points.keys().map(String::as_str).collect();
        assert_eq!(ids, ["CP1", "CP2", "CP3", "CP4", "CP5"]);
        assert_no_overlaps(&boundary, &layout);
    }

    #[test]
    fn infeasible_multi_cap_terminates_with_error() {
        // 30x30: barely room for one point between the bases
        let boundary = rect(30.0, 30.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let result = plan_layout(&boundary, GameMode::MultiCap, 5, 200, &mut rng);
        assert!(matches!(
            result,
            Err(SetupError::PlacementExhausted { requested: 5, placed }) if placed < 5
        ));
    }

    #[test]
    fn payload_route_runs_red_to_blue() {
        let boundary = rect(300.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let layout = plan_layout(&boundary, GameMode::Payload, 1, 100, &mut rng).unwrap();

        let route = layout.payload.unwrap();
        let bases = layout.bases;
        assert_eq!(route.destination, bases.blue);
        assert!(route.direction.dx < 0.0);
        assert!((route.speed - 300.0 / PAYLOAD_TRAVERSAL_SECS).abs() < 1e-9);
        assert_eq!(layout.control_points["CP1"].location, bases.red.midpoint(bases.blue));
    }

    #[test]
    fn payload_speed_is_capped() {
        let boundary = rect(5000.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let layout = plan_layout(&boundary, GameMode::Payload, 1, 100, &mut rng).unwrap();
        assert_eq!(layout.payload.unwrap().speed, MAX_PAYLOAD_SPEED);
    }

    #[test]
    fn same_seed_same_map() {
        let boundary = rect(150.0, 120.0);
        let a = plan_layout(&boundary, GameMode::MultiCap, 3, 500, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        let b = plan_layout(&boundary, GameMode::MultiCap, 3, 500, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        assert_eq!(a.control_points, b.control_points);
        assert_eq!(a.pickups, b.pickups);
    }

    #[test]
    fn pickups_respect_irregular_boundary() {
        let boundary = Boundary::from_locations(vec![
            Location::new(0.0, 0.0),
            Location::new(120.0, 0.0),
            Location::new(60.0, 100.0),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let layout = plan_layout(&boundary, GameMode::SingleCap, 1, 100, &mut rng).unwrap();
        assert_no_overlaps(&boundary, &layout);
    }

    #[test]
    fn largest_allowed_map_fills_the_grid_without_overlaps() {
        use crate::game::setup::MAX_BOUNDARY_EXTENT;
        use std::collections::HashMap;

        let boundary = rect(MAX_BOUNDARY_EXTENT, MAX_BOUNDARY_EXTENT);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let layout = plan_layout(&boundary, GameMode::SingleCap, 1, 100, &mut rng).unwrap();

        let cells = (MAX_BOUNDARY_EXTENT / PICKUP_DISTRIBUTION).powi(2) as usize;
        assert!(layout.pickups.len() > cells * 9 / 10);

        let cell_of = |l: Location| {
            (
                (l.x / PICKUP_DISTRIBUTION).floor() as i64,
                (l.y / PICKUP_DISTRIBUTION).floor() as i64,
            )
        };
        let mut by_cell: HashMap<(i64, i64), Vec<Location>> = HashMap::new();
        for p in &layout.pickups {
            by_cell.entry(cell_of(p.location)).or_default().push(p.location);
        }
        for p in &layout.pickups {
            let (cx, cy) = cell_of(p.location);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for other in by_cell.get(&(cx + dx, cy + dy)).into_iter().flatten() {
                        if *other != p.location {
                            assert!(distance(*other, p.location) > PICKUP_RADIUS * 2.0);
                        }
                    }
                }
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn layouts_never_overlap(
                seed in 0u64..500,
                w in 40.0f64..400.0,
                h in 40.0f64..400.0,
                n in 1usize..6,
            ) {
                let boundary = rect(w, h);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                if let Ok(layout) = plan_layout(&boundary, GameMode::MultiCap, n, 300, &mut rng) {
                    assert_no_overlaps(&boundary, &layout);
                }
            }

            #[test]
            fn base_offsets_stay_in_range(extent in 0.0f64..60.0, radius in 0.0f64..30.0) {
                let offset = base_offset(extent, radius);
                prop_assert!(offset >= 0.0);
                prop_assert!(offset <= extent / 2.0);
            }
        }
    }
}
