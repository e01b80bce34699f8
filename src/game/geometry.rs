//! Planar geometry for the play area
//!
//! Clients report positions in geographic degrees. Everything inside the
//! server works in meters on a flat plane, which is accurate enough for the
//! few hundred meters a play area spans.

use serde::{Deserialize, Serialize};

use super::error::SetupError;

/// Fixed conversion scale from degrees to meters
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Polygons with less area than this (square meters) are rejected
const MIN_BOUNDARY_AREA: f64 = 1e-6;

/// Tolerance for treating a point as lying on a boundary edge
const EDGE_TOLERANCE: f64 = 1e-9;

pub fn degree_to_meter(deg: f64) -> f64 {
    deg * METERS_PER_DEGREE
}

pub fn meter_to_degree(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Point on the wire, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

impl GeoPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point in planar meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_geo(point: GeoPoint) -> Self {
        Self {
            x: degree_to_meter(point.x),
            y: degree_to_meter(point.y),
        }
    }

    pub fn to_geo(self) -> GeoPoint {
        GeoPoint {
            x: meter_to_degree(self.x),
            y: meter_to_degree(self.y),
        }
    }

    /// Move `distance` meters along `direction` (normalized first)
    pub fn step_towards(self, direction: Direction, distance: f64) -> Self {
        match direction.normalized() {
            Some(unit) => Self {
                x: self.x + unit.dx * distance,
                y: self.y + unit.dy * distance,
            },
            None => self,
        }
    }

    pub fn midpoint(self, other: Location) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Displacement vector in meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Direction {
    pub dx: f64,
    pub dy: f64,
}

impl Direction {
    pub fn between(from: Location, to: Location) -> Self {
        Self {
            dx: to.x - from.x,
            dy: to.y - from.y,
        }
    }

    pub fn length(self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Unit vector, or `None` for a zero vector
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Self {
            dx: self.dx / len,
            dy: self.dy / len,
        })
    }
}

pub fn distance(a: Location, b: Location) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// One polygon vertex plus the edge vector to the next vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub point: Location,
    pub direction: Direction,
}

impl Border {
    fn end(&self) -> Location {
        Location::new(
            self.point.x + self.direction.dx,
            self.point.y + self.direction.dy,
        )
    }
}

/// Axis-aligned box around the boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn min_extent(&self) -> f64 {
        self.width().min(self.height())
    }

    pub fn max_extent(&self) -> f64 {
        self.width().max(self.height())
    }

    pub fn center(&self) -> Location {
        Location::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Closed play-area polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    borders: Vec<Border>,
}

impl Boundary {
    /// Build from wire vertices (degrees)
    pub fn from_geo(vertices: &[GeoPoint]) -> Result<Self, SetupError> {
        Self::from_locations(vertices.iter().copied().map(Location::from_geo).collect())
    }

    /// Build from planar vertices, recomputing every edge direction
    pub fn from_locations(vertices: Vec<Location>) -> Result<Self, SetupError> {
        if vertices.len() < 3 {
            return Err(SetupError::TooFewVertices(vertices.len()));
        }

        let count = vertices.len();
        let borders: Vec<Border> = vertices
            .iter()
            .enumerate()
            .map(|(i, &point)| Border {
                point,
                direction: Direction::between(point, vertices[(i + 1) % count]),
            })
            .collect();

        let boundary = Self { borders };
        if boundary.area() < MIN_BOUNDARY_AREA {
            return Err(SetupError::DegenerateBoundary);
        }
        Ok(boundary)
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn vertices(&self) -> impl Iterator<Item = Location> + '_ {
        self.borders.iter().map(|b| b.point)
    }

    /// Arithmetic mean of the vertices
    pub fn find_center(&self) -> Location {
        let count = self.borders.len() as f64;
        let (sx, sy) = self
            .vertices()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Location::new(sx / count, sy / count)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.vertices().fold(
            BoundingBox {
                min_x: f64::MAX,
                max_x: f64::MIN,
                min_y: f64::MAX,
                max_y: f64::MIN,
            },
            |bb, p| BoundingBox {
                min_x: bb.min_x.min(p.x),
                max_x: bb.max_x.max(p.x),
                min_y: bb.min_y.min(p.y),
                max_y: bb.max_y.max(p.y),
            },
        )
    }

    /// Absolute shoelace area in square meters
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .borders
            .iter()
            .map(|b| {
                let end = b.end();
                b.point.x * end.y - end.x * b.point.y
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Ray-crossing containment test. Points on an edge count as inside.
    pub fn contains(&self, p: Location) -> bool {
        let mut inside = false;

        for border in &self.borders {
            let a = border.point;
            let b = border.end();

            if on_segment(a, border.direction, p) {
                return true;
            }

            // Half-open rule so a ray through a vertex is counted once and
            // horizontal edges never count.
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / border.direction.dy;
                let crossing_x = a.x + t * border.direction.dx;
                if p.x < crossing_x {
                    inside = !inside;
                }
            }
        }

        inside
    }
}

fn on_segment(start: Location, edge: Direction, p: Location) -> bool {
    let rel = Direction::between(start, p);
    let len_sq = edge.dx * edge.dx + edge.dy * edge.dy;
    let cross = edge.dx * rel.dy - edge.dy * rel.dx;
    if cross.abs() > EDGE_TOLERANCE * len_sq.sqrt().max(1.0) {
        return false;
    }
    let dot = edge.dx * rel.dx + edge.dy * rel.dy;
    dot >= -EDGE_TOLERANCE && dot <= len_sq + EDGE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Boundary {
        Boundary::from_locations(vec![
            Location::new(0.0, 0.0),
            Location::new(size, 0.0),
            Location::new(size, size),
            Location::new(0.0, size),
        ])
        .unwrap()
    }

    #[test]
    fn directions_point_to_successor_and_wrap() {
        let boundary = square(10.0);
        let borders = boundary.borders();
        assert_eq!(borders[0].direction, Direction { dx: 10.0, dy: 0.0 });
        assert_eq!(borders[1].direction, Direction { dx: 0.0, dy: 10.0 });
        assert_eq!(borders[3].direction, Direction { dx: 0.0, dy: -10.0 });
    }

    #[test]
    fn rejects_short_and_degenerate_boundaries() {
        let two = vec![Location::new(0.0, 0.0), Location::new(1.0, 1.0)];
        assert_eq!(
            Boundary::from_locations(two),
            Err(SetupError::TooFewVertices(2))
        );

        let collinear = vec![
            Location::new(0.0, 0.0),
            Location::new(5.0, 5.0),
            Location::new(10.0, 10.0),
        ];
        assert_eq!(
            Boundary::from_locations(collinear),
            Err(SetupError::DegenerateBoundary)
        );
    }

    #[test]
    fn center_is_vertex_mean() {
        let boundary = Boundary::from_locations(vec![
            Location::new(0.0, 0.0),
            Location::new(30.0, 0.0),
            Location::new(0.0, 60.0),
        ])
        .unwrap();
        assert_eq!(boundary.find_center(), Location::new(10.0, 20.0));
    }

    #[test]
    fn containment_inside_outside_and_edges() {
        let boundary = square(100.0);
        assert!(boundary.contains(Location::new(50.0, 50.0)));
        assert!(!boundary.contains(Location::new(150.0, 50.0)));
        assert!(!boundary.contains(Location::new(-0.1, 50.0)));
        assert!(boundary.contains(Location::new(100.0, 50.0)));
        assert!(boundary.contains(Location::new(0.0, 0.0)));
        assert!(boundary.contains(Location::new(50.0, 100.0)));
    }

    #[test]
    fn containment_with_concave_polygon_and_collinear_vertices() {
        // U shape with an extra collinear vertex on the bottom edge
        let boundary = Boundary::from_locations(vec![
            Location::new(0.0, 0.0),
            Location::new(15.0, 0.0),
            Location::new(30.0, 0.0),
            Location::new(30.0, 30.0),
            Location::new(20.0, 30.0),
            Location::new(20.0, 10.0),
            Location::new(10.0, 10.0),
            Location::new(10.0, 30.0),
            Location::new(0.0, 30.0),
        ])
        .unwrap();

        assert!(boundary.contains(Location::new(5.0, 20.0)));
        assert!(boundary.contains(Location::new(25.0, 20.0)));
        assert!(boundary.contains(Location::new(15.0, 5.0)));
        assert!(!boundary.contains(Location::new(15.0, 20.0)));
        // On the edge, next to the collinear vertex
        assert!(boundary.contains(Location::new(15.0, 0.0)));
    }

    #[test]
    fn geo_conversion_is_linear() {
        let loc = Location::from_geo(GeoPoint::new(1.0, -0.5));
        assert_eq!(loc.x, METERS_PER_DEGREE);
        assert_eq!(loc.y, -METERS_PER_DEGREE / 2.0);
        let back = loc.to_geo();
        assert!((back.x - 1.0).abs() < 1e-12);
        assert!((back.y + 0.5).abs() < 1e-12);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn center_independent_of_vertex_rotation(
                points in proptest::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 3..10),
                shift in 0usize..10,
            ) {
                let locs: Vec<Location> = points.iter().map(|&(x, y)| Location::new(x, y)).collect();
                let Ok(boundary) = Boundary::from_locations(locs.clone()) else {
                    return Ok(());
                };

                let mut rotated = locs.clone();
                rotated.rotate_left(shift % locs.len());
                rotated.reverse();
                let other = Boundary::from_locations(rotated).unwrap();

                let a = boundary.find_center();
                let b = other.find_center();
                prop_assert!((a.x - b.x).abs() < 1e-9);
                prop_assert!((a.y - b.y).abs() < 1e-9);
            }
        }
    }
}
