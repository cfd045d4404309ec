use geo::{Coord, LineString, SimplifyIdx};
use gpx::Waypoint;
use log::debug;

// rough degrees-per-metre conversion for the simplification tolerance
const METRES_PER_DEGREE: f64 = 111_111.0;

/// Ramer-Douglas-Peucker pre-pass: drop points lying within `max_distance`
/// metres of the segment between their surviving neighbours.
///
/// This runs upstream of the angle-based reduction and is independent from
/// it. The algorithm itself comes from the geo crate; only the index
/// bookkeeping lives here so each surviving waypoint keeps its original
/// payload (time, elevation, comments).
pub fn simplify_track(points: Vec<Waypoint>, max_distance: f64) -> Vec<Waypoint> {
    if points.len() <= 2 {
        return points;
    }
    let line: LineString = points
        .iter()
        .map(|waypoint| {
            let point = waypoint.point();
            Coord {
                x: point.x(),
                y: point.y(),
            }
        })
        .collect();
    let mut kept = line
        .simplify_idx(&(max_distance / METRES_PER_DEGREE))
        .into_iter()
        .peekable();
    let before = points.len();
    let simplified: Vec<Waypoint> = points
        .into_iter()
        .enumerate()
        .filter_map(|(index, waypoint)| {
            if kept.peek() == Some(&index) {
                kept.next();
                Some(waypoint)
            } else {
                None
            }
        })
        .collect();
    debug!(
        "simplification kept {} of {} points",
        simplified.len(),
        before
    );
    simplified
}
