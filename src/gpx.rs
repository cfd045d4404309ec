use std::io::{Read, Write};

use geo::{Distance, Geodesic};
use gpx::{read, write, Route, Track, Waypoint};
use itertools::Itertools;
use log::info;
use thiserror::Error;

use crate::chain::{Chain, ChainError, RouteMeta};
use crate::simplify::simplify_track;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("gpx parsing failed: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Number of points per route in the output.
    pub route_points: usize,
    /// Perpendicular-distance tolerance in metres for the optional
    /// pre-simplification pass; None skips the pass.
    pub max_distance: Option<f64>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            route_points: 50,
            max_distance: None,
        }
    }
}

/// All points of a track, segments flattened in order.
pub fn track_waypoints(track: &Track) -> Vec<Waypoint> {
    track
        .segments
        .iter()
        .flat_map(|segment| segment.points.iter().cloned())
        .collect()
}

/// Turn one track into a routeable route: optionally pre-simplify, then
/// reduce to the target point count.
///
/// A track already at or below the target is converted as is; the strict
/// target validation only applies when there is something to remove.
pub fn track_to_route(track: &Track, options: &ConvertOptions) -> Result<Route, ConvertError> {
    let mut points = track_waypoints(track);
    let length: f64 = points
        .iter()
        .map(|waypoint| waypoint.point())
        .tuple_windows()
        .map(|(a, b)| Geodesic.distance(a, b))
        .sum();
    info!(
        "track {}: {} points over {:.1} km",
        track.name.as_deref().unwrap_or("(unnamed)"),
        points.len(),
        length / 1000.0
    );
    if let Some(max_distance) = options.max_distance {
        points = simplify_track(points, max_distance);
    }
    let mut chain = Chain::new(points, RouteMeta::from_track(track))?;
    if chain.len() > options.route_points {
        chain.reduce_to(options.route_points)?;
        info!("route keeps {} points", chain.len());
    } else {
        info!("track already has {} points, nothing to remove", chain.len());
    }
    Ok(chain.to_route())
}

/// Convert every track of a GPX document into a route appended to the same
/// document, and serialize the result.
pub fn convert<R: Read, W: Write>(
    reader: R,
    writer: W,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let mut document = read(reader)?;
    info!("we have {} tracks", document.tracks.len());
    let routes = document
        .tracks
        .iter()
        .map(|track| track_to_route(track, options))
        .collect::<Result<Vec<_>, _>>()?;
    document.routes.extend(routes);
    write(&document, writer)?;
    Ok(())
}
