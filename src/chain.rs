use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::f64::consts::PI;

use geo::{Distance, Geodesic};
use gpx::{Link, Route, Waypoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("a track needs at least 3 points to be reduced, got {count}")]
    TooFewPoints { count: usize },
    #[error("target point count {target} is outside 2..={len}")]
    InvalidTarget { target: usize, len: usize },
    #[error("no interior points left to remove")]
    Exhausted,
}

/// Descriptive fields carried from the source track onto the output route.
#[derive(Clone, Debug, Default)]
pub struct RouteMeta {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub links: Vec<Link>,
    pub number: Option<u32>,
    pub type_: Option<String>,
}

impl RouteMeta {
    pub fn from_track(track: &gpx::Track) -> Self {
        RouteMeta {
            name: track.name.clone(),
            comment: track.comment.clone(),
            description: track.description.clone(),
            source: track.source.clone(),
            links: track.links.clone(),
            number: track.number,
            type_: track.type_.clone(),
        }
    }
}

/// A track point in the chain: the original waypoint payload plus links to
/// its current neighbours and a lazily cached turn angle.
pub struct ChainPoint {
    waypoint: Waypoint,
    previous: Option<usize>,
    next: Option<usize>,
    angle: Cell<Option<f64>>,
}

impl ChainPoint {
    fn new(waypoint: Waypoint) -> Self {
        ChainPoint {
            waypoint,
            previous: None,
            next: None,
            angle: Cell::new(None),
        }
    }

    pub fn waypoint(&self) -> &Waypoint {
        &self.waypoint
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn is_interior(&self) -> bool {
        self.previous.is_some() && self.next.is_some()
    }

    // any link change makes the cached angle stale
    fn set_previous(&mut self, previous: Option<usize>) {
        self.angle.set(None);
        self.previous = previous;
    }

    fn set_next(&mut self, next: Option<usize>) {
        self.angle.set(None);
        self.next = next;
    }
}

/// Removal priority: how far a point's turn angle deviates from a straight
/// line. The straightest point drains first.
#[derive(Clone, Copy, Debug)]
struct Significance(f64);

impl Significance {
    fn of_angle(angle: f64) -> Self {
        if angle.is_nan() {
            // a missing angle ranks below every real turn
            Significance(-1.0)
        } else {
            Significance(PI - angle)
        }
    }
}

impl PartialEq for Significance {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Significance {}

impl PartialOrd for Significance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Significance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// An ordered chain of track points which can be reduced to a target size by
/// repeatedly removing the point contributing least to the track's shape.
///
/// Points live in an arena; `previous`/`next` are arena indices, so removing
/// a point is a pure re-link of its neighbours. Interior points are ranked in
/// a queue by significance, ties broken by arena index so identical inputs
/// reduce identically.
pub struct Chain {
    points: Vec<ChainPoint>,
    head: usize,
    queue: BTreeSet<(Significance, usize)>,
    remaining: usize,
    meta: RouteMeta,
}

impl Chain {
    pub fn new(waypoints: Vec<Waypoint>, meta: RouteMeta) -> Result<Self, ChainError> {
        if waypoints.len() < 3 {
            return Err(ChainError::TooFewPoints {
                count: waypoints.len(),
            });
        }
        let mut points: Vec<ChainPoint> = waypoints.into_iter().map(ChainPoint::new).collect();
        let last = points.len() - 1;
        for index in 0..=last {
            if index > 0 {
                points[index].previous = Some(index - 1);
            }
            if index < last {
                points[index].next = Some(index + 1);
            }
        }
        let mut chain = Chain {
            remaining: points.len(),
            points,
            head: 0,
            queue: BTreeSet::new(),
            meta,
        };
        for index in 1..last {
            let key = chain.significance_of(index);
            chain.queue.insert((key, index));
        }
        Ok(chain)
    }

    /// Build a chain from a GPX track, flattening all its segments in order
    /// and keeping the track's descriptive fields for the output route.
    pub fn from_track(track: &gpx::Track) -> Result<Self, ChainError> {
        let waypoints = crate::gpx::track_waypoints(track);
        Chain::new(waypoints, RouteMeta::from_track(track))
    }

    /// Number of points currently in the chain.
    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub fn point(&self, index: usize) -> &ChainPoint {
        &self.points[index]
    }

    fn geodesic_distance(&self, from: usize, to: usize) -> f64 {
        Geodesic.distance(
            self.points[from].waypoint.point(),
            self.points[to].waypoint.point(),
        )
    }

    /// Geodesic distance in metres between two points of the chain, or NaN
    /// when the other point is absent.
    pub fn distance_to(&self, from: usize, to: Option<usize>) -> f64 {
        match to {
            Some(to) => self.geodesic_distance(from, to),
            None => f64::NAN,
        }
    }

    /// Angle in radians formed at a point by its two current neighbours,
    /// by the law of cosines on the three geodesic distances.
    ///
    /// NaN for the first and last point. When either adjacent segment has
    /// zero length the angle is π: a zero-length segment carries no
    /// direction, so the duplicate collapses before any real turn. Cached
    /// until a neighbour link changes.
    pub fn turn_angle(&self, index: usize) -> f64 {
        let point = &self.points[index];
        let (Some(previous), Some(next)) = (point.previous, point.next) else {
            return f64::NAN;
        };
        if let Some(angle) = point.angle.get() {
            return angle;
        }
        let a = self.geodesic_distance(previous, index);
        let b = self.geodesic_distance(index, next);
        let angle = if a == 0.0 || b == 0.0 {
            PI
        } else {
            let c = self.geodesic_distance(previous, next);
            // rounding can push the ratio just outside acos' domain
            let cos_gamma = ((a * a + b * b - c * c) / (2.0 * a * b)).clamp(-1.0, 1.0);
            cos_gamma.acos()
        };
        point.angle.set(Some(angle));
        angle
    }

    fn significance_of(&self, index: usize) -> Significance {
        Significance::of_angle(self.turn_angle(index))
    }

    /// Remove the point whose turn angle is closest to a straight line,
    /// re-linking and re-ranking its two neighbours.
    pub fn remove_least_significant(&mut self) -> Result<(), ChainError> {
        let (_, index) = self.queue.pop_first().ok_or(ChainError::Exhausted)?;
        let (Some(left), Some(right)) = (self.points[index].previous, self.points[index].next)
        else {
            unreachable!("queued point {index} is not interior");
        };

        // the neighbours' queue entries (if any: left or right may be an
        // endpoint) still carry their pre-removal angles, drop them before
        // the re-link makes those angles stale
        let left_key = self.significance_of(left);
        self.queue.remove(&(left_key, left));
        let right_key = self.significance_of(right);
        self.queue.remove(&(right_key, right));

        self.points[left].set_next(Some(right));
        self.points[right].set_previous(Some(left));
        self.points[index].set_previous(None);
        self.points[index].set_next(None);

        if self.points[left].is_interior() {
            let key = self.significance_of(left);
            self.queue.insert((key, left));
        }
        if self.points[right].is_interior() {
            let key = self.significance_of(right);
            self.queue.insert((key, right));
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Shrink the chain to exactly `target` points, least significant first.
    /// The first and last point always survive, so `target` must be at least
    /// 2 and at most the current length.
    pub fn reduce_to(&mut self, target: usize) -> Result<(), ChainError> {
        if target < 2 || target > self.remaining {
            return Err(ChainError::InvalidTarget {
                target,
                len: self.remaining,
            });
        }
        let surplus = self.remaining - target;
        for _ in 0..surplus {
            self.remove_least_significant()?;
        }
        Ok(())
    }

    /// The remaining waypoints in track order.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        let mut out = Vec::with_capacity(self.remaining);
        let mut cursor = Some(self.head);
        while let Some(index) = cursor {
            let point = &self.points[index];
            out.push(point.waypoint.clone());
            cursor = point.next;
        }
        out
    }

    /// The chain as a routeable GPX route carrying the source track's
    /// descriptive fields.
    pub fn to_route(&self) -> Route {
        Route {
            name: self.meta.name.clone(),
            comment: self.meta.comment.clone(),
            description: self.meta.description.clone(),
            source: self.meta.source.clone(),
            links: self.meta.links.clone(),
            number: self.meta.number,
            type_: self.meta.type_.clone(),
            points: self.waypoints(),
            ..Route::default()
        }
    }
}
