//! Convert GPX tracks into routeable GPX routes by greedily dropping the
//! track points closest to collinear with their neighbours until a target
//! point count remains.

pub mod chain;
pub mod gpx;
pub mod simplify;

pub use crate::chain::{Chain, ChainError, ChainPoint, RouteMeta};
pub use crate::gpx::{convert, track_to_route, track_waypoints, ConvertError, ConvertOptions};
pub use crate::simplify::simplify_track;
