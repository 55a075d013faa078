//! Tracking core for a single UWB tag: safespace membership, travelled
//! distance, trail and projection onto a rotatable map.

pub mod config;
pub mod distance;
pub mod error;
pub mod mapper;
pub mod monitor;
pub mod sample;
pub mod tag;
pub mod worker;
pub mod zone;

pub use config::*;
pub use distance::{DistanceTracker, Trail};
pub use error::*;
pub use mapper::*;
pub use monitor::*;
pub use sample::*;
pub use tag::*;
pub use worker::{Event, Worker};
pub use zone::*;
