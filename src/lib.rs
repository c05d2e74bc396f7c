//! technician-planner core
//!
//! Assigns maintenance technicians to bike-share jobs: geographic territories,
//! count and time balancing, and nearest-neighbor route sequencing.

pub mod traits;
pub mod models;
pub mod error;
pub mod haversine;
pub mod sequencer;
pub mod clustering;
pub mod balancer;
pub mod planner;
pub mod intake;
pub mod source;
