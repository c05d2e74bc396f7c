//! Test fixtures for technician-planner.
//!
//! Provides realistic test data including:
//! - Saint-Étienne neighbourhood locations (approximate, rounded to ~10 m)
//! - A JSON job list served by the HTTP source integration test

#![allow(dead_code)]

pub mod saint_etienne_locations;

pub use saint_etienne_locations::*;
