//! # Elevation profiles
//!
//! `transect` turns a line drawn over a DEM into an along-track
//! elevation profile: evenly spaced `(distance, elevation)` samples,
//! planimetric and slope-corrected lengths, and a chart image keyed by
//! the profile's label.
//!
//! The usual entry point is a [Session], which owns the active DEM,
//! allocates labels, keeps the registry of profiles and persists where
//! their images live.

mod discretize;
mod error;
mod extract;
mod label;
mod math;
mod profile;
mod registry;
mod render;
mod sampler;
mod session;
mod store;
mod transform;

pub use crate::{
    discretize::{discretize, Policy, Station},
    error::TransectError,
    extract::{Extraction, Extractor},
    label::{label, Labeler},
    profile::{Profile, Sample},
    registry::Registry,
    render::{image_path, x_range, y_range, Renderer},
    sampler::{resolve, Fill, NoDataRule, Sampler},
    session::{BatchReport, Session, SessionBuilder, Skipped},
    store::{image_key, locate_image, Store, SAVE_DIR_KEY},
    transform::{Ellipsoid, TransformError, Transformer},
};
pub use {dem, geo};
