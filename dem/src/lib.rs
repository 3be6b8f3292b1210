//! Digital elevation model rasters.
//!
//! Every raster in this crate answers the same question: what is the
//! raw cell value under a coordinate expressed in the raster's own
//! CRS. Deciding what counts as _valid_ elevation is left to callers,
//! which is why [Dem::nodata] exposes the raster's sentinel instead of
//! filtering it.
//!
//! # References
//!
//! 1. [30-Meter SRTM Tile Downloader](https://dwtkns.com/srtm30m)
//! 1. [Archive Team](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [OGC GeoTIFF](https://docs.ogc.org/is/19-008r4/19-008r4.html)
//! 1. [ESRI ASCII raster format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/esri-ascii-raster-format.htm)

mod crs;
mod error;
mod geotiff;
mod grid;
mod hgt;

pub use crate::{
    crs::Crs,
    error::DemError,
    grid::{GeoTransform, Grid},
    hgt::{Tile, TileMode},
};
pub use geo;

use geo::geometry::Coord;

/// Base floating point type used for all coordinates and elevations.
pub type C = f64;

/// A single, randomly addressable elevation raster.
pub trait Dem {
    /// The CRS this raster's coordinates are expressed in.
    fn crs(&self) -> &Crs;

    /// Raw value this raster uses to mark cells without a measurement.
    fn nodata(&self) -> Option<C>;

    /// Returns the raw cell value under `coord`, or `None` when
    /// `coord` lies outside the raster's extent.
    fn get(&self, coord: Coord<C>) -> Result<Option<C>, DemError>;
}

impl<T: Dem + ?Sized> Dem for std::sync::Arc<T> {
    fn crs(&self) -> &Crs {
        (**self).crs()
    }

    fn nodata(&self) -> Option<C> {
        (**self).nodata()
    }

    fn get(&self, coord: Coord<C>) -> Result<Option<C>, DemError> {
        (**self).get(coord)
    }
}
