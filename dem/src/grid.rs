//! North-up rasters held entirely in memory.

use crate::{Crs, Dem, DemError, C};
use geo::geometry::Coord;
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Affine mapping between pixel and CRS coordinates of a north-up
/// raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner of the upper-left pixel.
    pub origin_x: C,

    /// Y coordinate of the upper-left corner of the upper-left pixel.
    pub origin_y: C,

    /// Pixel width in CRS units.
    pub pixel_width: C,

    /// Pixel height in CRS units (negative for north-up rasters).
    pub pixel_height: C,
}

impl GeoTransform {
    /// A north-up transform with square `cell_size` pixels whose
    /// lower-left corner is at `(xll, yll)`.
    pub fn from_lower_left(xll: C, yll: C, cell_size: C, rows: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let height = rows as C * cell_size;
        Self {
            origin_x: xll,
            origin_y: yll + height,
            pixel_width: cell_size,
            pixel_height: -cell_size,
        }
    }

    /// Converts CRS coordinates to fractional (column, row).
    pub fn geo_to_pixel(&self, coord: Coord<C>) -> (C, C) {
        (
            (coord.x - self.origin_x) / self.pixel_width,
            (coord.y - self.origin_y) / self.pixel_height,
        )
    }

    /// Returns the CRS coordinates of the center of pixel
    /// `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> Coord<C> {
        #[allow(clippy::cast_precision_loss)]
        let (col, row) = (col as C + 0.5, row as C + 0.5);
        Coord {
            x: self.origin_x + col * self.pixel_width,
            y: self.origin_y + row * self.pixel_height,
        }
    }
}

pub struct Grid {
    transform: GeoTransform,

    /// Number of (columns, rows).
    dimensions: (usize, usize),

    crs: Crs,

    nodata: Option<C>,

    /// Samples, north row first.
    samples: Box<[f32]>,
}

impl Grid {
    pub fn new(
        transform: GeoTransform,
        dimensions @ (cols, rows): (usize, usize),
        crs: Crs,
        nodata: Option<C>,
        samples: Vec<f32>,
    ) -> Result<Self, DemError> {
        if samples.len() != cols * rows {
            return Err(DemError::Shape {
                expected: cols * rows,
                actual: samples.len(),
            });
        }
        Ok(Self {
            transform,
            dimensions,
            crs,
            nodata,
            samples: samples.into_boxed_slice(),
        })
    }

    /// Returns a grid whose every cell holds `f` evaluated at the
    /// cell's center.
    pub fn from_fn<F>(
        transform: GeoTransform,
        dimensions @ (cols, rows): (usize, usize),
        crs: Crs,
        f: F,
    ) -> Self
    where
        F: Fn(Coord<C>) -> C,
    {
        #[allow(clippy::cast_possible_truncation)]
        let samples = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (col, row)))
            .map(|(col, row)| f(transform.pixel_center(col, row)) as f32)
            .collect();
        Self {
            transform,
            dimensions,
            crs,
            nodata: None,
            samples,
        }
    }

    /// Sets the value marking cells without a measurement.
    #[must_use]
    pub fn with_nodata(mut self, nodata: C) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Reads an ESRI ASCII grid from `path`.
    ///
    /// The format carries no CRS, so callers must supply it.
    pub fn read_ascii<P: AsRef<Path>>(path: P, crs: Crs) -> Result<Self, DemError> {
        debug!("reading ASCII grid {:?}", path.as_ref());
        Self::parse_ascii(BufReader::new(File::open(path)?), crs)
    }

    /// Parses an ESRI ASCII grid.
    pub fn parse_ascii<R: BufRead>(rdr: R, crs: Crs) -> Result<Self, DemError> {
        let mut header = AsciiHeader::default();
        let mut samples = Vec::new();

        for (idx, line) in rdr.lines().enumerate() {
            let line = line?;
            let mut tokens = line.split_whitespace().peekable();
            let is_header = tokens
                .peek()
                .is_some_and(|tok| tok.starts_with(|c: char| c.is_ascii_alphabetic()));
            if is_header && samples.is_empty() {
                header.parse_line(idx + 1, &line)?;
                continue;
            }
            for tok in tokens {
                let value = tok
                    .parse::<f32>()
                    .map_err(|_| DemError::AsciiData(tok.to_owned()))?;
                samples.push(value);
            }
        }

        let (transform, dimensions, nodata) = header.finish()?;
        Self::new(transform, dimensions, crs, nodata, samples)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Number of (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }
}

impl Dem for Grid {
    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn nodata(&self) -> Option<C> {
        self.nodata
    }

    fn get(&self, coord: Coord<C>) -> Result<Option<C>, DemError> {
        let (col, row) = self.transform.geo_to_pixel(coord);
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return Ok(None);
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        let (cols, rows) = self.dimensions;
        if col >= cols || row >= rows {
            return Ok(None);
        }
        Ok(self.samples.get(row * cols + col).map(|v| C::from(*v)))
    }
}

#[derive(Default)]
struct AsciiHeader {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(C, bool)>,
    yll: Option<(C, bool)>,
    cellsize: Option<C>,
    nodata: Option<C>,
}

impl AsciiHeader {
    fn parse_line(&mut self, line: usize, text: &str) -> Result<(), DemError> {
        let mk_err = |reason: &str| DemError::AsciiHeader {
            line,
            reason: reason.to_owned(),
        };
        let mut tokens = text.split_whitespace();
        let (Some(key), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(mk_err("expected 'key value'"));
        };
        let as_float = || value.parse::<C>().map_err(|_| mk_err("not a number"));
        let as_count = || value.parse::<usize>().map_err(|_| mk_err("not a count"));
        match key.to_ascii_lowercase().as_str() {
            "ncols" => self.ncols = Some(as_count()?),
            "nrows" => self.nrows = Some(as_count()?),
            "xllcorner" => self.xll = Some((as_float()?, false)),
            "xllcenter" => self.xll = Some((as_float()?, true)),
            "yllcorner" => self.yll = Some((as_float()?, false)),
            "yllcenter" => self.yll = Some((as_float()?, true)),
            "cellsize" => self.cellsize = Some(as_float()?),
            "nodata_value" => self.nodata = Some(as_float()?),
            _ => return Err(mk_err("unknown key")),
        }
        Ok(())
    }

    fn finish(self) -> Result<(GeoTransform, (usize, usize), Option<C>), DemError> {
        let missing = |key: &str| DemError::AsciiHeader {
            line: 0,
            reason: format!("missing {key}"),
        };
        let ncols = self.ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = self.nrows.ok_or_else(|| missing("nrows"))?;
        let cellsize = self.cellsize.ok_or_else(|| missing("cellsize"))?;
        let (xll, x_center) = self.xll.ok_or_else(|| missing("xllcorner"))?;
        let (yll, y_center) = self.yll.ok_or_else(|| missing("yllcorner"))?;
        let xll = if x_center { xll - cellsize / 2.0 } else { xll };
        let yll = if y_center { yll - cellsize / 2.0 } else { yll };
        let transform = GeoTransform::from_lower_left(xll, yll, cellsize, nrows);
        Ok((transform, (ncols, nrows), self.nodata))
    }
}
