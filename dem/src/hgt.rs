//! NASADEM/SRTM elevation (`.hgt`) tiles.
//!
//! A tile is a square grid of big-endian `i16` samples covering one
//! degree of latitude and longitude, stored north row first. Sample
//! centers sit on whole arcsecond multiples, so the first and last
//! rows and columns overlap the neighboring tiles. The southwest
//! corner is encoded in the file name (`N44W072.hgt`) and the
//! resolution (1 or 3 arcseconds) is implied by the file length.

use crate::{Crs, Dem, DemError, C};
use byteorder::{BigEndian as BE, ByteOrder, ReadBytesExt};
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, path::Path};

const ARCSEC_PER_DEG: C = 3600.0;

/// Value SRTM uses for voids.
const VOID: i16 = i16::MIN;

pub struct Tile {
    /// Center of the southwest-most sample, which is also the
    /// tile's nominal corner.
    origin: Coord<C>,

    /// Arcseconds between neighboring samples.
    arcsec: u8,

    /// Samples per row and per column.
    side: usize,

    samples: Samples,
}

enum Samples {
    Parsed(Box<[i16]>),
    Mapped(Mmap),
}

impl Samples {
    fn get(&self, idx: usize) -> Option<i16> {
        match self {
            Self::Parsed(samples) => samples.get(idx).copied(),
            Self::Mapped(raw) => raw.get(2 * idx..2 * idx + 2).map(BE::read_i16),
        }
    }
}

/// Where a tile's samples live.
///
/// Which is faster depends on access patterns; measure both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse every sample into memory up front.
    InMem,

    /// Memory map the file and decode samples on access.
    MemMap,
}

impl Tile {
    pub fn open<P: AsRef<Path>>(path: P, mode: TileMode) -> Result<Self, DemError> {
        match mode {
            TileMode::InMem => Self::load(path),
            TileMode::MemMap => Self::memmap(path),
        }
    }

    /// Parses the tile at `path` into memory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DemError> {
        let path = path.as_ref();
        let (arcsec, side) = arcsec_and_side(path)?;
        let origin = origin(path)?;
        debug!("loading {path:?}");

        let mut samples = vec![0_i16; side * side];
        BufReader::new(File::open(path)?).read_i16_into::<BE>(&mut samples)?;

        Ok(Self {
            origin,
            arcsec,
            side,
            samples: Samples::Parsed(samples.into_boxed_slice()),
        })
    }

    /// Memory maps the tile at `path`.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, DemError> {
        let path = path.as_ref();
        let (arcsec, side) = arcsec_and_side(path)?;
        let origin = origin(path)?;
        debug!("mapping {path:?}");

        let file = File::open(path)?;
        // SAFETY: tiles are treated as read-only for the lifetime of
        // the map.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            origin,
            arcsec,
            side,
            samples: Samples::Mapped(mmap),
        })
    }

    /// Number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.side * self.side
    }

    /// Arcseconds per sample.
    pub fn resolution(&self) -> u8 {
        self.arcsec
    }

    /// Returns the raw sample nearest to `coord`, or `None` outside
    /// the tile.
    pub fn sample(&self, coord: Coord<C>) -> Option<i16> {
        let (col, row) = self.nearest(coord);
        let col = usize::try_from(col).ok().filter(|&col| col < self.side)?;
        let row = usize::try_from(row).ok().filter(|&row| row < self.side)?;
        // Rows are stored north first; `row` counts from the south.
        self.samples.get(self.side * (self.side - row - 1) + col)
    }

    /// Returns the (column, row) of the sample nearest to `coord`,
    /// counted from the southwest-most sample.
    fn nearest(&self, coord: Coord<C>) -> (i64, i64) {
        let per_deg = ARCSEC_PER_DEG / C::from(self.arcsec);
        #[allow(clippy::cast_possible_truncation)]
        let to_index = |offset: C| (offset * per_deg).round() as i64;
        (
            to_index(coord.x - self.origin.x),
            to_index(coord.y - self.origin.y),
        )
    }
}

impl Dem for Tile {
    fn crs(&self) -> &Crs {
        &Crs::Geographic
    }

    fn nodata(&self) -> Option<C> {
        Some(C::from(VOID))
    }

    fn get(&self, coord: Coord<C>) -> Result<Option<C>, DemError> {
        Ok(self.sample(coord).map(C::from))
    }
}

/// Infers (arcseconds per sample, samples per side) from the file
/// length.
fn arcsec_and_side(path: &Path) -> Result<(u8, usize), DemError> {
    const ONE_ARCSEC_LEN: u64 = 3601 * 3601 * 2;
    const THREE_ARCSEC_LEN: u64 = 1201 * 1201 * 2;
    match path.metadata()?.len() {
        ONE_ARCSEC_LEN => Ok((1, 3601)),
        THREE_ARCSEC_LEN => Ok((3, 1201)),
        len => Err(DemError::HgtLen(len, path.to_owned())),
    }
}

fn origin(path: &Path) -> Result<Coord<C>, DemError> {
    let Coord { x, y } = parse_sw_corner(path)?;
    Ok(Coord {
        x: C::from(x),
        y: C::from(y),
    })
}

/// Parses whole-degree (lon, lat) of a tile's southwest corner from
/// names like `N44W072.hgt`, in either case.
fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, DemError> {
    let path = path.as_ref();
    let invalid = || DemError::HgtName(path.to_owned());
    let stem = path
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|stem| stem.len() == 7 && stem.is_ascii())
        .ok_or_else(invalid)?
        .to_ascii_uppercase();
    let (lat, lon) = stem.split_at(3);
    let degrees = |field: &str, pos: char, neg: char| -> Option<i16> {
        let (hemisphere, digits) = field.split_at(1);
        let magnitude = digits.parse::<i16>().ok()?;
        match hemisphere.chars().next()? {
            c if c == pos => Some(magnitude),
            c if c == neg => Some(-magnitude),
            _ => None,
        }
    };
    Ok(Coord {
        x: degrees(lon, 'E', 'W').ok_or_else(invalid)?,
        y: degrees(lat, 'N', 'S').ok_or_else(invalid)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_sw_corner, Coord, Tile, TileMode, VOID};
    use crate::{Crs, Dem};
    use byteorder::{BigEndian as BE, WriteBytesExt};
    use std::{fs::File, io::BufWriter, path::PathBuf};

    const DIM: usize = 1201;

    /// Writes a 3-arcsecond tile whose sample at (x, y) is `x + y`,
    /// except for a single void at (10, 10).
    fn synthetic_tile(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("N44W072.hgt");
        let mut out = BufWriter::new(File::create(&path).unwrap());
        for y in (0..DIM).rev() {
            for x in 0..DIM {
                let sample = if (x, y) == (10, 10) {
                    VOID
                } else {
                    i16::try_from(x + y).unwrap()
                };
                out.write_i16::<BE>(sample).unwrap();
            }
        }
        drop(out);
        path
    }

    #[allow(clippy::cast_precision_loss)]
    fn coord_of(x: usize, y: usize) -> Coord {
        Coord {
            x: -72.0 + (x as f64 * 3.0) / 3600.0,
            y: 44.0 + (y as f64 * 3.0) / 3600.0,
        }
    }

    #[test]
    fn test_parse_hgt_name() {
        let sw_corner = parse_sw_corner("data/N44W072.hgt").unwrap();
        assert_eq!(sw_corner, Coord { x: -72, y: 44 });
        let sw_corner = parse_sw_corner("s01e000.hgt").unwrap();
        assert_eq!(sw_corner, Coord { x: 0, y: -1 });
        assert!(parse_sw_corner("N44W72.hgt").is_err());
        assert!(parse_sw_corner("X44W072.hgt").is_err());
    }

    #[test]
    fn test_bad_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("N44W072.hgt");
        std::fs::write(&path, [0_u8; 16]).unwrap();
        assert!(Tile::load(&path).is_err());
    }

    #[test]
    fn test_tile_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = synthetic_tile(&dir);
        let parsed = Tile::open(&path, TileMode::InMem).unwrap();
        let mapped = Tile::open(&path, TileMode::MemMap).unwrap();
        assert_eq!(parsed.resolution(), 3);
        assert_eq!(parsed.len(), DIM * DIM);
        for (x, y) in [(0, 0), (1200, 0), (0, 1200), (1200, 1200), (600, 17)] {
            let expected = i16::try_from(x + y).unwrap();
            assert_eq!(parsed.sample(coord_of(x, y)), Some(expected));
            assert_eq!(mapped.sample(coord_of(x, y)), Some(expected));
        }
    }

    #[test]
    fn test_void_is_reported_raw() {
        let dir = tempfile::tempdir().unwrap();
        let tile = Tile::load(synthetic_tile(&dir)).unwrap();
        assert_eq!(tile.crs(), &Crs::Geographic);
        assert_eq!(tile.nodata(), Some(-32768.0));
        assert_eq!(tile.get(coord_of(10, 10)).unwrap(), Some(-32768.0));
    }

    #[test]
    fn test_out_of_bounds_get_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let tile = Tile::memmap(synthetic_tile(&dir)).unwrap();
        // A smidge north of tile.
        assert_eq!(tile.sample(Coord { x: -71.5, y: 45.1 }), None);
        // A smidge east of tile.
        assert_eq!(tile.sample(Coord { x: -70.9, y: 44.5 }), None);
        // A smidge south of tile.
        assert_eq!(tile.sample(Coord { x: -71.5, y: 43.9 }), None);
        // A smidge west of tile.
        assert_eq!(tile.sample(Coord { x: -72.1, y: 44.5 }), None);
        assert_eq!(tile.get(Coord { x: -72.1, y: 44.5 }).unwrap(), None);
    }
}
