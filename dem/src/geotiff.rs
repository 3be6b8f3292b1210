//! GeoTIFF rasters, read whole into a [Grid].

use crate::{Crs, DemError, GeoTransform, Grid};
use log::debug;
use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};
use tiff::{
    decoder::{Decoder, DecodingResult},
    tags::Tag,
};

/// GeoKey ids, see OGC GeoTIFF 1.1 section 7.
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

impl Grid {
    /// Reads the first band of a north-up GeoTIFF from `path`.
    ///
    /// The CRS is taken from the file's GeoKeys. `fallback` is used
    /// when they do not name one this crate knows.
    pub fn read_geotiff<P: AsRef<Path>>(path: P, fallback: Crs) -> Result<Self, DemError> {
        debug!("reading GeoTIFF {:?}", path.as_ref());
        Self::decode_geotiff(BufReader::new(File::open(path)?), fallback)
    }

    /// Decodes the first band of a north-up GeoTIFF.
    pub fn decode_geotiff<R: Read + Seek>(reader: R, fallback: Crs) -> Result<Self, DemError> {
        let mut decoder = Decoder::new(reader)?;
        let (width, height) = decoder.dimensions()?;
        let (cols, rows) = (width as usize, height as usize);

        let scale = decoder
            .find_tag(Tag::ModelPixelScaleTag)?
            .ok_or(DemError::GeoTiff("missing ModelPixelScaleTag"))?
            .into_f64_vec()?;
        let tiepoint = decoder
            .find_tag(Tag::ModelTiepointTag)?
            .ok_or(DemError::GeoTiff("missing ModelTiepointTag"))?
            .into_f64_vec()?;
        let (&[sx, sy, ..], &[i, j, _, x, y, ..]) = (scale.as_slice(), tiepoint.as_slice()) else {
            return Err(DemError::GeoTiff("short georeferencing tag"));
        };
        let keys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(value) => value.into_u16_vec()?,
            None => Vec::new(),
        };
        let nodata = match decoder.find_tag(Tag::GdalNodata)? {
            Some(value) => value.into_string()?.trim_matches(char::from(0)).trim().parse().ok(),
            None => None,
        };

        // Tiepoints of point rasters sit on pixel centers.
        let half = if geo_key(&keys, GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
            0.5
        } else {
            0.0
        };
        let transform = GeoTransform {
            origin_x: x - (i + half) * sx,
            origin_y: y + (j + half) * sy,
            pixel_width: sx,
            pixel_height: -sy,
        };

        let crs = [PROJECTED_CS_TYPE, GEOGRAPHIC_TYPE]
            .into_iter()
            .filter_map(|key| geo_key(&keys, key))
            .filter(|&code| code != USER_DEFINED)
            .find_map(|code| Crs::from_epsg(u32::from(code)))
            .unwrap_or_else(|| {
                debug!("GeoTIFF names no known CRS, assuming {fallback}");
                fallback
            });

        let mut samples = to_f32(decoder.read_image()?);
        let bands = samples.len() / (cols * rows).max(1);
        if bands > 1 {
            samples = samples.into_iter().step_by(bands).collect();
        }
        Grid::new(transform, (cols, rows), crs, nodata, samples)
    }
}

/// Returns the inline value of `key` from a GeoKeyDirectoryTag.
fn geo_key(directory: &[u16], key: u16) -> Option<u16> {
    directory
        .get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_f32(image: DecodingResult) -> Vec<f32> {
    match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|z| z as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|z| z as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|z| z as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|z| z as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|z| z as f32).collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Crs, Dem, DemError, Grid};
    use geo::coord;
    use std::{fs::File, path::Path};
    use tiff::{
        encoder::{colortype, TiffEncoder},
        tags::Tag,
    };

    fn write_utm_tiff(path: &Path) {
        let mut file = File::create(path).unwrap();
        let mut tiff = TiffEncoder::new(&mut file).unwrap();
        let mut image = tiff.new_image::<colortype::Gray32Float>(3, 2).unwrap();
        let tags = image.encoder();
        tags.write_tag(Tag::ModelPixelScaleTag, &[10.0_f64, 10.0, 0.0][..])
            .unwrap();
        tags.write_tag(
            Tag::ModelTiepointTag,
            &[0.0_f64, 0.0, 0.0, 500_000.0, 4_000_020.0, 0.0][..],
        )
        .unwrap();
        tags.write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1_u16, 1, 0, 2, 1025, 0, 1, 1, 3072, 0, 1, 32633][..],
        )
        .unwrap();
        tags.write_tag(Tag::GdalNodata, "-9999").unwrap();
        image
            .write_data(&[1.0_f32, 2.0, 3.0, 4.0, -9999.0, 6.0])
            .unwrap();
    }

    #[test]
    fn test_read_projected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipped_dem.tif");
        write_utm_tiff(&path);

        let grid = Grid::read_geotiff(&path, Crs::Local).unwrap();
        assert_eq!(grid.dimensions(), (3, 2));
        assert_eq!(
            grid.crs(),
            &Crs::Utm {
                zone: 33,
                north: true
            }
        );
        assert_eq!(grid.nodata(), Some(-9999.0));
        assert_eq!(grid.get(coord!(x: 500_005.0, y: 4_000_015.0)).unwrap(), Some(1.0));
        assert_eq!(grid.get(coord!(x: 500_025.0, y: 4_000_005.0)).unwrap(), Some(6.0));
        assert_eq!(
            grid.get(coord!(x: 500_015.0, y: 4_000_005.0)).unwrap(),
            Some(-9999.0)
        );
        assert_eq!(grid.get(coord!(x: 500_031.0, y: 4_000_005.0)).unwrap(), None);
    }

    #[test]
    fn test_read_point_registered_geographic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tiff");
        {
            let mut file = File::create(&path).unwrap();
            let mut tiff = TiffEncoder::new(&mut file).unwrap();
            let mut image = tiff.new_image::<colortype::Gray16>(2, 2).unwrap();
            let tags = image.encoder();
            tags.write_tag(Tag::ModelPixelScaleTag, &[0.5_f64, 0.5, 0.0][..])
                .unwrap();
            tags.write_tag(
                Tag::ModelTiepointTag,
                &[0.0_f64, 0.0, 0.0, 10.0, 46.0, 0.0][..],
            )
            .unwrap();
            tags.write_tag(
                Tag::GeoKeyDirectoryTag,
                &[1_u16, 1, 0, 2, 1025, 0, 1, 2, 2048, 0, 1, 4326][..],
            )
            .unwrap();
            image.write_data(&[100_u16, 200, 300, 400]).unwrap();
        }

        let grid = Grid::read_geotiff(&path, Crs::Local).unwrap();
        assert_eq!(grid.crs(), &Crs::Geographic);
        assert_eq!(grid.nodata(), None);
        assert_eq!(grid.get(coord!(x: 10.0, y: 46.0)).unwrap(), Some(100.0));
        assert_eq!(grid.get(coord!(x: 10.5, y: 46.0)).unwrap(), Some(200.0));
        assert_eq!(grid.get(coord!(x: 10.4, y: 45.6)).unwrap(), Some(400.0));
        assert_eq!(grid.get(coord!(x: 9.7, y: 46.0)).unwrap(), None);
    }

    #[test]
    fn test_fallback_crs_and_missing_georeferencing() {
        let dir = tempfile::tempdir().unwrap();

        let user_defined = dir.path().join("user_defined.tif");
        {
            let mut file = File::create(&user_defined).unwrap();
            let mut tiff = TiffEncoder::new(&mut file).unwrap();
            let mut image = tiff.new_image::<colortype::Gray32Float>(1, 1).unwrap();
            let tags = image.encoder();
            tags.write_tag(Tag::ModelPixelScaleTag, &[1.0_f64, 1.0, 0.0][..])
                .unwrap();
            tags.write_tag(Tag::ModelTiepointTag, &[0.0_f64, 0.0, 0.0, 0.0, 1.0, 0.0][..])
                .unwrap();
            tags.write_tag(Tag::GeoKeyDirectoryTag, &[1_u16, 1, 0, 1, 3072, 0, 1, 32767][..])
                .unwrap();
            image.write_data(&[7.0_f32]).unwrap();
        }
        let grid = Grid::read_geotiff(&user_defined, Crs::Epsg(3003)).unwrap();
        assert_eq!(grid.crs(), &Crs::Epsg(3003));
        assert_eq!(grid.get(coord!(x: 0.5, y: 0.5)).unwrap(), Some(7.0));

        let bare = dir.path().join("bare.tif");
        {
            let mut file = File::create(&bare).unwrap();
            let mut tiff = TiffEncoder::new(&mut file).unwrap();
            tiff.write_image::<colortype::Gray32Float>(1, 1, &[7.0_f32])
                .unwrap();
        }
        assert!(matches!(
            Grid::read_geotiff(&bare, Crs::Local),
            Err(DemError::GeoTiff(_))
        ));
    }
}
