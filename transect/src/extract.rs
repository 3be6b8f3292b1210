use crate::{
    discretize,
    profile::{slope_length, valid},
    resolve, Fill, Policy, Profile, Sample, Sampler, TransectError, TransformError, Transformer,
};
use dem::{Crs, Dem};
use geo::{Coord, LineString};
use log::debug;

/// An unlabeled profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub crs: Crs,
    pub line: LineString<f64>,
    pub policy: Policy,
    pub samples: Vec<Sample>,
    pub length_2d: f64,
    pub length_3d: f64,
    pub true_length: Option<f64>,
    pub elevation_start: f64,
    pub elevation_end: f64,
}

impl Extraction {
    pub fn into_profile(self, label: String) -> Profile {
        Profile {
            label,
            crs: self.crs,
            line: self.line,
            policy: self.policy,
            samples: self.samples,
            length_2d: self.length_2d,
            length_3d: self.length_3d,
            true_length: self.true_length,
            elevation_start: self.elevation_start,
            elevation_end: self.elevation_end,
            image_path: None,
        }
    }
}

/// Samples a DEM along lines.
pub struct Extractor<'a> {
    dem: &'a dyn Dem,
    transformer: Transformer,
    sampler: Sampler,
}

impl<'a> Extractor<'a> {
    pub fn new(dem: &'a dyn Dem, transformer: Transformer, sampler: Sampler) -> Self {
        Self {
            dem,
            transformer,
            sampler,
        }
    }

    /// Builds the elevation series of `line` (expressed in `crs`).
    ///
    /// Fails when the line is degenerate, or when fewer than two
    /// samples carry an elevation after `fill` is applied. A line with
    /// no genuine DEM reading at all is rejected under every fill.
    pub fn extract(
        &self,
        line: &LineString<f64>,
        crs: &Crs,
        policy: Policy,
        fill: Fill,
    ) -> Result<Extraction, TransectError> {
        let (stations, path_runtime) = {
            let now = std::time::Instant::now();
            let stations = discretize(line, crs, policy, &self.transformer)?;
            (stations, now.elapsed())
        };

        let (raw, terrain_runtime) = {
            let now = std::time::Instant::now();
            let raw: Vec<Option<f64>> = stations
                .iter()
                .map(|station| self.elevation(station.coord, crs))
                .collect();
            (raw, now.elapsed())
        };

        debug!(
            "extract; len: {}, path_exec: {:?}, terrain_exec: {:?}",
            stations.len(),
            path_runtime,
            terrain_runtime
        );

        let total = raw.len();
        let genuine = raw.iter().flatten().count();
        let resolved = resolve(&raw, fill);
        let valid_count = resolved.iter().flatten().count();
        if genuine == 0 || valid_count < 2 {
            return Err(TransectError::InsufficientSamples {
                valid: genuine.min(valid_count),
                total,
            });
        }

        let samples: Vec<Sample> = stations
            .iter()
            .zip(resolved)
            .map(|(station, elevation)| Sample {
                distance: station.distance,
                elevation,
            })
            .collect();

        let true_length = self.transformer.true_length(line, crs);
        // The last station sits on the final vertex.
        let length_2d = samples.last().map_or(0.0, |s| s.distance);
        let length_3d = slope_length(&samples);

        // At least two valid samples exist, so both ends are found.
        let mut valid_elevations = valid(&samples).map(|(_, z)| z);
        let elevation_start = valid_elevations.next().unwrap_or_default();
        let elevation_end = valid_elevations.last().unwrap_or(elevation_start);

        Ok(Extraction {
            crs: *crs,
            line: line.clone(),
            policy,
            samples,
            length_2d,
            length_3d,
            true_length,
            elevation_start,
            elevation_end,
        })
    }

    /// Reprojects `coord` into the DEM's CRS and samples it.
    fn elevation(&self, coord: Coord<f64>, crs: &Crs) -> Option<f64> {
        let dem_crs = self.dem.crs();
        let coord = match self.transformer.try_transform(coord, crs, dem_crs) {
            Ok(coord) => coord,
            Err(e @ TransformError::Unsupported { .. }) => {
                debug!("{e}, sampling untransformed");
                coord
            }
            Err(e @ TransformError::NonFinite { .. }) => {
                debug!("{e}");
                return None;
            }
        };
        self.sampler.sample(self.dem, coord)
    }
}
