//! Profile charts.
//!
//! Charts carry no text: titles and axis annotations belong to
//! whatever layout embeds the image, so no fonts are needed here.

use crate::{Profile, Sample, TransectError};
use log::info;
use plotters::prelude::*;
use std::{
    error::Error,
    ops::Range,
    path::{Path, PathBuf},
};

const DEFAULT_SIZE: (u32, u32) = (800, 400);

const TERRAIN: RGBColor = RGBColor(139, 90, 43);
const MARKER: RGBColor = RGBColor(120, 120, 120);

/// Returns where the chart of profile `label` lives under `dir`.
pub fn image_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("profile_{label}.png"))
}

/// Horizontal extent of a chart: from the origin to the last
/// sample.
pub fn x_range(samples: &[Sample]) -> Range<f64> {
    0.0..samples.last().map_or(0.0, |s| s.distance)
}

/// Vertical extent of a chart: the elevation range padded by 10% on
/// both sides, or by 1 when flat. `None` for no elevations.
pub fn y_range<I: IntoIterator<Item = f64>>(elevations: I) -> Option<Range<f64>> {
    let (lo, hi) = elevations
        .into_iter()
        .fold(None, |acc: Option<(f64, f64)>, z| match acc {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        })?;
    let margin = if hi > lo { 0.1 * (hi - lo) } else { 1.0 };
    Some((lo - margin)..(hi + margin))
}

/// Draws profile charts as PNG files into a directory.
#[derive(Debug, Clone)]
pub struct Renderer {
    output_dir: PathBuf,
    size: (u32, u32),
}

impl Renderer {
    /// `output_dir` falls back to the system temp directory.
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.unwrap_or_else(std::env::temp_dir),
            size: DEFAULT_SIZE,
        }
    }

    /// Image dimensions in pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn image_path(&self, label: &str) -> PathBuf {
        image_path(&self.output_dir, label)
    }

    /// Renders `profile` and returns the image path. Rendering the
    /// same label again overwrites the image.
    pub fn render(&self, profile: &Profile) -> Result<PathBuf, TransectError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.image_path(&profile.label);
        self.draw(&path, profile)
            .map_err(|e| TransectError::Render {
                label: profile.label.clone(),
                reason: e.to_string(),
            })?;
        info!("rendered profile {} to {:?}", profile.label, path);
        Ok(path)
    }

    fn draw(&self, path: &Path, profile: &Profile) -> Result<(), Box<dyn Error>> {
        let xs = x_range(&profile.samples);
        let ys = y_range(profile.valid().map(|(_, z)| z)).ok_or("no valid samples")?;

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(xs.clone(), ys.clone())?;

        // Each run of valid samples is drawn on its own so no-data
        // shows as a gap.
        for run in runs(&profile.samples) {
            chart.draw_series(
                AreaSeries::new(run.iter().copied(), ys.start, TERRAIN.mix(0.3))
                    .border_style(TERRAIN.stroke_width(2)),
            )?;
        }

        if let Some((lo, hi)) = profile.elevation_range() {
            for z in [lo, hi] {
                chart.draw_series(LineSeries::new(
                    [(xs.start, z), (xs.end, z)],
                    MARKER.stroke_width(1),
                ))?;
            }
        }

        root.present()?;
        Ok(())
    }
}

/// Splits samples into maximal runs of valid `(distance, elevation)`.
fn runs(samples: &[Sample]) -> Vec<Vec<(f64, f64)>> {
    samples
        .split(|s| s.elevation.is_none())
        .filter(|run| !run.is_empty())
        .map(|run| {
            run.iter()
                .filter_map(|s| s.elevation.map(|z| (s.distance, z)))
                .collect()
        })
        .collect()
}
