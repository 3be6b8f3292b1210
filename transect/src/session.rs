use crate::{
    image_key, Ellipsoid, Extractor, Fill, Labeler, NoDataRule, Policy, Profile, Registry,
    Renderer, Sampler, Store, TransectError, Transformer, SAVE_DIR_KEY,
};
use dem::{Crs, Dem};
use geo::{Coord, LineString};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc};

/// Outcome of [Session::batch].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Labels of the registered profiles, in input order.
    pub labels: Vec<String>,

    /// Lines that produced no profile.
    pub skipped: Vec<Skipped>,
}

/// A batch line that failed, and why.
#[derive(Debug)]
pub struct Skipped {
    /// Position of the line in the batch input.
    pub index: usize,
    pub error: TransectError,
}

/// Everything needed to turn drawn lines into labeled, rendered
/// profiles: the active DEM, the display CRS lines are drawn in,
/// label allocation, the profile registry and the project store.
pub struct Session {
    dem: Arc<dyn Dem>,
    display_crs: Crs,
    transformer: Transformer,
    sampler: Sampler,
    renderer: Renderer,
    store: Option<Store>,
    labeler: Labeler,
    registry: Registry,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            dem: None,
            display_crs: None,
            ellipsoid: Ellipsoid::default(),
            nodata_rule: NoDataRule::default(),
            output_dir: None,
            store: None,
        }
    }

    /// Extracts, labels and registers the profile of `line`, drawn in
    /// the display CRS.
    ///
    /// A failed extraction consumes no label.
    pub fn profile(
        &mut self,
        line: &LineString<f64>,
        policy: Policy,
        fill: Fill,
    ) -> Result<&Profile, TransectError> {
        let extraction = Extractor::new(&*self.dem, self.transformer, self.sampler).extract(
            line,
            &self.display_crs,
            policy,
            fill,
        )?;
        let profile = extraction.into_profile(self.labeler.next_label());
        self.registry.register(profile).map(|profile| &*profile)
    }

    /// Quick profile between two clicked points.
    pub fn two_click(&mut self, a: Coord<f64>, b: Coord<f64>) -> Result<&Profile, TransectError> {
        let line = LineString::from(vec![a, b]);
        self.profile(&line, Policy::FixedCap, Fill::CarryForward)
    }

    /// Profiles every line of a batch. A line that yields no profile
    /// is recorded and skipped.
    ///
    /// A label collision means the label counter and the registry
    /// disagree; it stops the batch and is returned as is.
    pub fn batch(&mut self, lines: &[LineString<f64>]) -> Result<BatchReport, TransectError> {
        let mut report = BatchReport::default();
        for (index, line) in lines.iter().enumerate() {
            match self.profile(line, Policy::LengthScaled, Fill::Strict) {
                Ok(profile) => report.labels.push(profile.label.clone()),
                Err(error @ TransectError::DuplicateLabel(_)) => return Err(error),
                Err(error) => {
                    warn!("skipping batch line {index}: {error}");
                    report.skipped.push(Skipped { index, error });
                }
            }
        }
        info!(
            "batch; lines: {}, profiles: {}, skipped: {}",
            lines.len(),
            report.labels.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Renders profile `label`, records its image path on the profile
    /// and in the store, and saves the store.
    pub fn render(&mut self, label: &str) -> Result<PathBuf, TransectError> {
        let profile = self
            .registry
            .get(label)
            .ok_or_else(|| TransectError::UnknownLabel(label.to_owned()))?;
        let path = self.renderer.render(profile)?;

        if let Some(profile) = self.registry.get_mut(label) {
            profile.image_path = Some(path.clone());
        }

        if let Some(store) = self.store.as_mut() {
            store.write_entry(image_key(label), path.to_string_lossy());
            store.write_entry(SAVE_DIR_KEY, self.renderer.output_dir().to_string_lossy());
            store.save()?;
        }

        Ok(path)
    }

    /// Renders every profile that has no image yet. Failures are
    /// returned alongside their label rather than stopping the pass.
    pub fn render_pending(&mut self) -> Vec<(String, TransectError)> {
        let pending = self
            .registry
            .pending()
            .map(|p| p.label.clone())
            .collect::<Vec<_>>();
        pending
            .into_iter()
            .filter_map(|label| match self.render(&label) {
                Ok(_) => None,
                Err(e) => {
                    warn!("rendering profile {label}: {e}");
                    Some((label, e))
                }
            })
            .collect()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    pub fn dem(&self) -> &dyn Dem {
        &*self.dem
    }

    pub fn display_crs(&self) -> &Crs {
        &self.display_crs
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Replaces the active DEM. Existing profiles are kept.
    pub fn set_dem(&mut self, dem: Arc<dyn Dem>) {
        info!("active DEM now in {}", dem.crs());
        self.dem = dem;
    }
}

pub struct SessionBuilder {
    /// Raster sampled for elevations (required).
    dem: Option<Arc<dyn Dem>>,

    /// CRS of drawn lines (defaults to the DEM's CRS).
    display_crs: Option<Crs>,

    /// Ellipsoid for true lengths (defaults to WGS84).
    ellipsoid: Ellipsoid,

    /// Which raw values are no-data (defaults to sentinel and zero).
    nodata_rule: NoDataRule,

    /// Where charts are written (defaults to the store's save
    /// directory, then the system temp directory).
    output_dir: Option<PathBuf>,

    /// Project settings (optional).
    store: Option<Store>,
}

impl SessionBuilder {
    /// Raster sampled for elevations (required).
    #[must_use]
    pub fn dem(mut self, dem: Arc<dyn Dem>) -> Self {
        self.dem = Some(dem);
        self
    }

    /// CRS of drawn lines (defaults to the DEM's CRS).
    #[must_use]
    pub fn display_crs(mut self, crs: Crs) -> Self {
        self.display_crs = Some(crs);
        self
    }

    #[must_use]
    pub fn ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    #[must_use]
    pub fn nodata_rule(mut self, rule: NoDataRule) -> Self {
        self.nodata_rule = rule;
        self
    }

    #[must_use]
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Session, TransectError> {
        let dem = self.dem.ok_or(TransectError::Builder("dem"))?;
        let display_crs = self.display_crs.unwrap_or_else(|| *dem.crs());
        let output_dir = self.output_dir.or_else(|| {
            self.store
                .as_ref()
                .and_then(|store| store.read_entry(SAVE_DIR_KEY))
                .map(PathBuf::from)
        });
        Ok(Session {
            dem,
            display_crs,
            transformer: Transformer::new(self.ellipsoid),
            sampler: Sampler::new(self.nodata_rule),
            renderer: Renderer::new(output_dir),
            store: self.store,
            labeler: Labeler::new(),
            registry: Registry::new(),
        })
    }
}
