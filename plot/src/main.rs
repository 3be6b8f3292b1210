mod options;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use dem::{Crs, Dem, Grid, Tile, TileMode};
use geo::LineString;
use log::info;
use options::{Cli, Command as CliCmd, Format};
use serde::Serialize;
use std::{io::Write, path::Path, sync::Arc};
use textplots::{Chart, Plot, Shape};
use transect::{locate_image, NoDataRule, Profile, Session, Store};

fn main() -> Result<(), AnyError> {
    let Cli {
        dem,
        dem_crs,
        display_crs,
        out_dir,
        store,
        zero_is_data,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let store = store.map(Store::open).transpose()?;

    let mut builder = Session::builder()
        .dem(load_dem(&dem, dem_crs)?)
        .nodata_rule(if zero_is_data {
            NoDataRule::sentinel_only()
        } else {
            NoDataRule::default()
        });
    if let Some(crs) = display_crs {
        builder = builder.display_crs(crs);
    }
    if let Some(dir) = out_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(store) = store {
        builder = builder.store(store);
    }
    let mut session = builder.build()?;

    match cmd {
        CliCmd::Profile {
            from,
            to,
            policy,
            fill,
            format,
        } => {
            let line = LineString::from(vec![from.0, to.0]);
            let profile = session.profile(&line, policy, fill)?.clone();
            match format {
                Format::Csv => print_csv(&profile)?,
                Format::Json => print_json(&profile)?,
                Format::Ascii => plot_ascii(&profile),
                Format::Png => println!("{}", session.render(&profile.label)?.display()),
            }
        }
        CliCmd::Batch { lines } => batch(&mut session, &lines)?,
        CliCmd::Locate { label } => {
            let store = session
                .store()
                .ok_or_else(|| anyhow!("locating images requires --store"))?;
            println!("{}", locate_image(store, &label)?.display());
        }
    }
    Ok(())
}

/// Loads `.hgt` files as memory-mapped tiles, `.tif`/`.tiff` files
/// as GeoTIFFs and anything else as an ESRI ASCII grid. `crs` applies
/// to grids that do not carry a known CRS of their own.
fn load_dem(path: &Path, crs: Crs) -> Result<Arc<dyn Dem>, AnyError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let dem: Arc<dyn Dem> = match ext.as_deref() {
        Some("hgt") => Arc::new(Tile::open(path, TileMode::MemMap)?),
        Some("tif" | "tiff") => Arc::new(Grid::read_geotiff(path, crs)?),
        _ => Arc::new(Grid::read_ascii(path, crs)?),
    };
    info!("loaded DEM {:?} in {}", path, dem.crs());
    Ok(dem)
}

fn batch(session: &mut Session, path: &Path) -> Result<(), AnyError> {
    let raw: Vec<Vec<[f64; 2]>> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let lines: Vec<LineString<f64>> = raw
        .into_iter()
        .map(|coords| coords.into_iter().map(|[x, y]| (x, y)).collect())
        .collect();

    let report = session.batch(&lines)?;
    let failures = session.render_pending();

    let mut stdout = std::io::stdout().lock();
    for label in &report.labels {
        let Some(profile) = session.registry().get(label) else {
            continue;
        };
        let image = profile
            .image_path
            .as_ref()
            .map_or_else(|| "-".to_owned(), |p| p.display().to_string());
        writeln!(
            stdout,
            "{label}: length_2d {:.2}, length_3d {:.2}, {image}",
            profile.length_2d, profile.length_3d
        )?;
    }
    for skipped in &report.skipped {
        writeln!(stdout, "line {} skipped: {}", skipped.index, skipped.error)?;
    }
    for (label, error) in &failures {
        writeln!(stdout, "{label} not rendered: {error}")?;
    }
    writeln!(
        stdout,
        "{} of {} lines profiled",
        report.labels.len(),
        lines.len()
    )?;
    Ok(())
}

/// # Example with gnuplot
///
/// ```sh
/// cargo run --bin plot -- --dem=N44W072.hgt profile --from=-71.308,44.283 --to=-71.297,44.256 --format=csv | tr ',' ' ' > ~/.tmp/plot && gnuplot -p -e "plot '~/.tmp/plot' using 1:2 with lines"
/// ```
fn print_csv(profile: &Profile) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Distance,Elevation")?;
    for sample in &profile.samples {
        match sample.elevation {
            Some(elevation) => writeln!(stdout, "{},{elevation}", sample.distance)?,
            None => writeln!(stdout, "{},", sample.distance)?,
        }
    }
    Ok(())
}

fn print_json(profile: &Profile) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonProfile<'a> {
        #[serde(flatten)]
        profile: &'a Profile,
        elevation_range: Option<(f64, f64)>,
    }

    let json = serde_json::to_string(&JsonProfile {
        profile,
        elevation_range: profile.elevation_range(),
    })?;
    println!("{json}");
    Ok(())
}

fn plot_ascii(profile: &Profile) {
    #[allow(clippy::cast_possible_truncation)]
    let plot_data: Vec<(f32, f32)> = profile
        .valid()
        .map(|(distance, elevation)| (distance as f32, elevation as f32))
        .collect();
    let x_max = profile.samples.last().map_or(0.0, |s| s.distance);
    #[allow(clippy::cast_possible_truncation)]
    Chart::new(300, 150, 0.0, x_max as f32)
        .lineplot(&Shape::Lines(&plot_data))
        .display();
    println!(
        "{}: length_2d {:.2}, length_3d {:.2}, {:.1} -> {:.1}",
        profile.label,
        profile.length_2d,
        profile.length_3d,
        profile.elevation_start,
        profile.elevation_end
    );
}
