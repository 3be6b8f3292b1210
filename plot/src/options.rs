use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand, ValueEnum};
use dem::Crs;
use geo::geometry::Coord;
use std::{path::PathBuf, str::FromStr};
use transect::{Fill, Policy};

/// Elevation profiles along lines drawn over a DEM.
#[derive(Parser, Debug)]
pub struct Cli {
    /// DEM file: an SRTM/NASADEM `.hgt` tile, a GeoTIFF or an ESRI
    /// ASCII grid.
    #[arg(short, long)]
    pub dem: PathBuf,

    /// CRS of a DEM that names none itself. `.hgt` tiles are always
    /// EPSG:4326.
    #[arg(long, default_value = "EPSG:4326")]
    pub dem_crs: Crs,

    /// CRS line coordinates are given in (defaults to the DEM's).
    #[arg(long)]
    pub display_crs: Option<Crs>,

    /// Directory charts are written to.
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Project store (JSON) recording where charts live.
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Treat 0 as a real elevation instead of no-data.
    #[arg(long, default_value_t = false)]
    pub zero_is_data: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

/// An "x,y" pair in the display CRS (lon,lat for EPSG:4326).
#[derive(Clone, Debug, Copy)]
pub struct Xy(pub Coord<f64>);

impl FromStr for Xy {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (x_str, y_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid x,y pair"))?;
        let x = f64::from_str(x_str.trim())?;
        let y = f64::from_str(y_str.trim())?;
        Ok(Self(Coord { x, y }))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// "distance,elevation" rows.
    Csv,
    /// The full profile record.
    Json,
    /// Plot to terminal.
    Ascii,
    /// Render a chart image and print its path.
    Png,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Profile a straight line between two points.
    Profile {
        #[arg(long)]
        from: Xy,

        #[arg(long)]
        to: Xy,

        /// "fixed" (up to 1001 samples) or "scaled" (51 to 501
        /// samples, metric distances).
        #[arg(long, default_value = "fixed")]
        policy: Policy,

        /// "strict" keeps no-data gaps, "carry" fills them with the
        /// previous elevation.
        #[arg(long, default_value = "carry")]
        fill: Fill,

        #[arg(long, value_enum, default_value_t = Format::Ascii)]
        format: Format,
    },

    /// Profile and render every line of a JSON file holding
    /// `[[[x, y], ...], ...]`.
    Batch {
        lines: PathBuf,
    },

    /// Print the chart path of a rendered profile.
    Locate {
        label: String,
    },
}
