use crate::DemError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Coordinate reference systems understood by this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326).
    Geographic,

    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,

    /// WGS84 / UTM in meters (EPSG:326xx north, EPSG:327xx south).
    Utm { zone: u8, north: bool },

    /// Any other EPSG CRS with a known PROJ definition, such as
    /// EPSG:3003 or EPSG:25832. Never holds one of the codes above.
    Epsg(u16),

    /// A metric grid with no known relation to the earth.
    Local,
}

impl Crs {
    /// Returns the EPSG code of this CRS, if it has one.
    pub fn epsg(&self) -> Option<u32> {
        match *self {
            Self::Geographic => Some(4326),
            Self::WebMercator => Some(3857),
            Self::Utm { zone, north: true } => Some(32600 + u32::from(zone)),
            Self::Utm { zone, north: false } => Some(32700 + u32::from(zone)),
            Self::Epsg(code) => Some(u32::from(code)),
            Self::Local => None,
        }
    }

    /// Returns the CRS for `code`, if supported.
    pub fn from_epsg(code: u32) -> Option<Self> {
        #[allow(clippy::cast_possible_truncation)]
        match code {
            4326 => Some(Self::Geographic),
            3857 => Some(Self::WebMercator),
            32601..=32660 => Some(Self::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Some(Self::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => u16::try_from(code)
                .ok()
                .filter(|&code| crs_definitions::from_code(code).is_some())
                .map(Self::Epsg),
        }
    }

    /// Returns the PROJ.4 definition of this CRS.
    pub fn proj4(&self) -> Option<&'static str> {
        let code = u16::try_from(self.epsg()?).ok()?;
        crs_definitions::from_code(code).map(|def| def.proj4)
    }

    /// Coordinates are angular degrees rather than linear units.
    pub fn is_geographic(&self) -> bool {
        match self {
            Self::Geographic => true,
            Self::Epsg(_) => self
                .proj4()
                .is_some_and(|def| proj4_param(def, "proj") == Some("longlat")),
            _ => false,
        }
    }

    /// Length of one linear unit of a projected CRS in meters.
    ///
    /// Geographic and local CRSs report 1.
    pub fn meters_per_unit(&self) -> f64 {
        let Some(def) = self.proj4().filter(|_| !self.is_geographic()) else {
            return 1.0;
        };
        if let Some(factor) = proj4_param(def, "to_meter").and_then(|v| v.parse().ok()) {
            return factor;
        }
        match proj4_param(def, "units") {
            Some("km") => 1000.0,
            Some("ft") => 0.3048,
            Some("us-ft") => 1200.0 / 3937.0,
            Some("link") => 0.201_168,
            _ => 1.0,
        }
    }

    /// Coordinates can be related to a position on the earth.
    pub fn is_georeferenced(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Returns the value of `+key=value` in a PROJ.4 string.
fn proj4_param<'a>(def: &'a str, key: &str) -> Option<&'a str> {
    def.split_whitespace()
        .filter_map(|token| token.strip_prefix('+')?.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => f.write_str("local"),
        }
    }
}

impl FromStr for Crs {
    type Err = DemError;

    /// Parses `EPSG:32633`, a bare `32633`, or `local`.
    fn from_str(s: &str) -> Result<Self, DemError> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        let digits = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("epsg:"))
            .map_or(trimmed, |_| &trimmed[5..]);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_epsg)
            .ok_or_else(|| DemError::Crs(s.to_owned()))
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

impl TryFrom<String> for Crs {
    type Error = DemError;

    fn try_from(s: String) -> Result<Self, DemError> {
        s.parse()
    }
}
