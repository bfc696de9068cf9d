//! Coordinate reference systems identified by EPSG code.
//!
//! WGS 84 geographic coordinates, spherical Web Mercator and the 120 WGS 84
//! UTM zones are built in, since the analysis produces them itself. Any
//! other code is resolved through the EPSG registry bundled by
//! `crs-definitions`. Each supported code can be rendered as a PROJ
//! definition for reprojection and as WKT for shapefile `.prj` sidecars, and
//! parsed back from either WKT or the identifiers GeoJSON documents use.

use std::fmt;

use thiserror::Error;

const UTM_NORTH_BASE: u32 = 32_600;
const UTM_SOUTH_BASE: u32 = 32_700;
const UTM_ZONES: std::ops::RangeInclusive<u32> = 1..=60;

/// A coordinate reference system, identified by its EPSG code.
///
/// Construction validates the code, so every `Crs` can be reprojected.
///
/// # Examples
/// ```
/// use corridor_core::Crs;
///
/// # fn main() -> Result<(), corridor_core::CrsError> {
/// let crs = Crs::from_epsg(32643)?;
/// assert_eq!(crs, Crs::WORKING);
/// assert_eq!(crs.to_string(), "EPSG:32643");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct Crs(u32);

/// The family a supported [`Crs`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Longitude/latitude in degrees on the WGS 84 ellipsoid.
    Geographic,
    /// Spherical Web Mercator in metres.
    WebMercator,
    /// WGS 84 Universal Transverse Mercator zone in metres.
    Utm {
        /// Zone number in `1..=60`.
        zone: u32,
        /// Northern-hemisphere variant when `true`.
        north: bool,
    },
    /// Any other system with an entry in the EPSG registry.
    Registered {
        /// Longitude/latitude in degrees when `true`, projected otherwise.
        geographic: bool,
    },
}

/// Errors raised while identifying a coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    /// The EPSG code is neither built in nor present in the registry.
    #[error("EPSG:{code} is not a supported coordinate reference system")]
    Unsupported {
        /// Rejected EPSG code.
        code: u32,
    },
    /// A UTM zone number fell outside `1..=60`.
    #[error("UTM zone {zone} is out of range")]
    InvalidUtmZone {
        /// Computed zone number.
        zone: i64,
    },
    /// A textual CRS definition could not be matched to an EPSG code.
    #[error("unrecognised coordinate reference system definition")]
    Unrecognized {
        /// Definition as supplied by the source file.
        definition: String,
    },
}

impl Crs {
    /// Fixed working CRS used for storage and interchange (WGS 84 / UTM 43N).
    pub const WORKING: Self = Self(32_643);
    /// WGS 84 longitude/latitude, used for display payloads.
    pub const WGS84: Self = Self(4_326);
    /// Spherical Web Mercator, the best-effort metric fallback.
    pub const WEB_MERCATOR: Self = Self(3_857);

    /// Validate an EPSG code.
    ///
    /// # Errors
    /// Returns [`CrsError::Unsupported`] for codes with no known definition.
    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        let crs = Self(code);
        crs.kind().map(|_| crs)
    }

    /// Build the WGS 84 UTM CRS for `zone`.
    ///
    /// # Errors
    /// Returns [`CrsError::InvalidUtmZone`] when `zone` is outside `1..=60`.
    pub fn utm(zone: i64, north: bool) -> Result<Self, CrsError> {
        let checked = u32::try_from(zone)
            .ok()
            .filter(|value| UTM_ZONES.contains(value))
            .ok_or(CrsError::InvalidUtmZone { zone })?;
        let base = if north {
            UTM_NORTH_BASE
        } else {
            UTM_SOUTH_BASE
        };
        Ok(Self(base + checked))
    }

    /// Numeric EPSG code.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        self.0
    }

    /// Family of this CRS.
    ///
    /// # Errors
    /// Returns [`CrsError::Unsupported`] when the code has no known
    /// definition; this only happens for values built outside
    /// [`Crs::from_epsg`].
    pub fn kind(self) -> Result<CrsKind, CrsError> {
        match self.0 {
            4_326 => Ok(CrsKind::Geographic),
            3_857 => Ok(CrsKind::WebMercator),
            code => utm_zone_of(code)
                .map(|(zone, north)| CrsKind::Utm { zone, north })
                .or_else(|| {
                    registered_proj4(code).map(|proj4| CrsKind::Registered {
                        geographic: is_longlat(proj4),
                    })
                })
                .ok_or(CrsError::Unsupported { code }),
        }
    }

    /// Report whether coordinates are longitude/latitude degrees.
    #[must_use]
    pub fn is_geographic(self) -> bool {
        matches!(
            self.kind(),
            Ok(CrsKind::Geographic | CrsKind::Registered { geographic: true })
        )
    }

    /// PROJ definition string used for reprojection.
    ///
    /// # Errors
    /// Returns [`CrsError::Unsupported`] for unknown codes.
    pub fn proj_definition(self) -> Result<String, CrsError> {
        Ok(match self.kind()? {
            CrsKind::Geographic => "+proj=longlat +datum=WGS84 +no_defs".to_owned(),
            CrsKind::WebMercator => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 \
                                     +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
                .to_owned(),
            CrsKind::Utm { zone, north } => {
                let hemisphere = if north { "" } else { " +south" };
                format!("+proj=utm +zone={zone}{hemisphere} +datum=WGS84 +units=m +no_defs")
            }
            CrsKind::Registered { .. } => registered_proj4(self.0)
                .ok_or(CrsError::Unsupported { code: self.0 })?
                .to_owned(),
        })
    }

    /// OGC WKT suitable for a shapefile `.prj` sidecar.
    ///
    /// The outermost `AUTHORITY` clause carries the EPSG code so that
    /// [`Crs::from_wkt`] recovers it exactly. Registry systems use the
    /// registry's own WKT.
    ///
    /// # Errors
    /// Returns [`CrsError::Unsupported`] for unknown codes.
    pub fn to_wkt(self) -> Result<String, CrsError> {
        const GEOGCS: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",\
                              6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],\
                              AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,\
                              AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",\
                              0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],\
                              AUTHORITY[\"EPSG\",\"4326\"]]";
        const METRE: &str = "UNIT[\"metre\",1,AUTHORITY[\"EPSG\",\"9001\"]]";
        let code = self.0;
        Ok(match self.kind()? {
            CrsKind::Geographic => GEOGCS.to_owned(),
            CrsKind::WebMercator => format!(
                "PROJCS[\"WGS 84 / Pseudo-Mercator\",{GEOGCS},\
                 PROJECTION[\"Mercator_1SP\"],PARAMETER[\"central_meridian\",0],\
                 PARAMETER[\"scale_factor\",1],PARAMETER[\"false_easting\",0],\
                 PARAMETER[\"false_northing\",0],{METRE},AXIS[\"Easting\",EAST],\
                 AXIS[\"Northing\",NORTH],AUTHORITY[\"EPSG\",\"{code}\"]]"
            ),
            CrsKind::Utm { zone, north } => {
                let hemisphere = if north { 'N' } else { 'S' };
                let false_northing = if north { 0 } else { 10_000_000 };
                let central_meridian = central_meridian(zone);
                format!(
                    "PROJCS[\"WGS 84 / UTM zone {zone}{hemisphere}\",{GEOGCS},\
                     PROJECTION[\"Transverse_Mercator\"],\
                     PARAMETER[\"latitude_of_origin\",0],\
                     PARAMETER[\"central_meridian\",{central_meridian}],\
                     PARAMETER[\"scale_factor\",0.9996],\
                     PARAMETER[\"false_easting\",500000],\
                     PARAMETER[\"false_northing\",{false_northing}],{METRE},\
                     AXIS[\"Easting\",EAST],AXIS[\"Northing\",NORTH],\
                     AUTHORITY[\"EPSG\",\"{code}\"]]"
                )
            }
            CrsKind::Registered { .. } => registered_wkt(code)
                .ok_or(CrsError::Unsupported { code })?
                .to_owned(),
        })
    }

    /// Identify a CRS from WKT, as found in shapefile `.prj` sidecars.
    ///
    /// OGC WKT is matched on its outermost `AUTHORITY["EPSG", …]` clause, or
    /// the `ID["EPSG", …]` clause of WKT2. ESRI WKT, which omits authorities,
    /// is matched on the coordinate system name: first against the WGS 84
    /// names ESRI uses, then against the names in the EPSG registry.
    ///
    /// # Errors
    /// Returns [`CrsError::Unrecognized`] when no strategy applies, or
    /// [`CrsError::Unsupported`] when the declared code has no known
    /// definition.
    ///
    /// # Examples
    /// ```
    /// use corridor_core::Crs;
    ///
    /// # fn main() -> Result<(), corridor_core::CrsError> {
    /// let esri = r#"PROJCS["WGS_1984_UTM_Zone_43N",GEOGCS["GCS_WGS_1984"]]"#;
    /// assert_eq!(Crs::from_wkt(esri)?, Crs::WORKING);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsError> {
        let unrecognized = || CrsError::Unrecognized {
            definition: wkt.trim().to_owned(),
        };
        if let Some(code) = outer_authority_code(wkt) {
            return Self::from_epsg(code);
        }
        let trimmed = wkt.trim_start();
        let (root, rest) = trimmed.split_once('[').ok_or_else(unrecognized)?;
        let name = first_quoted(rest)
            .map(normalise_name)
            .ok_or_else(unrecognized)?;
        let builtin = match root.trim().to_ascii_uppercase().as_str() {
            "GEOGCS" if name.contains("WGS_1984") || name.contains("WGS_84") => Some(Self::WGS84),
            "PROJCS"
                if name.contains("MERCATOR_AUXILIARY_SPHERE")
                    || name.contains("PSEUDO_MERCATOR")
                    || name.contains("WEB_MERCATOR") =>
            {
                Some(Self::WEB_MERCATOR)
            }
            "PROJCS" => esri_utm_zone(&name),
            _ => None,
        };
        builtin
            .or_else(|| registered_by_name(&name))
            .ok_or_else(unrecognized)
    }

    /// Identify a CRS from a textual identifier such as `EPSG:4326`,
    /// `urn:ogc:def:crs:EPSG::32643` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    ///
    /// # Errors
    /// Returns [`CrsError::Unrecognized`] for identifiers that carry no EPSG
    /// code and [`CrsError::Unsupported`] for unsupported codes.
    pub fn from_identifier(identifier: &str) -> Result<Self, CrsError> {
        let normalised = identifier.trim().to_ascii_uppercase();
        if normalised.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        if !normalised.contains("EPSG") {
            return Err(CrsError::Unrecognized {
                definition: identifier.to_owned(),
            });
        }
        normalised
            .rsplit(':')
            .next()
            .and_then(|code| code.trim().parse::<u32>().ok())
            .ok_or_else(|| CrsError::Unrecognized {
                definition: identifier.to_owned(),
            })
            .and_then(Self::from_epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl TryFrom<u32> for Crs {
    type Error = CrsError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_epsg(code)
    }
}

impl From<Crs> for u32 {
    fn from(crs: Crs) -> Self {
        crs.0
    }
}

fn utm_zone_of(code: u32) -> Option<(u32, bool)> {
    let (zone, north) = if code > UTM_SOUTH_BASE {
        (code - UTM_SOUTH_BASE, false)
    } else if code > UTM_NORTH_BASE {
        (code - UTM_NORTH_BASE, true)
    } else {
        return None;
    };
    UTM_ZONES.contains(&zone).then_some((zone, north))
}

fn registered_proj4(code: u32) -> Option<&'static str> {
    let code = u16::try_from(code).ok()?;
    crs_definitions::from_code(code).map(|def| def.proj4)
}

fn registered_wkt(code: u32) -> Option<&'static str> {
    let code = u16::try_from(code).ok()?;
    crs_definitions::from_code(code).map(|def| def.wkt)
}

fn is_longlat(proj4: &str) -> bool {
    proj4
        .split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong"))
}

/// Look an ESRI coordinate system name up in the registry. ESRI spells
/// names with underscores and prefixes geographic systems with `GCS_`.
fn registered_by_name(name: &str) -> Option<Crs> {
    let wanted = name.strip_prefix("GCS_").unwrap_or(name);
    (0..=u16::MAX).find_map(|code| {
        let def = crs_definitions::from_code(code)?;
        let registered = first_quoted(def.wkt.split_once('[')?.1).map(normalise_name)?;
        (registered == wanted).then_some(Crs(u32::from(code)))
    })
}

fn first_quoted(text: &str) -> Option<&str> {
    let (name, _) = text.trim_start().strip_prefix('"')?.split_once('"')?;
    Some(name)
}

/// Uppercase `name` and collapse every run of other characters into `_`,
/// so `Kalianpur 1975 / India zone I` reads `KALIANPUR_1975_INDIA_ZONE_I`.
fn normalise_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn central_meridian(zone: u32) -> i64 {
    i64::from(zone) * 6 - 183
}

fn outer_authority_code(wkt: &str) -> Option<u32> {
    let upper = wkt.to_ascii_uppercase();
    let (_, tail) = upper
        .rsplit_once("AUTHORITY[\"EPSG\",")
        .or_else(|| upper.rsplit_once("ID[\"EPSG\","))?;
    let digits: String = tail
        .trim_start()
        .trim_start_matches('"')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn esri_utm_zone(name: &str) -> Option<Crs> {
    let (_, tail) = name.split_once("UTM_ZONE_")?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    let zone: i64 = digits.parse().ok()?;
    let hemisphere = tail.chars().nth(digits.len())?;
    let north = match hemisphere {
        'N' => true,
        'S' => false,
        _ => return None,
    };
    Crs::utm(zone, north).ok()
}
