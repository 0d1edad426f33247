//! Coordinates used by the engine and their mapping onto `geojson` values.

use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::models::LonLat;

/// A coordinate with optional altitude. On the wire it is a GeoJSON position:
/// `[lon, lat]`, `[lon, lat, alt]`, or longer (extra members are dropped).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "geojson::Position", into = "geojson::Position")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl Position {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, alt: None }
    }

    pub const fn with_alt(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt: Some(alt) }
    }

    pub fn lonlat(&self) -> LonLat {
        LonLat::new(self.lon, self.lat)
    }

    /// Keeps an explicit altitude; fills in `alt` otherwise.
    pub fn or_alt(self, alt: f64) -> Self {
        Self { alt: Some(self.alt.unwrap_or(alt)), ..self }
    }
}

impl From<LonLat> for Position {
    fn from(p: LonLat) -> Self {
        Position::new(p.lon, p.lat)
    }
}

impl TryFrom<geojson::Position> for Position {
    type Error = NavError;

    fn try_from(raw: geojson::Position) -> Result<Self, Self::Error> {
        Position::from_slice(&raw)
    }
}

impl From<Position> for geojson::Position {
    fn from(p: Position) -> Self {
        match p.alt {
            Some(alt) => vec![p.lon, p.lat, alt],
            None => vec![p.lon, p.lat],
        }
    }
}

impl Position {
    pub fn from_slice(raw: &[f64]) -> NavResult<Self> {
        match raw {
            [lon, lat] => Ok(Position::new(*lon, *lat)),
            [lon, lat, alt, ..] => Ok(Position::with_alt(*lon, *lat, *alt)),
            _ => Err(NavError::invalid(format!("position needs at least 2 numbers, got {}", raw.len()))),
        }
    }
}

pub fn point(p: Position) -> Geometry {
    Geometry::new(Value::Point(p.into()))
}

pub fn line_string(points: &[Position]) -> Geometry {
    Geometry::new(Value::LineString(points.iter().map(|p| (*p).into()).collect()))
}

/// `LineString` vertices, or `None` for any other geometry type.
pub fn line_positions(geometry: &Geometry) -> Option<Vec<Position>> {
    match &geometry.value {
        Value::LineString(coords) => Some(coords.iter().filter_map(|c| Position::from_slice(c).ok()).collect()),
        _ => None,
    }
}

fn map_raw(raw: &geojson::Position, f: &mut impl FnMut(Position) -> Position) -> geojson::Position {
    match Position::from_slice(raw) {
        Ok(p) => f(p).into(),
        Err(_) => raw.clone(),
    }
}

fn map_value(value: &Value, f: &mut impl FnMut(Position) -> Position) -> Value {
    match value {
        Value::Point(p) => Value::Point(map_raw(p, f)),
        Value::MultiPoint(ps) => Value::MultiPoint(ps.iter().map(|p| map_raw(p, f)).collect()),
        Value::LineString(ps) => Value::LineString(ps.iter().map(|p| map_raw(p, f)).collect()),
        Value::MultiLineString(ls) => {
            Value::MultiLineString(ls.iter().map(|l| l.iter().map(|p| map_raw(p, f)).collect()).collect())
        }
        Value::Polygon(rings) => {
            Value::Polygon(rings.iter().map(|r| r.iter().map(|p| map_raw(p, f)).collect()).collect())
        }
        Value::MultiPolygon(polys) => Value::MultiPolygon(
            polys
                .iter()
                .map(|rings| rings.iter().map(|r| r.iter().map(|p| map_raw(p, f)).collect()).collect())
                .collect(),
        ),
        Value::GeometryCollection(gs) => {
            Value::GeometryCollection(gs.iter().map(|g| Geometry::new(map_value(&g.value, f))).collect())
        }
    }
}

/// Applies `f` to every coordinate, preserving structure.
pub fn map_positions(geometry: &Geometry, mut f: impl FnMut(Position) -> Position) -> Geometry {
    Geometry::new(map_value(&geometry.value, &mut f))
}

/// Every coordinate of the geometry, in document order.
pub fn positions(geometry: &Geometry) -> Vec<Position> {
    let mut out = Vec::new();
    map_positions(geometry, |p| {
        out.push(p);
        p
    });
    out
}
