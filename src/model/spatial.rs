//! Spatial point values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coordinate reference system tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    /// 2D cartesian (SRID 7203).
    Cartesian,
    /// 3D cartesian (SRID 9157).
    Cartesian3d,
    /// WGS-84 geographic, x = longitude, y = latitude (SRID 4326).
    Wgs84,
    /// WGS-84 3D with height in meters (SRID 4979).
    Wgs84_3d,
}

impl Crs {
    pub fn srid(self) -> i32 {
        match self {
            Crs::Cartesian => 7203,
            Crs::Cartesian3d => 9157,
            Crs::Wgs84 => 4326,
            Crs::Wgs84_3d => 4979,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Crs::Cartesian => "cartesian",
            Crs::Cartesian3d => "cartesian-3d",
            Crs::Wgs84 => "wgs-84",
            Crs::Wgs84_3d => "wgs-84-3d",
        }
    }

    pub fn from_name(name: &str) -> Option<Crs> {
        match name {
            "cartesian" => Some(Crs::Cartesian),
            "cartesian-3d" => Some(Crs::Cartesian3d),
            "wgs-84" => Some(Crs::Wgs84),
            "wgs-84-3d" => Some(Crs::Wgs84_3d),
            _ => None,
        }
    }

    pub fn is_geographic(self) -> bool {
        matches!(self, Crs::Wgs84 | Crs::Wgs84_3d)
    }
}

/// A 2D or 3D point. For geographic CRSs, `x` is longitude and `y` is
/// latitude, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub crs: Crs,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn cartesian(x: f64, y: f64) -> Self {
        Self { crs: Crs::Cartesian, x, y, z: None }
    }

    pub fn cartesian_3d(x: f64, y: f64, z: f64) -> Self {
        Self { crs: Crs::Cartesian3d, x, y, z: Some(z) }
    }

    /// Geographic point. Returns None when the coordinates are outside
    /// valid longitude/latitude ranges.
    pub fn geographic(longitude: f64, latitude: f64, height: Option<f64>) -> Option<Self> {
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return None;
        }
        Some(Self {
            crs: if height.is_some() { Crs::Wgs84_3d } else { Crs::Wgs84 },
            x: longitude,
            y: latitude,
            z: height,
        })
    }

    /// Distance between two points in the same CRS family. Euclidean for
    /// cartesian points, haversine great-circle (meters) for geographic.
    /// Returns None for mixed cartesian/geographic operands.
    pub fn distance(&self, other: &Point) -> Option<f64> {
        match (self.crs.is_geographic(), other.crs.is_geographic()) {
            (false, false) => {
                let dx = self.x - other.x;
                let dy = self.y - other.y;
                let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
                Some((dx * dx + dy * dy + dz * dz).sqrt())
            }
            (true, true) => {
                const EARTH_RADIUS_M: f64 = 6_378_137.0;
                let (lon1, lat1) = (self.x.to_radians(), self.y.to_radians());
                let (lon2, lat2) = (other.x.to_radians(), other.y.to_radians());
                let dlat = lat2 - lat1;
                let dlon = lon2 - lon1;
                let a = (dlat / 2.0).sin().powi(2)
                    + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
                let surface = 2.0 * EARTH_RADIUS_M * a.sqrt().asin();
                let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
                Some((surface * surface + dz * dz).sqrt())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(
                f,
                "point({{srid: {}, x: {}, y: {}, z: {z}}})",
                self.crs.srid(),
                self.x,
                self.y
            ),
            None => write!(
                f,
                "point({{srid: {}, x: {}, y: {}}})",
                self.crs.srid(),
                self.x,
                self.y
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_distance() {
        let a = Point::cartesian(0.0, 0.0);
        let b = Point::cartesian(3.0, 4.0);
        assert_eq!(a.distance(&b), Some(5.0));
    }

    #[test]
    fn test_geographic_bounds() {
        assert!(Point::geographic(181.0, 0.0, None).is_none());
        assert!(Point::geographic(0.0, 91.0, None).is_none());
        assert!(Point::geographic(12.5, 55.6, None).is_some());
    }

    #[test]
    fn test_geographic_distance_plausible() {
        // Copenhagen to Malmö is roughly 27 km.
        let cph = Point::geographic(12.57, 55.68, None).unwrap();
        let malmo = Point::geographic(13.00, 55.61, None).unwrap();
        let d = cph.distance(&malmo).unwrap();
        assert!((20_000.0..40_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_mixed_crs_distance_is_none() {
        let a = Point::cartesian(0.0, 0.0);
        let b = Point::geographic(0.0, 0.0, None).unwrap();
        assert!(a.distance(&b).is_none());
    }
}
