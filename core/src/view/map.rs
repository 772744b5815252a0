use crate::records::GeoLocation;
use std::f64::consts::PI;

/// Half the equatorial circumference in spherical mercator metres.
pub const MERCATOR_HALF_EXTENT: f64 = 20_037_508.34;

/// Zoom level used when recentering on a new result set.
pub const RESULT_ZOOM: u8 = 10;

const TILE_SIZE: f64 = 256.0;

/// Map display projection, chosen by the configured base layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapProjection {
    #[default]
    Wgs84,
    SphericalMercator,
}

impl MapProjection {
    pub fn code(self) -> &'static str {
        match self {
            MapProjection::Wgs84 => "EPSG:4326",
            MapProjection::SphericalMercator => "EPSG:900913",
        }
    }

    /// Projects a WGS84 location into display coordinates.
    pub fn project(self, location: GeoLocation) -> MapPoint {
        match self {
            MapProjection::Wgs84 => MapPoint {
                x: location.easting,
                y: location.northing,
            },
            MapProjection::SphericalMercator => {
                let x = location.easting * MERCATOR_HALF_EXTENT / 180.0;
                let y = ((90.0 + location.northing) * PI / 360.0).tan().ln() / (PI / 180.0);
                MapPoint {
                    x,
                    y: y * MERCATOR_HALF_EXTENT / 180.0,
                }
            }
        }
    }

    fn extent_width(self) -> f64 {
        match self {
            MapProjection::Wgs84 => 360.0,
            MapProjection::SphericalMercator => 2.0 * MERCATOR_HALF_EXTENT,
        }
    }
}

/// A point in map display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

/// Center and zoom of the map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewport {
    projection: MapProjection,
    center: Option<MapPoint>,
    zoom: u8,
}

impl MapViewport {
    /// A viewport zoomed out to the full extent.
    pub fn new(projection: MapProjection) -> Self {
        Self {
            projection,
            center: None,
            zoom: 0,
        }
    }

    pub fn projection(&self) -> MapProjection {
        self.projection
    }

    pub fn center(&self) -> Option<MapPoint> {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_center(&mut self, center: MapPoint, zoom: u8) {
        self.center = Some(center);
        self.zoom = zoom;
    }

    /// Map units covered by one screen pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        self.projection.extent_width() / (TILE_SIZE * 2f64.powi(i32::from(self.zoom)))
    }

    /// Screen offset of `point` from the viewport center, y pointing down.
    pub fn pixel_offset(&self, point: MapPoint) -> (f64, f64) {
        let center = self.center.unwrap_or_default();
        let resolution = self.resolution();
        (
            (point.x - center.x) / resolution,
            (center.y - point.y) / resolution,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercator_maps_origin_and_antimeridian() {
        let origin = MapProjection::SphericalMercator.project(GeoLocation {
            northing: 0.0,
            easting: 0.0,
        });
        assert!(origin.x.abs() < 1e-6);
        assert!(origin.y.abs() < 1e-6);

        let east = MapProjection::SphericalMercator.project(GeoLocation {
            northing: 0.0,
            easting: 180.0,
        });
        assert!((east.x - MERCATOR_HALF_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn wgs84_is_lon_lat_passthrough() {
        let point = MapProjection::Wgs84.project(GeoLocation {
            northing: 42.5,
            easting: -73.25,
        });
        assert_eq!(point, MapPoint { x: -73.25, y: 42.5 });
    }

    #[test]
    fn pixel_offset_is_relative_to_center() {
        let mut viewport = MapViewport::new(MapProjection::Wgs84);
        viewport.set_center(MapPoint { x: 10.0, y: 10.0 }, 0);
        let (dx, dy) = viewport.pixel_offset(MapPoint { x: 10.0 + 360.0 / 256.0, y: 10.0 });
        assert!((dx - 1.0).abs() < 1e-9);
        assert!(dy.abs() < 1e-9);
    }
}
