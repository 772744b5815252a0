use crate::prelude::ConfigParseError;
use crate::view::MapProjection;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Startup configuration document served next to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewerConfig {
    #[serde(
        rename = "sessionManagerURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_manager_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default)]
    pub osm_map_layers: Vec<MapLayerConfig>,
}

/// One entry of `osm_map_layers` as written in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MapLayerConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub layer_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// A recognised base layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MapLayer {
    Osm {
        name: String,
        urls: Vec<String>,
    },
    Wms {
        name: String,
        url: String,
        params: Map<String, Value>,
    },
}

impl MapLayer {
    pub fn projection(&self) -> MapProjection {
        match self {
            MapLayer::Osm { .. } => MapProjection::SphericalMercator,
            MapLayer::Wms { .. } => MapProjection::Wgs84,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MapLayer::Osm { name, .. } | MapLayer::Wms { name, .. } => name,
        }
    }
}

impl ViewerConfig {
    /// Parses the configuration document. A `null` document yields defaults;
    /// an empty or malformed one is an error.
    pub fn parse(document: &str) -> Result<Self, ConfigParseError> {
        if document.trim().is_empty() {
            return Err(ConfigParseError::Empty);
        }
        let value: Value = serde_json::from_str(document)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Recognised layers in document order; unknown types are logged and skipped.
    pub fn map_layers(&self) -> Vec<MapLayer> {
        self.osm_map_layers
            .iter()
            .filter_map(|layer| {
                match layer.layer_type.as_deref().unwrap_or("OSM") {
                    "OSM" => Some(MapLayer::Osm {
                        name: layer.name.clone(),
                        urls: layer.urls.clone(),
                    }),
                    "WMS" => Some(MapLayer::Wms {
                        name: layer.name.clone(),
                        url: layer.url.clone().unwrap_or_default(),
                        params: layer.params.clone(),
                    }),
                    other => {
                        warn!("unknown map layer type {other}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Projection of the last recognised layer, WGS84 when there is none.
    pub fn projection(&self) -> MapProjection {
        self.map_layers()
            .last()
            .map(MapLayer::projection)
            .unwrap_or_default()
    }

    pub fn session_url_or(&self, fallback: &str) -> String {
        self.session_manager_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognised_keys() {
        let config = ViewerConfig::parse(
            r#"{
                "sessionManagerURL": "http://127.0.0.1:9000",
                "name": "IQR viewer",
                "application": "visgui",
                "osm_map_layers": [
                    {"name": "streets", "urls": ["http://a.tile/${z}/${x}/${y}.png"]},
                    {"type": "WMS", "name": "basemap", "url": "http://wms", "params": {"layers": "basic"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.session_url_or("x"), "http://127.0.0.1:9000");
        let layers = config.map_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].projection(), MapProjection::SphericalMercator);
        assert_eq!(layers[1].name(), "basemap");
        assert_eq!(config.projection(), MapProjection::Wgs84);
    }

    #[test]
    fn unknown_layers_are_skipped() {
        let config = ViewerConfig::parse(
            r#"{"osm_map_layers": [{"type": "WMS", "name": "w", "url": "u"}, {"type": "KML", "name": "k"}]}"#,
        )
        .unwrap();
        assert_eq!(config.map_layers().len(), 1);
        assert_eq!(config.projection(), MapProjection::Wgs84);
    }

    #[test]
    fn no_layers_defaults_to_wgs84() {
        let config = ViewerConfig::parse("null").unwrap();
        assert_eq!(config.projection(), MapProjection::Wgs84);
        assert_eq!(config.session_url_or("http://embedded"), "http://embedded");
    }

    #[test]
    fn empty_and_malformed_documents_fail() {
        assert!(matches!(ViewerConfig::parse("  "), Err(ConfigParseError::Empty)));
        assert!(matches!(
            ViewerConfig::parse("{not json"),
            Err(ConfigParseError::Malformed(_))
        ));
    }
}
