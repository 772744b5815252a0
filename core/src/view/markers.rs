use super::map::MapPoint;
use crate::prelude::OverlayError;
use crate::records::InstanceId;
use std::collections::BTreeMap;

/// Marker icon width and height in pixels; anchored at bottom center.
pub const MARKER_SIZE: (f32, f32) = (21.0, 25.0);

/// Opacity applied by [`MarkerOverlay::fade_out_all`] when none is given.
pub const DEFAULT_FADE_OPACITY: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Default,
    Selected,
}

impl MarkerIcon {
    pub fn url(self) -> &'static str {
        match self {
            MarkerIcon::Default => "/images/icons/marker-blue.png",
            MarkerIcon::Selected => "/images/icons/marker-gold.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: MapPoint,
    pub icon: MarkerIcon,
    pub opacity: f32,
}

impl Marker {
    fn new(position: MapPoint) -> Self {
        Self {
            position,
            icon: MarkerIcon::Default,
            opacity: 1.0,
        }
    }
}

/// Result markers shown on the map, keyed by instance id.
///
/// The layer is created lazily by the first marker of a display cycle and
/// destroyed by [`MarkerOverlay::clear_all`], so markers from two result sets
/// never coexist.
#[derive(Debug, Default)]
pub struct MarkerOverlay {
    layer: Option<BTreeMap<InstanceId, Marker>>,
}

impl MarkerOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_layer(&self) -> bool {
        self.layer.is_some()
    }

    pub fn ensure_layer(&mut self) {
        if self.layer.is_none() {
            self.layer = Some(BTreeMap::new());
        }
    }

    pub fn add_marker(
        &mut self,
        instance_id: InstanceId,
        position: MapPoint,
    ) -> Result<(), OverlayError> {
        let layer = self
            .layer
            .as_mut()
            .ok_or(OverlayError::NoLayer { instance_id })?;
        layer.insert(instance_id, Marker::new(position));
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.layer = None;
    }

    /// Hides every other marker and shows `instance_id` with the selected icon.
    pub fn highlight(&mut self, instance_id: InstanceId) {
        let Some(layer) = self.layer.as_mut() else {
            return;
        };
        if !layer.contains_key(&instance_id) {
            return;
        }
        for marker in layer.values_mut() {
            marker.opacity = 0.0;
        }
        if let Some(marker) = layer.get_mut(&instance_id) {
            marker.icon = MarkerIcon::Selected;
            marker.opacity = 1.0;
        }
    }

    pub fn unhighlight_all(&mut self) {
        for marker in self.markers_mut() {
            marker.icon = MarkerIcon::Default;
            marker.opacity = 1.0;
        }
    }

    pub fn fade_out_all(&mut self, opacity: Option<f32>) {
        let opacity = opacity.unwrap_or(DEFAULT_FADE_OPACITY);
        for marker in self.markers_mut() {
            marker.opacity = opacity;
        }
    }

    pub fn fade_in_all(&mut self, opacity: Option<f32>) {
        let opacity = opacity.unwrap_or(1.0);
        for marker in self.markers_mut() {
            marker.opacity = opacity;
        }
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<&Marker> {
        self.layer.as_ref()?.get(&instance_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &Marker)> {
        self.layer
            .iter()
            .flat_map(|layer| layer.iter().map(|(id, marker)| (*id, marker)))
    }

    pub fn len(&self) -> usize {
        self.layer.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instance id of the marker currently showing the selected icon.
    pub fn highlighted(&self) -> Option<InstanceId> {
        self.iter()
            .find(|(_, marker)| marker.icon == MarkerIcon::Selected)
            .map(|(id, _)| id)
    }

    fn markers_mut(&mut self) -> impl Iterator<Item = &mut Marker> {
        self.layer.iter_mut().flat_map(|layer| layer.values_mut())
    }
}
