use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Point, Rectangle, Renderer, Theme,
};
use iqrcore::view::markers::MARKER_SIZE;
use iqrcore::view::{MarkerIcon, MarkerOverlay, MapViewport};

/// One marker resolved to a screen offset from the map center.
#[derive(Debug, Clone)]
struct PlacedMarker {
    offset: (f32, f32),
    icon: MarkerIcon,
    opacity: f32,
}

/// Result markers drawn around the viewport center. Tiles are not rendered.
#[derive(Debug, Clone)]
pub struct MarkerMap {
    markers: Vec<PlacedMarker>,
    projection: &'static str,
}

impl MarkerMap {
    pub fn new(overlay: &MarkerOverlay, viewport: &MapViewport) -> Self {
        let mut markers: Vec<PlacedMarker> = overlay
            .iter()
            .map(|(_, marker)| {
                let (dx, dy) = viewport.pixel_offset(marker.position);
                PlacedMarker {
                    offset: (dx as f32, dy as f32),
                    icon: marker.icon,
                    opacity: marker.opacity,
                }
            })
            .collect();
        // Highlighted marker last so it draws on top.
        markers.sort_by_key(|marker| marker.icon == MarkerIcon::Selected);
        Self {
            markers,
            projection: viewport.projection().code(),
        }
    }

    fn icon_color(icon: MarkerIcon, opacity: f32) -> Color {
        match icon {
            MarkerIcon::Default => Color::from_rgba(0.2, 0.45, 0.95, opacity),
            MarkerIcon::Selected => Color::from_rgba(0.98, 0.78, 0.15, opacity),
        }
    }
}

impl<Message> canvas::Program<Message> for MarkerMap {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.05, 0.07, 0.09),
        );

        let center = Point::new(bounds.width / 2.0, bounds.height / 2.0);
        let crosshair = Path::new(|builder| {
            builder.move_to(Point::new(center.x - 8.0, center.y));
            builder.line_to(Point::new(center.x + 8.0, center.y));
            builder.move_to(Point::new(center.x, center.y - 8.0));
            builder.line_to(Point::new(center.x, center.y + 8.0));
        });
        frame.stroke(
            &crosshair,
            Stroke::default()
                .with_color(Color::from_rgb(0.3, 0.3, 0.38))
                .with_width(1.0),
        );

        let (width, height) = MARKER_SIZE;
        for marker in &self.markers {
            // Anchored at the bottom center of the pin.
            let tip = Point::new(center.x + marker.offset.0, center.y + marker.offset.1);
            if tip.x < -width
                || tip.y < 0.0
                || tip.x > bounds.width + width
                || tip.y > bounds.height + height
            {
                continue;
            }
            let pin = Path::new(|builder| {
                builder.move_to(tip);
                builder.line_to(Point::new(tip.x - width / 2.0, tip.y - height * 0.6));
                builder.line_to(Point::new(tip.x, tip.y - height));
                builder.line_to(Point::new(tip.x + width / 2.0, tip.y - height * 0.6));
                builder.close();
            });
            frame.fill(&pin, Self::icon_color(marker.icon, marker.opacity));
        }

        frame.fill_text(canvas::Text {
            content: format!("{} markers ({})", self.markers.len(), self.projection),
            position: Point::new(8.0, 8.0),
            color: Color::from_rgb(0.7, 0.7, 0.75),
            ..canvas::Text::default()
        });

        vec![frame.into_geometry()]
    }
}
