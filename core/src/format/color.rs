use serde::{Deserialize, Serialize};

/// Swatch colour used when no stop matches.
pub const DEFAULT_COLOR: &str = "gray";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub threshold: f64,
    pub color: String,
}

impl ColorStop {
    pub fn new(threshold: f64, color: impl Into<String>) -> Self {
        Self {
            threshold,
            color: color.into(),
        }
    }
}

/// Relevancy swatch stops, highest threshold first.
pub fn default_color_stops() -> Vec<ColorStop> {
    vec![
        ColorStop::new(0.97, "green"),
        ColorStop::new(0.34, "yellow"),
        ColorStop::new(0.0, "red"),
    ]
}

/// Returns the colour of the first stop whose threshold `score` exceeds.
pub fn color_for_score(score: f64, stops: &[ColorStop]) -> &str {
    stops
        .iter()
        .find(|stop| score > stop.threshold)
        .map(|stop| stop.color.as_str())
        .unwrap_or(DEFAULT_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_exceeded_stop() {
        let stops = default_color_stops();
        assert_eq!(color_for_score(0.99, &stops), "green");
        assert_eq!(color_for_score(0.97, &stops), "yellow");
        assert_eq!(color_for_score(0.5, &stops), "yellow");
        assert_eq!(color_for_score(0.1, &stops), "red");
    }

    #[test]
    fn scores_below_every_stop_are_gray() {
        let stops = default_color_stops();
        assert_eq!(color_for_score(0.0, &stops), DEFAULT_COLOR);
        assert_eq!(color_for_score(-1.0, &stops), DEFAULT_COLOR);
        assert_eq!(color_for_score(0.5, &[]), DEFAULT_COLOR);
    }
}
