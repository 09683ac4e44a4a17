use serde::Deserialize;

/// Tree orientation. Only vertical placement is implemented; `Horizontal`
/// is accepted and reserved for a future layout pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    /// Follow the host's dark-mode preference.
    #[default]
    Auto,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FunctionTreeConfig {
    pub orientation: Orientation,
    /// Horizontal spacing between sibling subtrees, in world units.
    pub node_gap_x: f32,
    /// Vertical spacing between tree levels, in world units.
    pub node_gap_y: f32,
    /// Whether data changes animate node transitions.
    pub animate: bool,
    /// Transition duration in milliseconds.
    pub animation_duration: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub theme: ThemeMode,
    /// Fan-out above which leaf-only children switch to a grid layout.
    pub grid_threshold: usize,
}

impl Default for FunctionTreeConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            node_gap_x: 24.0,
            node_gap_y: 80.0,
            animate: true,
            animation_duration: 300.0,
            min_zoom: 0.02,
            max_zoom: 3.0,
            theme: ThemeMode::Auto,
            grid_threshold: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FunctionTreeConfig::default();
        assert_eq!(config.node_gap_x, 24.0);
        assert_eq!(config.node_gap_y, 80.0);
        assert_eq!(config.animation_duration, 300.0);
        assert_eq!(config.min_zoom, 0.02);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.grid_threshold, 20);
        assert_eq!(config.orientation, Orientation::Vertical);
        assert_eq!(config.theme, ThemeMode::Auto);
        assert!(config.animate);
    }

    #[test]
    fn partial_overrides_deserialize_over_defaults() {
        let config: FunctionTreeConfig =
            serde_json::from_str(r#"{ "theme": "dark", "grid_threshold": 8 }"#).unwrap();
        assert_eq!(config.theme, ThemeMode::Dark);
        assert_eq!(config.grid_threshold, 8);
        assert_eq!(config.node_gap_x, 24.0);
    }
}
