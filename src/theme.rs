//! Render palettes and the score color ramp.

use eframe::egui::Color32;

use crate::config::ThemeMode;

pub const SCORE_GREEN: Color32 = Color32::from_rgb(34, 197, 94);
pub const SCORE_YELLOW: Color32 = Color32::from_rgb(234, 179, 8);
pub const SCORE_ORANGE: Color32 = Color32::from_rgb(249, 115, 22);
pub const SCORE_RED: Color32 = Color32::from_rgb(239, 68, 68);

pub fn score_color(score: f64) -> Color32 {
    if score >= 0.66 {
        SCORE_GREEN
    } else if score >= 0.33 {
        SCORE_YELLOW
    } else if score >= 0.15 {
        SCORE_ORANGE
    } else {
        SCORE_RED
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderTheme {
    pub bg: Color32,
    pub text: Color32,
    pub text_secondary: Color32,
    pub accent: Color32,
    pub node_bg: Color32,
    pub node_border: Color32,
    pub node_selected_border: Color32,
    pub edge_color: Color32,
    pub edge_width: f32,
    pub font_size: f32,
    pub font_size_small: f32,
}

pub const LIGHT_THEME: RenderTheme = RenderTheme {
    bg: Color32::from_rgb(0xED, 0xED, 0xF2),
    text: Color32::from_rgb(0x1B, 0x1B, 0x1B),
    text_secondary: Color32::from_rgb(0x6B, 0x6B, 0x7B),
    accent: Color32::from_rgb(0x6B, 0x5C, 0xFF),
    node_bg: Color32::WHITE,
    node_border: Color32::from_rgb(0xD1, 0xD1, 0xD9),
    node_selected_border: Color32::from_rgb(0x6B, 0x5C, 0xFF),
    edge_color: Color32::from_rgb(0xB0, 0xB0, 0xBE),
    edge_width: 1.5,
    font_size: 13.0,
    font_size_small: 11.0,
};

pub const DARK_THEME: RenderTheme = RenderTheme {
    bg: Color32::from_rgb(0x1B, 0x1B, 0x1B),
    text: Color32::from_rgb(0xED, 0xED, 0xF2),
    text_secondary: Color32::from_rgb(0x9B, 0x9B, 0xAB),
    accent: Color32::from_rgb(0x6B, 0x5C, 0xFF),
    node_bg: Color32::from_rgb(0x2A, 0x2A, 0x2E),
    node_border: Color32::from_rgb(0x3A, 0x3A, 0x42),
    node_selected_border: Color32::from_rgb(0x6B, 0x5C, 0xFF),
    edge_color: Color32::from_rgb(0x4A, 0x4A, 0x56),
    edge_width: 1.5,
    font_size: 13.0,
    font_size_small: 11.0,
};

/// Pick the palette for the configured mode. `dark_hint` is the host's
/// dark-mode preference and only matters in `Auto`.
pub fn resolve_theme(mode: ThemeMode, dark_hint: bool) -> RenderTheme {
    match mode {
        ThemeMode::Light => LIGHT_THEME,
        ThemeMode::Dark => DARK_THEME,
        ThemeMode::Auto => {
            if dark_hint {
                DARK_THEME
            } else {
                LIGHT_THEME
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_ramp_boundaries() {
        assert_eq!(score_color(1.0), SCORE_GREEN);
        assert_eq!(score_color(0.66), SCORE_GREEN);
        assert_eq!(score_color(0.65), SCORE_YELLOW);
        assert_eq!(score_color(0.33), SCORE_YELLOW);
        assert_eq!(score_color(0.32), SCORE_ORANGE);
        assert_eq!(score_color(0.15), SCORE_ORANGE);
        assert_eq!(score_color(0.14), SCORE_RED);
        assert_eq!(score_color(0.0), SCORE_RED);
    }

    #[test]
    fn auto_mode_follows_host_hint() {
        assert_eq!(resolve_theme(ThemeMode::Auto, true).bg, DARK_THEME.bg);
        assert_eq!(resolve_theme(ThemeMode::Auto, false).bg, LIGHT_THEME.bg);
        assert_eq!(resolve_theme(ThemeMode::Light, true).bg, LIGHT_THEME.bg);
        assert_eq!(resolve_theme(ThemeMode::Dark, false).bg, DARK_THEME.bg);
    }
}
