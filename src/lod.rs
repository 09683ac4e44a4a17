//! Level-of-detail selection. Recomputed fresh from the zoom every frame;
//! no hysteresis at the tier boundaries.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodLevel {
    Full,
    Simplified,
    Dots,
}

#[derive(Clone, Copy, Debug)]
pub struct LodParams {
    pub curved_edges: bool,
    pub show_edges: bool,
    pub show_labels: bool,
    pub show_streaming_text: bool,
    pub show_score_bars: bool,
    /// Character cap on labels; 0 means unlimited.
    pub max_label_length: usize,
    pub corner_radius: f32,
    pub dot_size: f32,
}

pub fn lod_level(zoom: f32) -> LodLevel {
    if zoom >= 0.5 {
        LodLevel::Full
    } else if zoom >= 0.15 {
        LodLevel::Simplified
    } else {
        LodLevel::Dots
    }
}

pub fn lod_params(level: LodLevel) -> LodParams {
    match level {
        LodLevel::Full => LodParams {
            curved_edges: true,
            show_edges: true,
            show_labels: true,
            show_streaming_text: true,
            show_score_bars: true,
            max_label_length: 0,
            corner_radius: 8.0,
            dot_size: 0.0,
        },
        LodLevel::Simplified => LodParams {
            curved_edges: false,
            show_edges: true,
            show_labels: true,
            show_streaming_text: false,
            show_score_bars: false,
            max_label_length: 12,
            corner_radius: 4.0,
            dot_size: 0.0,
        },
        LodLevel::Dots => LodParams {
            curved_edges: false,
            show_edges: false,
            show_labels: false,
            show_streaming_text: false,
            show_score_bars: false,
            max_label_length: 0,
            corner_radius: 0.0,
            dot_size: 6.0,
        },
    }
}
