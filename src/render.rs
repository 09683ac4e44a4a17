//! Painter-based tree rendering. Stateless per frame apart from the text
//! width cache; draws edges below nodes, then node bodies or dots per the
//! LOD tier, then exit ghosts.

use std::collections::{HashMap, VecDeque};

use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind,
    epaint::CubicBezierShape, pos2, vec2,
};

use crate::animation::NodeAnimator;
use crate::lod::{LodLevel, LodParams, lod_level, lod_params};
use crate::theme::{RenderTheme, SCORE_GREEN, SCORE_ORANGE, SCORE_RED, SCORE_YELLOW, score_color};
use crate::tree::{NodeKind, NodePayload, NodeState, TreeData, TreeNode};
use crate::viewport::Viewport;

const EDGE_CULL_MARGIN: f32 = 50.0;
const TEXT_CACHE_CAP: usize = 500;

/// Everything one frame needs, borrowed from the engine.
pub struct RenderFrame<'a> {
    pub tree: &'a TreeData,
    pub viewport: &'a Viewport,
    pub theme: &'a RenderTheme,
    pub animator: &'a NodeAnimator,
    pub selected: Option<&'a str>,
    pub hovered: Option<&'a str>,
    pub now: f64,
}

/// Width cache for measured text, keyed by content and font size. Oldest
/// entry is evicted once the cap is reached.
#[derive(Debug, Default)]
struct TextWidthCache {
    widths: HashMap<(String, u32), f32>,
    order: VecDeque<(String, u32)>,
}

impl TextWidthCache {
    fn get_or_insert_with(&mut self, text: &str, size: u32, measure: impl FnOnce() -> f32) -> f32 {
        let key = (text.to_string(), size);
        if let Some(&width) = self.widths.get(&key) {
            return width;
        }
        let width = measure();
        if self.widths.len() >= TEXT_CACHE_CAP
            && let Some(oldest) = self.order.pop_front()
        {
            self.widths.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.widths.insert(key, width);
        width
    }

    fn clear(&mut self) {
        self.widths.clear();
        self.order.clear();
    }
}

#[derive(Debug, Default)]
pub struct TreeRenderer {
    text_cache: TextWidthCache,
}

impl TreeRenderer {
    pub fn clear_text_cache(&mut self) {
        self.text_cache.clear();
    }

    pub fn render(&mut self, painter: &Painter, rect: Rect, frame: &RenderFrame<'_>) {
        painter.rect_filled(rect, 0.0, frame.theme.bg);

        let level = lod_level(frame.viewport.zoom);
        let params = lod_params(level);

        if params.show_edges {
            self.draw_edges(painter, rect, frame, &params);
        }

        if level == LodLevel::Dots {
            self.draw_dots(painter, rect, frame, &params);
        } else {
            for node in frame.tree.nodes() {
                self.draw_node(painter, rect, frame, &params, node);
            }
            self.draw_exit_ghosts(painter, rect, frame, &params);
        }
    }

    fn project(rect: Rect, viewport: &Viewport, world: Pos2) -> Pos2 {
        rect.min + viewport.world_to_screen(world).to_vec2()
    }

    fn edge_visible(rect: Rect, a: Pos2, b: Pos2) -> bool {
        let margin = EDGE_CULL_MARGIN;
        !((a.x < rect.left() - margin && b.x < rect.left() - margin)
            || (a.x > rect.right() + margin && b.x > rect.right() + margin)
            || (a.y < rect.top() - margin && b.y < rect.top() - margin)
            || (a.y > rect.bottom() + margin && b.y > rect.bottom() + margin))
    }

    fn draw_edges(&self, painter: &Painter, rect: Rect, frame: &RenderFrame<'_>, params: &LodParams) {
        let zoom = frame.viewport.zoom;
        let stroke = Stroke::new(frame.theme.edge_width * zoom, frame.theme.edge_color);

        for node in frame.tree.nodes() {
            if node.children.is_empty() {
                continue;
            }
            let (parent_pos, _) = frame.animator.animated_pos(&node.id, node.pos, frame.now);
            let parent_anchor = pos2(parent_pos.x + node.size.x / 2.0, parent_pos.y + node.size.y);

            for &child_index in &node.children {
                let child = &frame.tree.nodes()[child_index];
                let (child_pos, _) = frame.animator.animated_pos(&child.id, child.pos, frame.now);
                let child_anchor = pos2(child_pos.x + child.size.x / 2.0, child_pos.y);

                let start = Self::project(rect, frame.viewport, parent_anchor);
                let end = Self::project(rect, frame.viewport, child_anchor);
                if !Self::edge_visible(rect, start, end) {
                    continue;
                }

                if params.curved_edges {
                    let mid_y = start.y + (end.y - start.y) / 2.0;
                    painter.add(CubicBezierShape::from_points_stroke(
                        [start, pos2(start.x, mid_y), pos2(end.x, mid_y), end],
                        false,
                        Color32::TRANSPARENT,
                        stroke,
                    ));
                } else {
                    painter.line_segment([start, end], stroke);
                }
            }
        }
    }

    fn kind_color(kind: NodeKind, theme: &RenderTheme) -> Color32 {
        match kind {
            NodeKind::Function => theme.accent,
            NodeKind::VectorCompletion => SCORE_GREEN,
            NodeKind::Llm => SCORE_YELLOW,
        }
    }

    fn state_color(state: NodeState, theme: &RenderTheme) -> Color32 {
        match state {
            NodeState::Complete => SCORE_GREEN,
            NodeState::Streaming => theme.accent,
            NodeState::Error => SCORE_RED,
            NodeState::Pending => theme.node_border,
        }
    }

    fn draw_dots(&self, painter: &Painter, rect: Rect, frame: &RenderFrame<'_>, params: &LodParams) {
        // Constant screen-space dot size, regardless of zoom.
        let size = vec2(params.dot_size, params.dot_size);

        for node in frame.tree.nodes() {
            let (pos, opacity) = frame.animator.animated_pos(&node.id, node.pos, frame.now);
            if !frame.viewport.is_visible(pos, node.size, rect.size()) {
                continue;
            }
            let center = Self::project(rect, frame.viewport, pos + node.size / 2.0);
            painter.rect_filled(
                Rect::from_center_size(center, size),
                0.0,
                Self::kind_color(node.kind(), frame.theme).gamma_multiply(opacity),
            );
        }
    }

    fn draw_node(
        &mut self,
        painter: &Painter,
        rect: Rect,
        frame: &RenderFrame<'_>,
        params: &LodParams,
        node: &TreeNode,
    ) {
        let (pos, opacity) = frame.animator.animated_pos(&node.id, node.pos, frame.now);
        if !frame.viewport.is_visible(pos, node.size, rect.size()) {
            return;
        }

        let theme = frame.theme;
        let zoom = frame.viewport.zoom;
        let body = Rect::from_min_size(Self::project(rect, frame.viewport, pos), node.size * zoom);

        let is_selected = frame.selected == Some(node.id.as_str());
        let is_hovered = frame.hovered == Some(node.id.as_str());
        let border = if is_selected {
            theme.node_selected_border
        } else if is_hovered {
            theme.accent
        } else {
            theme.node_border
        };
        let border_width = if is_selected || is_hovered { 2.0 } else { 1.0 };

        painter.rect(
            body,
            params.corner_radius * zoom,
            theme.node_bg.gamma_multiply(opacity),
            Stroke::new(border_width * zoom, border.gamma_multiply(opacity)),
            StrokeKind::Inside,
        );

        match &node.payload {
            NodePayload::Function(data) => {
                self.draw_function_body(painter, frame, params, node, body, opacity, data)
            }
            NodePayload::VectorCompletion(data) => {
                self.draw_vector_completion_body(painter, frame, params, node, body, opacity, data)
            }
            NodePayload::Llm(data) => {
                self.draw_llm_body(painter, frame, params, node, body, opacity, data)
            }
        }

        // State indicator dot, top-right corner.
        painter.circle_filled(
            body.min + vec2(node.size.x - 12.0, 8.0) * zoom,
            4.0 * zoom,
            Self::state_color(node.state, theme).gamma_multiply(opacity),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_function_body(
        &self,
        painter: &Painter,
        frame: &RenderFrame<'_>,
        params: &LodParams,
        node: &TreeNode,
        body: Rect,
        opacity: f32,
        data: &crate::tree::FunctionData,
    ) {
        let theme = frame.theme;
        let zoom = frame.viewport.zoom;
        let padding = 10.0;

        // Accent stripe down the left edge.
        painter.rect_filled(
            Rect::from_min_size(body.min, vec2(4.0 * zoom, body.height())),
            0.0,
            theme.accent.gamma_multiply(opacity),
        );

        if params.show_labels {
            painter.text(
                body.min + vec2(padding + 4.0, 22.0) * zoom,
                Align2::LEFT_BOTTOM,
                truncate(&node.label, params.max_label_length),
                FontId::proportional(theme.font_size * zoom),
                theme.text.gamma_multiply(opacity),
            );
        }

        if params.show_score_bars
            && let Some(output) = &data.output
        {
            let (text, color) = match output {
                crate::input::OutputValue::Scalar(value) => {
                    (format!("{:.1}%", value * 100.0), score_color(*value))
                }
                crate::input::OutputValue::Vector(values) => {
                    let inner = values
                        .iter()
                        .map(|v| format!("{v:.2}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    (format!("[{inner}]"), theme.text_secondary)
                }
            };
            painter.text(
                body.min + vec2(padding + 4.0, 42.0) * zoom,
                Align2::LEFT_BOTTOM,
                text,
                FontId::proportional(theme.font_size * zoom),
                color.gamma_multiply(opacity),
            );
        }

        if params.show_labels {
            painter.text(
                body.min + vec2(padding + 4.0, 60.0) * zoom,
                Align2::LEFT_BOTTOM,
                format!("{} tasks", data.task_count),
                FontId::proportional(theme.font_size_small * zoom),
                theme.text_secondary.gamma_multiply(opacity),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_vector_completion_body(
        &self,
        painter: &Painter,
        frame: &RenderFrame<'_>,
        params: &LodParams,
        node: &TreeNode,
        body: Rect,
        opacity: f32,
        data: &crate::tree::VectorCompletionData,
    ) {
        let theme = frame.theme;
        let zoom = frame.viewport.zoom;
        let padding = 10.0;

        if params.show_labels {
            painter.text(
                body.min + vec2(padding, 20.0) * zoom,
                Align2::LEFT_BOTTOM,
                truncate(&node.label, params.max_label_length),
                FontId::proportional(theme.font_size * zoom),
                theme.text.gamma_multiply(opacity),
            );
        }

        if params.show_score_bars
            && let Some(scores) = &data.scores
            && let Some(max_score) = scores.iter().copied().reduce(f64::max)
        {
            let bar_width = node.size.x - padding * 2.0;
            let bar = Rect::from_min_size(
                body.min + vec2(padding, 32.0) * zoom,
                vec2(bar_width, 6.0) * zoom,
            );
            painter.rect_filled(bar, 3.0 * zoom, theme.node_border.gamma_multiply(opacity));
            let fill = Rect::from_min_size(
                bar.min,
                vec2(bar_width * max_score as f32, 6.0) * zoom,
            );
            painter.rect_filled(fill, 3.0 * zoom, score_color(max_score).gamma_multiply(opacity));
        }

        if params.show_labels {
            painter.text(
                body.min + vec2(padding, 56.0) * zoom,
                Align2::LEFT_BOTTOM,
                format!("{} LLMs", data.vote_count()),
                FontId::proportional(theme.font_size_small * zoom),
                theme.text_secondary.gamma_multiply(opacity),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_llm_body(
        &mut self,
        painter: &Painter,
        frame: &RenderFrame<'_>,
        params: &LodParams,
        node: &TreeNode,
        body: Rect,
        opacity: f32,
        data: &crate::tree::LlmData,
    ) {
        let theme = frame.theme;
        let zoom = frame.viewport.zoom;
        let padding = 8.0;

        if params.show_labels {
            painter.text(
                body.min + vec2(padding, 16.0) * zoom,
                Align2::LEFT_BOTTOM,
                truncate(&node.label, params.max_label_length),
                FontId::proportional(theme.font_size * zoom),
                theme.text.gamma_multiply(opacity),
            );
        }

        if params.show_score_bars {
            let bar_width = node.size.x - padding * 2.0;
            let bar = Rect::from_min_size(
                body.min + vec2(padding, 24.0) * zoom,
                vec2(bar_width, 4.0) * zoom,
            );
            painter.rect_filled(bar, 2.0 * zoom, theme.node_border.gamma_multiply(opacity));
            let fill = Rect::from_min_size(
                bar.min,
                vec2(bar_width * (data.weight as f32).min(1.0), 4.0) * zoom,
            );
            painter.rect_filled(fill, 2.0 * zoom, theme.accent.gamma_multiply(opacity));
        }

        if params.show_streaming_text && !data.streaming_text.is_empty() {
            let preview = truncate(&data.streaming_text.replace('\n', " "), 30);
            painter.text(
                body.min + vec2(padding, 44.0) * zoom,
                Align2::LEFT_BOTTOM,
                preview,
                FontId::proportional(theme.font_size_small * zoom),
                theme.text_secondary.gamma_multiply(opacity),
            );
        }

        if params.show_labels && (data.from_cache || data.from_rng) {
            let (badge, color) = if data.from_rng {
                ("RNG", SCORE_ORANGE)
            } else {
                ("CACHE", SCORE_YELLOW)
            };
            let font = FontId::proportional(theme.font_size_small * zoom);
            let width = self.text_cache.get_or_insert_with(
                badge,
                (theme.font_size_small * zoom * 10.0) as u32,
                || {
                    painter
                        .layout_no_wrap(badge.to_string(), font.clone(), color)
                        .size()
                        .x
                },
            );
            painter.text(
                body.min + vec2(node.size.x - padding, 16.0) * zoom - vec2(width, 0.0),
                Align2::LEFT_BOTTOM,
                badge,
                font,
                color.gamma_multiply(opacity),
            );
        }
    }

    fn draw_exit_ghosts(
        &self,
        painter: &Painter,
        rect: Rect,
        frame: &RenderFrame<'_>,
        params: &LodParams,
    ) {
        let theme = frame.theme;
        let zoom = frame.viewport.zoom;

        for (ghost, opacity) in frame.animator.exit_ghosts(frame.now) {
            if !frame.viewport.is_visible(ghost.pos, ghost.size, rect.size()) {
                continue;
            }
            let body = Rect::from_min_size(
                Self::project(rect, frame.viewport, ghost.pos),
                ghost.size * zoom,
            );
            painter.rect(
                body,
                params.corner_radius * zoom,
                theme.node_bg.gamma_multiply(opacity),
                Stroke::new(zoom, theme.node_border.gamma_multiply(opacity)),
                StrokeKind::Inside,
            );
        }
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if max_len == 0 || text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len - 1).collect();
    out.push('\u{2026}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 12), "short");
        assert_eq!(truncate("unlimited because zero", 0), "unlimited because zero");
    }

    #[test]
    fn truncate_ends_with_ellipsis_at_cap() {
        let out = truncate("a very long node label", 12);
        assert_eq!(out.chars().count(), 12);
        assert!(out.ends_with('\u{2026}'));
    }

    #[test]
    fn truncate_is_char_safe() {
        let out = truncate("αβγδεζηθικλμν", 5);
        assert_eq!(out.chars().count(), 5);
    }

    #[test]
    fn text_cache_evicts_oldest_beyond_cap() {
        let mut cache = TextWidthCache::default();
        for i in 0..TEXT_CACHE_CAP {
            cache.get_or_insert_with(&format!("t{i}"), 13, || i as f32);
        }
        assert_eq!(cache.widths.len(), TEXT_CACHE_CAP);

        cache.get_or_insert_with("one-more", 13, || 1.0);
        assert_eq!(cache.widths.len(), TEXT_CACHE_CAP);
        assert!(!cache.widths.contains_key(&("t0".to_string(), 13)));
        assert!(cache.widths.contains_key(&("one-more".to_string(), 13)));
    }

    #[test]
    fn text_cache_hits_do_not_remeasure() {
        let mut cache = TextWidthCache::default();
        assert_eq!(cache.get_or_insert_with("label", 13, || 42.0), 42.0);
        assert_eq!(
            cache.get_or_insert_with("label", 13, || panic!("must hit cache")),
            42.0
        );
    }

    #[test]
    fn edge_culling_margin() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0));
        // Both endpoints far beyond the same side.
        assert!(!TreeRenderer::edge_visible(rect, pos2(-60.0, 10.0), pos2(-70.0, 50.0)));
        // One endpoint inside the margin keeps the edge.
        assert!(TreeRenderer::edge_visible(rect, pos2(-40.0, 10.0), pos2(-70.0, 50.0)));
        // Endpoints straddling the canvas are always kept.
        assert!(TreeRenderer::edge_visible(rect, pos2(-100.0, 300.0), pos2(900.0, 300.0)));
    }
}
