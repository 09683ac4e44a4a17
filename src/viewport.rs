//! Camera owning pan/zoom state, the screen/world transforms built on it,
//! visibility culling, content framing, and the eased camera tween.

use eframe::egui::{Pos2, Vec2, pos2, vec2};

use crate::layout::tree_bounds;
use crate::tree::TreeNode;

/// Plain value snapshot of the camera, for interpolation and inspection.
/// The live [`Viewport`] is the single owner of camera truth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    pub pan: Vec2,
    pub zoom: f32,
}

#[derive(Clone, Copy, Debug)]
struct CameraTween {
    from: ViewportState,
    to: ViewportState,
    start: f64,
    duration: f64,
}

#[derive(Clone, Debug)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    tween: Option<CameraTween>,
}

pub(crate) fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

impl Viewport {
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom,
            max_zoom,
            tween: None,
        }
    }

    pub fn set_zoom_range(&mut self, min_zoom: f32, max_zoom: f32) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            pan: self.pan,
            zoom: self.zoom,
        }
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        pos2(
            screen.x / self.zoom + self.pan.x,
            screen.y / self.zoom + self.pan.y,
        )
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        pos2(
            (world.x - self.pan.x) * self.zoom,
            (world.y - self.pan.y) * self.zoom,
        )
    }

    /// Whether the screen projection of a world rect overlaps the canvas.
    pub fn is_visible(&self, pos: Pos2, size: Vec2, canvas: Vec2) -> bool {
        let screen = self.world_to_screen(pos);
        let projected = size * self.zoom;

        screen.x + projected.x > 0.0
            && screen.x < canvas.x
            && screen.y + projected.y > 0.0
            && screen.y < canvas.y
    }

    /// Multiply zoom by `1 + delta`, keeping the world point under the given
    /// screen point fixed.
    pub fn zoom_at(&mut self, delta: f32, screen: Pos2) {
        let before = self.screen_to_world(screen);
        self.zoom = (self.zoom * (1.0 + delta)).clamp(self.min_zoom, self.max_zoom);
        let after = self.screen_to_world(screen);
        self.pan += before - after;
    }

    /// Pan by a screen-space drag delta. Dragging right moves the camera
    /// left, scaled into world units by the current zoom.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan -= delta / self.zoom;
    }

    /// Frame the given nodes: fit both dimensions with padding, floor the
    /// zoom at `min_initial_zoom` so the initial view stays legible, center.
    pub fn fit_to_content(
        &mut self,
        nodes: &[TreeNode],
        canvas: Vec2,
        padding: f32,
        min_initial_zoom: f32,
    ) {
        let Some(bounds) = tree_bounds(nodes) else {
            return;
        };
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }

        let available = canvas - vec2(padding * 2.0, padding * 2.0);
        let natural = (available.x / bounds.width()).min(available.y / bounds.height());
        self.zoom = natural
            .max(min_initial_zoom)
            .clamp(self.min_zoom, self.max_zoom);

        self.pan = vec2(
            bounds.min.x - (canvas.x / self.zoom - bounds.width()) / 2.0,
            bounds.min.y - (canvas.y / self.zoom - bounds.height()) / 2.0,
        );
    }

    pub fn animate_to(&mut self, target: ViewportState, duration: f64, now: f64) {
        self.tween = Some(CameraTween {
            from: self.state(),
            to: target,
            start: now,
            duration,
        });
    }

    /// Advance the camera tween. Returns whether it is still in flight so
    /// the render loop knows to keep scheduling frames.
    pub fn tick(&mut self, now: f64) -> bool {
        let Some(tween) = self.tween else {
            return false;
        };

        let t = if tween.duration <= 0.0 {
            1.0
        } else {
            (((now - tween.start) / tween.duration) as f32).clamp(0.0, 1.0)
        };
        let eased = ease_out_cubic(t);

        self.pan = tween.from.pan + (tween.to.pan - tween.from.pan) * eased;
        self.zoom = tween.from.zoom + (tween.to.zoom - tween.from.zoom) * eased;

        if t >= 1.0 {
            self.tween = None;
        }
        self.tween.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.02, 3.0)
    }
}
