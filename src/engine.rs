//! The engine ties the pieces together: it owns the arena, camera, animator
//! and renderer, debounces layout during rapid streaming updates, and drives
//! one egui widget per frame.

use std::collections::HashMap;

use eframe::egui::{self, Rect, Sense, Ui, Vec2, vec2};

use crate::animation::{NodeAnimator, NodeSnapshot, snapshot};
use crate::config::FunctionTreeConfig;
use crate::input::ExecutionInput;
use crate::interaction::InteractionHandler;
use crate::layout::layout_tree;
use crate::render::{RenderFrame, TreeRenderer};
use crate::theme::resolve_theme;
use crate::tree::{ModelNames, TreeData, TreeNode, build_tree};
use crate::viewport::{Viewport, ViewportState};

const ZOOM_STEP: f32 = 0.3;
const FIT_PADDING: f32 = 40.0;
const MIN_INITIAL_ZOOM: f32 = 0.4;
const FOCUS_ZOOM: f32 = 1.2;
const DOUBLE_CLICK_ZOOM: f32 = 1.5;

/// Minimum spacing between layout passes while data streams in. The first
/// request in a window runs immediately; later ones coalesce into a single
/// catch-up pass when the window expires.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum SchedulerState {
    #[default]
    Idle,
    CoolingDown {
        until: f64,
        pending: bool,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LayoutScheduler {
    state: SchedulerState,
}

impl LayoutScheduler {
    const COOLDOWN: f64 = 0.333;

    /// Returns whether the caller should lay out right now.
    fn request(&mut self, now: f64) -> bool {
        match self.state {
            SchedulerState::CoolingDown { until, .. } if now < until => {
                self.state = SchedulerState::CoolingDown {
                    until,
                    pending: true,
                };
                false
            }
            _ => {
                self.state = SchedulerState::CoolingDown {
                    until: now + Self::COOLDOWN,
                    pending: false,
                };
                true
            }
        }
    }

    /// Call every frame. Returns whether a deferred request is now due; the
    /// catch-up pass does not open a new cooldown window.
    fn poll(&mut self, now: f64) -> bool {
        match self.state {
            SchedulerState::CoolingDown { until, pending } if now >= until => {
                self.state = SchedulerState::Idle;
                pending
            }
            _ => false,
        }
    }

    /// Seconds until the deferred pass is due, if one is queued.
    fn pending_in(&self, now: f64) -> Option<f64> {
        match self.state {
            SchedulerState::CoolingDown { until, pending: true } => Some((until - now).max(0.0)),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.state = SchedulerState::Idle;
    }
}

type NodeCallback = Box<dyn FnMut(&TreeNode)>;
type HoverCallback = Box<dyn FnMut(Option<&TreeNode>)>;

pub struct FunctionTreeEngine {
    config: FunctionTreeConfig,
    viewport: Viewport,
    renderer: TreeRenderer,
    animator: NodeAnimator,
    interaction: InteractionHandler,
    scheduler: LayoutScheduler,

    tree: Option<TreeData>,
    prev_snapshot: Option<HashMap<String, NodeSnapshot>>,
    selected: Option<String>,
    canvas_size: Vec2,
    has_initial_fit: bool,
    destroyed: bool,

    on_node_click: Option<NodeCallback>,
    on_node_hover: Option<HoverCallback>,
    on_selected_change: Option<HoverCallback>,
}

impl FunctionTreeEngine {
    pub fn new(config: FunctionTreeConfig) -> Self {
        let viewport = Viewport::new(config.min_zoom, config.max_zoom);
        Self {
            config,
            viewport,
            renderer: TreeRenderer::default(),
            animator: NodeAnimator::default(),
            interaction: InteractionHandler::default(),
            scheduler: LayoutScheduler::default(),
            tree: None,
            prev_snapshot: None,
            selected: None,
            canvas_size: vec2(800.0, 600.0),
            has_initial_fit: false,
            destroyed: false,
            on_node_click: None,
            on_node_hover: None,
            on_selected_change: None,
        }
    }

    pub fn on_node_click(&mut self, callback: impl FnMut(&TreeNode) + 'static) {
        self.on_node_click = Some(Box::new(callback));
    }

    pub fn on_node_hover(&mut self, callback: impl FnMut(Option<&TreeNode>) + 'static) {
        self.on_node_hover = Some(Box::new(callback));
    }

    pub fn on_selected_node_change(&mut self, callback: impl FnMut(Option<&TreeNode>) + 'static) {
        self.on_selected_change = Some(Box::new(callback));
    }

    pub fn config(&self) -> &FunctionTreeConfig {
        &self.config
    }

    pub fn tree(&self) -> Option<&TreeData> {
        self.tree.as_ref()
    }

    /// Swap in a fresh execution snapshot. Call per streaming chunk; layout
    /// runs at most three times a second, the rest coalesce.
    pub fn set_data(
        &mut self,
        data: Option<&ExecutionInput>,
        model_names: Option<&ModelNames>,
        now: f64,
    ) {
        if self.destroyed {
            return;
        }

        let Some(tree) = build_tree(data, model_names) else {
            self.tree = None;
            self.prev_snapshot = None;
            self.has_initial_fit = false;
            self.animator.clear();
            self.scheduler.reset();
            return;
        };

        self.tree = Some(tree);
        if self.scheduler.request(now) {
            self.execute_layout(now);
        }
    }

    pub fn set_config(&mut self, config: FunctionTreeConfig) {
        self.config = config;
        self.viewport
            .set_zoom_range(self.config.min_zoom, self.config.max_zoom);
        if let Some(tree) = &mut self.tree {
            layout_tree(tree, &self.config);
            self.prev_snapshot = Some(snapshot(tree));
        }
    }

    pub fn resize(&mut self, size: Vec2) {
        if size.x > 0.0 && size.y > 0.0 {
            self.canvas_size = size;
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport
            .zoom_at(ZOOM_STEP, (self.canvas_size / 2.0).to_pos2());
    }

    pub fn zoom_out(&mut self) {
        self.viewport
            .zoom_at(-ZOOM_STEP, (self.canvas_size / 2.0).to_pos2());
    }

    pub fn fit_to_content(&mut self) {
        if let Some(tree) = &self.tree {
            self.viewport
                .fit_to_content(tree.nodes(), self.canvas_size, FIT_PADDING, MIN_INITIAL_ZOOM);
        }
    }

    /// Glide the camera onto a node.
    pub fn zoom_to_node(&mut self, id: &str, now: f64) {
        self.focus_node(id, FOCUS_ZOOM, now);
    }

    fn focus_node(&mut self, id: &str, zoom: f32, now: f64) {
        let Some(node) = self.tree.as_ref().and_then(|tree| tree.get(id)) else {
            return;
        };
        let target = ViewportState {
            pan: vec2(
                node.pos.x + node.size.x / 2.0 - self.canvas_size.x / (2.0 * zoom),
                node.pos.y - 20.0,
            ),
            zoom,
        };
        self.viewport
            .animate_to(target, f64::from(self.config.animation_duration) / 1000.0, now);
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        let id = self.selected.as_deref()?;
        self.tree.as_ref()?.get(id)
    }

    pub fn deselect(&mut self) {
        self.selected = None;
        self.emit_selected_change();
    }

    /// Drop all state. The engine ignores further updates; dropping the
    /// value outright is the usual way to get here.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.tree = None;
        self.prev_snapshot = None;
        self.selected = None;
        self.animator.clear();
        self.scheduler.reset();
        self.interaction.clear_hover();
        self.renderer.clear_text_cache();
        self.on_node_click = None;
        self.on_node_hover = None;
        self.on_selected_change = None;
    }

    fn execute_layout(&mut self, now: f64) {
        let Some(tree) = &mut self.tree else {
            return;
        };

        layout_tree(tree, &self.config);
        log::debug!("laid out {} nodes", tree.len());

        if self.config.animate {
            self.animator.schedule(
                self.prev_snapshot.as_ref(),
                tree,
                f64::from(self.config.animation_duration) / 1000.0,
                now,
            );
        }
        self.prev_snapshot = Some(snapshot(tree));

        if !self.has_initial_fit {
            self.has_initial_fit = true;
            self.viewport
                .fit_to_content(tree.nodes(), self.canvas_size, FIT_PADDING, MIN_INITIAL_ZOOM);
        }
    }

    fn toggle_selection(&mut self, id: &str) {
        self.selected = if self.selected.as_deref() == Some(id) {
            None
        } else {
            Some(id.to_string())
        };
        self.emit_selected_change();
    }

    fn emit_selected_change(&mut self) {
        if let Some(mut callback) = self.on_selected_change.take() {
            let node = self
                .selected
                .as_deref()
                .and_then(|id| self.tree.as_ref()?.get(id))
                .cloned();
            callback(node.as_ref());
            self.on_selected_change = Some(callback);
        }
    }

    /// Draw the tree into the available space and process this frame's
    /// input. The whole engine advances on the `Ui` clock.
    pub fn show(&mut self, ui: &mut Ui) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.resize(rect.size());

        if self.destroyed {
            return response;
        }

        let now = ui.input(|input| input.time);

        if self.scheduler.poll(now) {
            self.execute_layout(now);
        }

        let output =
            self.interaction
                .handle(ui, rect, &response, self.tree.as_ref(), &mut self.viewport);

        if let Some(id) = &output.double_clicked {
            let id = id.clone();
            self.focus_node(&id, DOUBLE_CLICK_ZOOM, now);
        } else if let Some(id) = &output.clicked {
            let id = id.clone();
            let node = self.tree.as_ref().and_then(|tree| tree.get(&id)).cloned();
            if let Some(node) = &node
                && let Some(mut callback) = self.on_node_click.take()
            {
                callback(node);
                self.on_node_click = Some(callback);
            }
            self.toggle_selection(&id);
        }

        if let Some(hovered) = &output.hover_changed
            && let Some(mut callback) = self.on_node_hover.take()
        {
            let node = hovered
                .as_deref()
                .and_then(|id| self.tree.as_ref()?.get(id))
                .cloned();
            callback(node.as_ref());
            self.on_node_hover = Some(callback);
        }

        let camera_moving = self.viewport.tick(now);
        self.animator.prune(now);
        let nodes_moving = self.config.animate && self.animator.is_animating(now);

        self.paint(ui, rect, now);

        if camera_moving || nodes_moving {
            ui.ctx().request_repaint();
        } else if let Some(wait) = self.scheduler.pending_in(now) {
            ui.ctx()
                .request_repaint_after(std::time::Duration::from_secs_f64(wait));
        }

        response
    }

    fn paint(&mut self, ui: &Ui, rect: Rect, now: f64) {
        let theme = resolve_theme(self.config.theme, ui.visuals().dark_mode);
        let painter = ui.painter_at(rect);

        let Some(tree) = &self.tree else {
            painter.rect_filled(rect, 0.0, theme.bg);
            return;
        };

        self.renderer.render(
            &painter,
            rect,
            &RenderFrame {
                tree,
                viewport: &self.viewport,
                theme: &theme,
                animator: &self.animator,
                selected: self.selected.as_deref(),
                hovered: self.interaction.hovered_id(),
                now,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[cfg(test)]
    pub(crate) fn positions(&self) -> Vec<(String, egui::Pos2)> {
        self.tree
            .as_ref()
            .map(|tree| {
                tree.nodes()
                    .iter()
                    .map(|node| (node.id.clone(), node.pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn tick_for_test(&mut self, now: f64) {
        if self.scheduler.poll(now) {
            self.execute_layout(now);
        }
        self.viewport.tick(now);
        self.animator.prune(now);
    }
}

impl Default for FunctionTreeEngine {
    fn default() -> Self {
        Self::new(FunctionTreeConfig::default())
    }
}
