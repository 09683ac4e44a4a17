//! Pointer handling for the canvas: hit testing, pan drags, anchored
//! zooming, hover tracking. Emits what happened; the engine decides what it
//! means.

use eframe::egui::{self, CursorIcon, Pos2, Rect, Ui};

use crate::tree::TreeData;
use crate::viewport::Viewport;

/// What one frame of input produced. `hover_changed` is `Some` only on the
/// frame the hovered node actually changes, carrying the new value.
#[derive(Clone, Debug, Default)]
pub struct InteractionOutput {
    pub clicked: Option<String>,
    pub double_clicked: Option<String>,
    pub hover_changed: Option<Option<String>>,
    pub viewport_changed: bool,
}

#[derive(Debug, Default)]
pub struct InteractionHandler {
    hovered: Option<String>,
    // A drag that began on a node is swallowed; only empty space pans.
    panning: bool,
}

/// Topmost node under a canvas-relative screen point. Later arena entries
/// draw on top, so scan in reverse.
pub fn hit_test(tree: &TreeData, viewport: &Viewport, screen: Pos2) -> Option<usize> {
    let world = viewport.screen_to_world(screen);
    tree.nodes()
        .iter()
        .enumerate()
        .rev()
        .find(|(_, node)| node.contains(world))
        .map(|(index, _)| index)
}

impl InteractionHandler {
    pub fn hovered_id(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
        self.panning = false;
    }

    pub fn handle(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        tree: Option<&TreeData>,
        viewport: &mut Viewport,
    ) -> InteractionOutput {
        let mut output = InteractionOutput::default();

        let node_at = |viewport: &Viewport, screen: Pos2| {
            tree.and_then(|tree| hit_test(tree, viewport, screen - rect.min.to_vec2()))
                .and_then(|index| tree.map(|tree| tree.nodes()[index].id.clone()))
        };

        if response.hovered() {
            let zoom_delta = ui.input(|input| input.zoom_delta());
            if (zoom_delta - 1.0).abs() > f32::EPSILON {
                let pointer = ui
                    .input(|input| input.pointer.hover_pos())
                    .unwrap_or_else(|| rect.center());
                viewport.zoom_at(zoom_delta - 1.0, pointer - rect.min.to_vec2());
                output.viewport_changed = true;
            }

            if let Some(touch) = ui.input(|input| input.multi_touch()) {
                let delta = touch.translation_delta;
                if delta.length() > f32::EPSILON {
                    viewport.pan_by(delta);
                    output.viewport_changed = true;
                }
            }
        }

        // A primary press decides immediately: on a node it is the click, on
        // empty space it starts a pan. No waiting for release.
        if ui.input(|input| input.pointer.primary_pressed())
            && let Some(origin) = ui.input(|input| input.pointer.press_origin())
            && rect.contains(origin)
        {
            match node_at(viewport, origin) {
                Some(id) => {
                    self.panning = false;
                    output.clicked = Some(id);
                }
                None => self.panning = true,
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) && self.panning {
            let delta = response.drag_delta();
            if delta.length() > f32::EPSILON {
                viewport.pan_by(delta);
                output.viewport_changed = true;
            }
        }
        if ui.input(|input| input.pointer.primary_released()) {
            self.panning = false;
        }

        if response.double_clicked()
            && let Some(pointer) = response.interact_pointer_pos()
            && let Some(id) = node_at(viewport, pointer)
        {
            output.double_clicked = Some(id);
        }

        let hovered = if self.panning {
            self.hovered.clone()
        } else {
            ui.input(|input| input.pointer.hover_pos())
                .filter(|pointer| rect.contains(*pointer))
                .and_then(|pointer| node_at(viewport, pointer))
        };
        if hovered != self.hovered {
            self.hovered = hovered.clone();
            output.hover_changed = Some(hovered);
        }

        let cursor = if self.panning {
            CursorIcon::Grabbing
        } else if self.hovered.is_some() {
            CursorIcon::PointingHand
        } else {
            CursorIcon::Grab
        };
        if response.hovered() {
            ui.output_mut(|out| out.cursor_icon = cursor);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FunctionTreeConfig;
    use crate::input::ExecutionInput;
    use crate::layout::layout_tree;
    use crate::tree::build_tree;
    use eframe::egui::{pos2, vec2};

    fn laid_out(raw: &str) -> TreeData {
        let execution = ExecutionInput::from_json(raw).unwrap();
        let mut tree = build_tree(Some(&execution), None).unwrap();
        layout_tree(&mut tree, &FunctionTreeConfig::default());
        tree
    }

    #[test]
    fn hit_test_finds_node_under_point() {
        let tree = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);
        let viewport = Viewport::default();

        let root_center = viewport.world_to_screen(tree.root().center());
        let hit = hit_test(&tree, &viewport, root_center).unwrap();
        assert_eq!(tree.nodes()[hit].id, "root");

        let child_center = viewport.world_to_screen(tree.get("vc-0").unwrap().center());
        let hit = hit_test(&tree, &viewport, child_center).unwrap();
        assert_eq!(tree.nodes()[hit].id, "vc-0");
    }

    #[test]
    fn hit_test_misses_empty_space() {
        let tree = laid_out(r#"{ "tasks": [] }"#);
        let viewport = Viewport::default();
        let outside = viewport.world_to_screen(pos2(5000.0, 5000.0));
        assert!(hit_test(&tree, &viewport, outside).is_none());
    }

    #[test]
    fn hit_test_respects_pan_and_zoom() {
        let tree = laid_out(r#"{ "tasks": [] }"#);
        let mut viewport = Viewport::default();
        viewport.pan = vec2(-300.0, 200.0);
        viewport.zoom = 0.5;

        let screen = viewport.world_to_screen(tree.root().center());
        let hit = hit_test(&tree, &viewport, screen).unwrap();
        assert_eq!(tree.nodes()[hit].id, "root");

        // The same screen point misses once the camera moves away.
        viewport.pan = vec2(5000.0, 5000.0);
        assert!(hit_test(&tree, &viewport, screen).is_none());
    }

    fn press_frame(
        tree: &TreeData,
        viewport: &mut Viewport,
        handler: &mut InteractionHandler,
        at: Pos2,
    ) -> InteractionOutput {
        let ctx = egui::Context::default();
        let mut raw = egui::RawInput::default();
        raw.screen_rect = Some(Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0)));
        raw.events.push(egui::Event::PointerMoved(at));
        raw.events.push(egui::Event::PointerButton {
            pos: at,
            button: egui::PointerButton::Primary,
            pressed: true,
            modifiers: egui::Modifiers::default(),
        });

        let mut output = InteractionOutput::default();
        let _ = ctx.run(raw, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    let (rect, response) =
                        ui.allocate_exact_size(vec2(800.0, 600.0), egui::Sense::click_and_drag());
                    output = handler.handle(ui, rect, &response, Some(tree), viewport);
                });
        });
        output
    }

    #[test]
    fn press_on_node_fires_click_before_release() {
        let tree = laid_out(r#"{ "tasks": [] }"#);
        let mut viewport = Viewport::default();
        // Put the root box around screen (400, 300).
        viewport.pan = vec2(-400.0, -260.0);
        let mut handler = InteractionHandler::default();

        // Only a press event is injected; no release ever happens.
        let output = press_frame(&tree, &mut viewport, &mut handler, pos2(400.0, 300.0));
        assert_eq!(output.clicked.as_deref(), Some("root"));
    }

    #[test]
    fn press_on_empty_space_does_not_click() {
        let tree = laid_out(r#"{ "tasks": [] }"#);
        let mut viewport = Viewport::default();
        viewport.pan = vec2(-400.0, -260.0);
        let mut handler = InteractionHandler::default();

        let output = press_frame(&tree, &mut viewport, &mut handler, pos2(700.0, 50.0));
        assert!(output.clicked.is_none());
        assert!(output.double_clicked.is_none());
    }

    #[test]
    fn hit_test_prefers_later_arena_entries() {
        // Siblings never overlap after layout, so overlap is forced by hand.
        let mut tree = laid_out(r#"{ "tasks": [ { "scores": [] }, { "scores": [] } ] }"#);
        let second = tree.index_of("vc-1").unwrap();
        let first_pos = tree.get("vc-0").unwrap().pos;
        tree.nodes_mut()[second].pos = first_pos;

        let viewport = Viewport::default();
        let screen = viewport.world_to_screen(tree.get("vc-0").unwrap().center());
        let hit = hit_test(&tree, &viewport, screen).unwrap();
        assert_eq!(tree.nodes()[hit].id, "vc-1");
    }
}
