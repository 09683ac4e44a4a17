//! Node transition animations between data snapshots. Entering nodes grow
//! out of their parent's bottom edge, moved nodes slide, removed nodes fade
//! out in place as ghosts.

use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2, pos2};

use crate::tree::TreeData;
use crate::viewport::ease_out_cubic;

/// Position and size of a node captured before a rebuild, keyed by node id.
/// Captured as plain values so the old arena can be dropped immediately.
#[derive(Clone, Copy, Debug)]
pub struct NodeSnapshot {
    pub pos: Pos2,
    pub size: Vec2,
}

pub fn snapshot(tree: &TreeData) -> HashMap<String, NodeSnapshot> {
    tree.nodes()
        .iter()
        .map(|node| {
            (
                node.id.clone(),
                NodeSnapshot {
                    pos: node.pos,
                    size: node.size,
                },
            )
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: Pos2,
    fade_in: bool,
    start: f64,
    duration: f64,
}

#[derive(Clone, Debug)]
struct ExitGhost {
    snapshot: NodeSnapshot,
    start: f64,
    duration: f64,
}

fn progress(start: f64, duration: f64, now: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (((now - start) / duration) as f32).clamp(0.0, 1.0)
}

#[derive(Clone, Debug, Default)]
pub struct NodeAnimator {
    transitions: HashMap<String, Transition>,
    exits: Vec<ExitGhost>,
}

impl NodeAnimator {
    /// Diff the previous snapshot against the freshly laid-out arena and
    /// start transitions. Only finished transitions are swept; a live one
    /// keeps running unless the node moved and the diff replaces it, so a
    /// reschedule mid-fade never pops nodes to full opacity.
    ///
    /// With no previous snapshot every node enters in place, fading in at
    /// its own final position.
    pub fn schedule(
        &mut self,
        prev: Option<&HashMap<String, NodeSnapshot>>,
        next: &TreeData,
        duration: f64,
        now: f64,
    ) {
        self.transitions
            .retain(|_, transition| progress(transition.start, transition.duration, now) < 1.0);
        self.exits
            .retain(|ghost| progress(ghost.start, ghost.duration, now) < 1.0);

        let Some(prev) = prev else {
            self.transitions.clear();
            self.exits.clear();
            for node in next.nodes() {
                self.transitions.insert(
                    node.id.clone(),
                    Transition {
                        from: node.pos,
                        fade_in: true,
                        start: now,
                        duration,
                    },
                );
            }
            return;
        };

        for node in next.nodes() {
            match prev.get(&node.id) {
                Some(old) => {
                    // Unmoved nodes keep whatever transition is in flight.
                    if (old.pos - node.pos).length() > 0.5 {
                        self.transitions.insert(
                            node.id.clone(),
                            Transition {
                                from: old.pos,
                                fade_in: false,
                                start: now,
                                duration,
                            },
                        );
                    }
                }
                None => {
                    let from = match node.parent {
                        Some(parent) => {
                            let parent = &next.nodes()[parent];
                            // Spawn point: the parent's previous footprint
                            // when it moved too, else its new one.
                            let origin = prev
                                .get(&parent.id)
                                .copied()
                                .unwrap_or(NodeSnapshot {
                                    pos: parent.pos,
                                    size: parent.size,
                                });
                            pos2(
                                origin.pos.x + origin.size.x / 2.0 - node.size.x / 2.0,
                                origin.pos.y + origin.size.y,
                            )
                        }
                        None => node.pos,
                    };
                    self.transitions.insert(
                        node.id.clone(),
                        Transition {
                            from,
                            fade_in: true,
                            start: now,
                            duration,
                        },
                    );
                }
            }
        }

        self.transitions.retain(|id, _| next.get(id).is_some());

        for (id, old) in prev {
            if next.get(id).is_none() {
                self.exits.push(ExitGhost {
                    snapshot: *old,
                    start: now,
                    duration,
                });
            }
        }
    }

    /// Where to draw the node right now, and at what opacity.
    pub fn animated_pos(&self, id: &str, target: Pos2, now: f64) -> (Pos2, f32) {
        let Some(transition) = self.transitions.get(id) else {
            return (target, 1.0);
        };

        let eased = ease_out_cubic(progress(transition.start, transition.duration, now));
        let pos = transition.from + (target - transition.from) * eased;
        let opacity = if transition.fade_in { eased } else { 1.0 };
        (pos, opacity)
    }

    /// Ghosts of removed nodes, each with its fading opacity. A ghost
    /// disappears once its own window has passed.
    pub fn exit_ghosts(&self, now: f64) -> Vec<(NodeSnapshot, f32)> {
        self.exits
            .iter()
            .filter_map(|ghost| {
                let t = progress(ghost.start, ghost.duration, now);
                (t < 1.0).then(|| (ghost.snapshot, 1.0 - ease_out_cubic(t)))
            })
            .collect()
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.transitions
            .values()
            .any(|transition| progress(transition.start, transition.duration, now) < 1.0)
            || self
                .exits
                .iter()
                .any(|ghost| progress(ghost.start, ghost.duration, now) < 1.0)
    }

    /// Drop finished transitions so stale entries never outlive their window.
    pub fn prune(&mut self, now: f64) {
        self.transitions
            .retain(|_, transition| progress(transition.start, transition.duration, now) < 1.0);
        self.exits
            .retain(|ghost| progress(ghost.start, ghost.duration, now) < 1.0);
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
        self.exits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FunctionTreeConfig;
    use crate::input::ExecutionInput;
    use crate::layout::layout_tree;
    use crate::tree::build_tree;

    fn laid_out(raw: &str) -> TreeData {
        let execution = ExecutionInput::from_json(raw).unwrap();
        let mut tree = build_tree(Some(&execution), None).unwrap();
        layout_tree(&mut tree, &FunctionTreeConfig::default());
        tree
    }

    #[test]
    fn first_build_fades_every_node_in_place() {
        let tree = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);
        let mut animator = NodeAnimator::default();
        animator.schedule(None, &tree, 0.3, 0.0);
        assert!(animator.is_animating(0.0));

        for node in tree.nodes() {
            let (pos, opacity) = animator.animated_pos(&node.id, node.pos, 0.0);
            assert_eq!(pos, node.pos);
            assert_eq!(opacity, 0.0);
        }

        let node = tree.get("vc-0").unwrap();
        let (_, mid) = animator.animated_pos("vc-0", node.pos, 0.15);
        assert!(mid > 0.0 && mid < 1.0);

        let (end_pos, end_opacity) = animator.animated_pos("vc-0", node.pos, 0.3);
        assert_eq!(end_pos, node.pos);
        assert_eq!(end_opacity, 1.0);
        assert!(!animator.is_animating(0.3));
    }

    #[test]
    fn new_node_enters_from_parent_bottom_center() {
        let before = laid_out(r#"{ "tasks": [] }"#);
        let after = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&before)), &after, 0.3, 0.0);
        assert!(animator.is_animating(0.0));

        let node = after.get("vc-0").unwrap();
        let (pos, opacity) = animator.animated_pos("vc-0", node.pos, 0.0);
        let root = after.root();
        assert_eq!(pos.y, root.pos.y + root.size.y);
        assert!((pos.x + node.size.x / 2.0 - root.center().x).abs() < 0.001);
        assert_eq!(opacity, 0.0);

        let (end_pos, end_opacity) = animator.animated_pos("vc-0", node.pos, 0.3);
        assert_eq!(end_pos, node.pos);
        assert_eq!(end_opacity, 1.0);
    }

    #[test]
    fn moved_node_slides_without_fading() {
        let before = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);
        let after = laid_out(r#"{ "tasks": [ { "scores": [] }, { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&before)), &after, 0.3, 0.0);

        let old_pos = before.get("vc-0").unwrap().pos;
        let new_pos = after.get("vc-0").unwrap().pos;
        assert_ne!(old_pos, new_pos);

        let (start_pos, start_opacity) = animator.animated_pos("vc-0", new_pos, 0.0);
        assert_eq!(start_pos, old_pos);
        assert_eq!(start_opacity, 1.0);

        let (mid_pos, _) = animator.animated_pos("vc-0", new_pos, 0.15);
        assert!(mid_pos.x > old_pos.x.min(new_pos.x));
        assert!(mid_pos.x < old_pos.x.max(new_pos.x));
    }

    #[test]
    fn removed_node_fades_out_as_a_ghost() {
        let before = laid_out(r#"{ "tasks": [ { "scores": [] }, { "scores": [] } ] }"#);
        let after = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&before)), &after, 0.3, 0.0);

        let ghosts = animator.exit_ghosts(0.0);
        assert_eq!(ghosts.len(), 1);
        assert_eq!(ghosts[0].1, 1.0);

        let mid = animator.exit_ghosts(0.15);
        assert!(mid[0].1 > 0.0 && mid[0].1 < 1.0);

        assert!(animator.exit_ghosts(0.3).is_empty());
    }

    #[test]
    fn pruning_after_the_window_stops_animation() {
        let before = laid_out(r#"{ "tasks": [] }"#);
        let after = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&before)), &after, 0.3, 0.0);
        assert!(animator.is_animating(0.15));
        assert!(!animator.is_animating(0.35));

        animator.prune(0.35);
        let node = after.get("vc-0").unwrap();
        let (pos, opacity) = animator.animated_pos("vc-0", node.pos, 0.35);
        assert_eq!(pos, node.pos);
        assert_eq!(opacity, 1.0);
    }

    #[test]
    fn reschedule_keeps_an_in_flight_fade_running() {
        let before = laid_out(r#"{ "tasks": [] }"#);
        let after = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&before)), &after, 0.5, 0.0);

        // Same positions in the next snapshot; the fade must keep running
        // from its own start time instead of popping to full opacity.
        animator.schedule(Some(&snapshot(&after)), &after, 0.5, 0.25);
        let node = after.get("vc-0").unwrap();
        let (_, opacity) = animator.animated_pos("vc-0", node.pos, 0.25);
        assert!(opacity > 0.0 && opacity < 1.0);

        let (pos, opacity) = animator.animated_pos("vc-0", node.pos, 0.5);
        assert_eq!(pos, node.pos);
        assert_eq!(opacity, 1.0);
    }

    #[test]
    fn rescheduling_replaces_transitions_for_moved_nodes() {
        let a = laid_out(r#"{ "tasks": [] }"#);
        let b = laid_out(r#"{ "tasks": [ { "scores": [] } ] }"#);
        let c = laid_out(r#"{ "tasks": [ { "scores": [] }, { "scores": [] } ] }"#);

        let mut animator = NodeAnimator::default();
        animator.schedule(Some(&snapshot(&a)), &b, 0.3, 0.0);
        animator.schedule(Some(&snapshot(&b)), &c, 0.3, 0.1);

        // vc-0 now slides from its position in b, not from the root edge.
        let old_pos = b.get("vc-0").unwrap().pos;
        let (pos, opacity) = animator.animated_pos("vc-0", c.get("vc-0").unwrap().pos, 0.1);
        assert_eq!(pos, old_pos);
        assert_eq!(opacity, 1.0);
    }
}
