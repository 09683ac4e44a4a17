//! Tree data model and the builder that turns an execution snapshot into it.

use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2, vec2};

use crate::input::{ExecutionInput, OutputValue, TaskInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Function,
    VectorCompletion,
    Llm,
}

impl NodeKind {
    /// Fixed box size per kind, in world units.
    pub fn size(self) -> Vec2 {
        match self {
            NodeKind::Function => vec2(200.0, 80.0),
            NodeKind::VectorCompletion => vec2(180.0, 70.0),
            NodeKind::Llm => vec2(150.0, 60.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Streaming,
    Complete,
    Error,
}

/// One pure derivation of visual state from payload shape, shared by the
/// root and every nested task so the two can never disagree.
pub fn derive_state(has_error: bool, is_complete: bool, is_active: bool) -> NodeState {
    if has_error {
        NodeState::Error
    } else if is_complete {
        NodeState::Complete
    } else if is_active {
        NodeState::Streaming
    } else {
        NodeState::Pending
    }
}

#[derive(Clone, Debug)]
pub struct FunctionData {
    pub function_id: Option<String>,
    pub profile_id: Option<String>,
    pub output: Option<OutputValue>,
    pub task_count: usize,
    pub error: Option<String>,
}

/// One model's vote within a vector-completion task, with its streaming
/// completion text matched in by model id.
#[derive(Clone, Debug)]
pub struct VoteSummary {
    pub model_id: String,
    pub model_name: Option<String>,
    pub vote: Vec<f64>,
    pub weight: f64,
    pub streaming_text: String,
    pub from_cache: bool,
    pub from_rng: bool,
}

#[derive(Clone, Debug)]
pub struct VectorCompletionData {
    pub task_index: usize,
    pub task_path: Vec<usize>,
    pub scores: Option<Vec<f64>>,
    pub votes: Vec<VoteSummary>,
    pub error: Option<String>,
}

impl VectorCompletionData {
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

#[derive(Clone, Debug)]
pub struct LlmData {
    pub model_id: String,
    pub model_name: Option<String>,
    pub vote: Option<Vec<f64>>,
    pub weight: f64,
    pub streaming_text: String,
    pub from_cache: bool,
    pub from_rng: bool,
    pub flat_ensemble_index: usize,
}

#[derive(Clone, Debug)]
pub enum NodePayload {
    Function(FunctionData),
    VectorCompletion(VectorCompletionData),
    Llm(LlmData),
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Function(_) => NodeKind::Function,
            NodePayload::VectorCompletion(_) => NodeKind::VectorCompletion,
            NodePayload::Llm(_) => NodeKind::Llm,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TreeNode {
    /// Stable across rebuilds of the same logical task.
    pub id: String,
    pub label: String,
    /// Arena index of the parent, `None` only for the root.
    pub parent: Option<usize>,
    /// Arena indices of children, in source task order.
    pub children: Vec<usize>,
    /// World position of the top-left corner. Layout-owned; `(0,0)` until a
    /// layout pass runs.
    pub pos: Pos2,
    pub size: Vec2,
    pub state: NodeState,
    pub payload: NodePayload,
}

impl TreeNode {
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn center(&self) -> Pos2 {
        self.pos + self.size / 2.0
    }

    pub fn contains(&self, point: Pos2) -> bool {
        point.x >= self.pos.x
            && point.x <= self.pos.x + self.size.x
            && point.y >= self.pos.y
            && point.y <= self.pos.y + self.size.y
    }
}

/// Arena of nodes for one snapshot. Indices are only meaningful within
/// their own snapshot; identity across snapshots is the string id. Every
/// data update produces a fresh arena, never an in-place edit of an old one.
#[derive(Clone, Debug, Default)]
pub struct TreeData {
    nodes: Vec<TreeNode>,
    index_by_id: HashMap<String, usize>,
    root: usize,
}

impl TreeData {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [TreeNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_index(&self) -> usize {
        self.root
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    fn push(&mut self, node: TreeNode) -> usize {
        let index = self.nodes.len();
        self.index_by_id.insert(node.id.clone(), index);
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(index);
        }
        self.nodes.push(node);
        index
    }
}

/// Resolved model names, keyed by content-addressed model id.
pub type ModelNames = HashMap<String, String>;

fn node_id(prefix: &str, path: &[usize]) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else {
        let mut id = prefix.to_string();
        for segment in path {
            id.push('-');
            id.push_str(&segment.to_string());
        }
        id
    }
}

fn last_path_segment(id: &str) -> Option<&str> {
    id.rsplit('/').next().filter(|segment| !segment.is_empty())
}

/// Build the node arena from an execution snapshot. Returns `None` iff the
/// input is `None`; a present-but-empty execution still yields a root.
pub fn build_tree(
    execution: Option<&ExecutionInput>,
    model_names: Option<&ModelNames>,
) -> Option<TreeData> {
    let execution = execution?;

    let mut tree = TreeData::default();

    let label = execution
        .function
        .as_deref()
        .and_then(last_path_segment)
        .unwrap_or("Function")
        .to_string();
    let task_count = execution.tasks.as_ref().map_or(0, Vec::len);

    tree.root = tree.push(TreeNode {
        id: "root".to_string(),
        label,
        parent: None,
        children: Vec::new(),
        pos: Pos2::ZERO,
        size: NodeKind::Function.size(),
        state: derive_state(
            execution.error.is_some(),
            execution.output.is_some(),
            task_count > 0,
        ),
        payload: NodePayload::Function(FunctionData {
            function_id: execution.function.clone(),
            profile_id: execution.profile.clone(),
            output: execution.output.clone(),
            task_count,
            error: error_message(&execution.error),
        }),
    });

    if let Some(tasks) = &execution.tasks {
        let root = tree.root;
        for (index, task) in tasks.iter().enumerate() {
            add_task(&mut tree, task, root, index, model_names);
        }
    }

    log::debug!("built tree with {} nodes", tree.len());
    Some(tree)
}

fn error_message(error: &Option<crate::input::ErrorInput>) -> Option<String> {
    error
        .as_ref()
        .map(|e| e.message.clone().unwrap_or_default())
}

fn add_task(
    tree: &mut TreeData,
    task: &TaskInput,
    parent: usize,
    fallback_index: usize,
    model_names: Option<&ModelNames>,
) {
    if task.is_function_task() {
        add_function_task(tree, task, parent, fallback_index, model_names);
    } else {
        add_vector_completion_task(tree, task, parent, fallback_index, model_names);
    }
}

fn add_function_task(
    tree: &mut TreeData,
    task: &TaskInput,
    parent: usize,
    fallback_index: usize,
    model_names: Option<&ModelNames>,
) {
    let index = task.index.unwrap_or(fallback_index);
    let path = task.task_path.clone().unwrap_or_else(|| vec![index]);
    let sub_tasks = task.tasks.as_deref().unwrap_or_default();

    let label = task
        .function
        .as_deref()
        .and_then(last_path_segment)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Task {index}"));

    let node = tree.push(TreeNode {
        id: node_id("func", &path),
        label,
        parent: Some(parent),
        children: Vec::new(),
        pos: Pos2::ZERO,
        size: NodeKind::Function.size(),
        state: derive_state(
            task.error.is_some(),
            task.output.is_some(),
            !sub_tasks.is_empty(),
        ),
        payload: NodePayload::Function(FunctionData {
            function_id: task.function.clone(),
            profile_id: task.profile.clone(),
            output: task.output.clone(),
            task_count: sub_tasks.len(),
            error: error_message(&task.error),
        }),
    });

    for (child_index, sub_task) in sub_tasks.iter().enumerate() {
        add_task(tree, sub_task, node, child_index, model_names);
    }
}

fn add_vector_completion_task(
    tree: &mut TreeData,
    task: &TaskInput,
    parent: usize,
    fallback_index: usize,
    model_names: Option<&ModelNames>,
) {
    let index = task.index.unwrap_or(fallback_index);
    let path = task.task_path.clone().unwrap_or_else(|| vec![index]);

    let votes = task
        .votes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|vote| {
            let streaming_text = task
                .completions
                .as_deref()
                .unwrap_or_default()
                .iter()
                .find(|completion| completion.model == vote.model)
                .and_then(|completion| completion.text())
                .unwrap_or_default()
                .to_string();

            VoteSummary {
                model_id: vote.model.clone(),
                model_name: model_names.and_then(|names| names.get(&vote.model).cloned()),
                vote: vote.vote.clone(),
                weight: vote.weight,
                streaming_text,
                from_cache: vote.from_cache,
                from_rng: vote.from_rng,
            }
        })
        .collect();

    let has_scores = task.scores.as_ref().is_some_and(|scores| !scores.is_empty());
    let has_completions = task
        .completions
        .as_ref()
        .is_some_and(|completions| !completions.is_empty());

    tree.push(TreeNode {
        id: node_id("vc", &path),
        label: format!("Task {index}"),
        parent: Some(parent),
        children: Vec::new(),
        pos: Pos2::ZERO,
        size: NodeKind::VectorCompletion.size(),
        state: derive_state(task.error.is_some(), has_scores, has_completions),
        payload: NodePayload::VectorCompletion(VectorCompletionData {
            task_index: task.task_index.unwrap_or(index),
            task_path: path,
            scores: task.scores.clone(),
            votes,
            error: error_message(&task.error),
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ExecutionInput {
        ExecutionInput::from_json(raw).unwrap()
    }

    #[test]
    fn null_input_builds_nothing() {
        assert!(build_tree(None, None).is_none());
    }

    #[test]
    fn empty_execution_yields_pending_root() {
        let execution = parse(r#"{ "tasks": [] }"#);
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.len(), 1);
        let root = tree.root();
        assert_eq!(root.id, "root");
        assert_eq!(root.state, NodeState::Pending);
        assert_eq!(root.label, "Function");
    }

    #[test]
    fn output_completes_the_root() {
        let execution = parse(r#"{ "tasks": [], "output": 0.9 }"#);
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.root().state, NodeState::Complete);
    }

    #[test]
    fn error_wins_over_output() {
        let execution = parse(r#"{ "output": 0.9, "error": { "message": "boom" } }"#);
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.root().state, NodeState::Error);
        let NodePayload::Function(data) = &tree.root().payload else {
            panic!("root must be a function node");
        };
        assert_eq!(data.error.as_deref(), Some("boom"));
    }

    #[test]
    fn root_label_is_last_function_path_segment() {
        let execution = parse(r#"{ "function": "acme/scoring/quality" }"#);
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.root().label, "quality");
    }

    #[test]
    fn vector_completion_task_does_not_materialize_vote_leaves() {
        let execution = parse(
            r#"{
                "tasks": [{
                    "votes": [
                        { "model": "a", "vote": [1.0, 0.0], "weight": 1.0 },
                        { "model": "b", "vote": [0.0, 1.0], "weight": 1.0 }
                    ],
                    "scores": [0.75, 0.25]
                }]
            }"#,
        );
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.len(), 2);

        let task = tree.get("vc-0").unwrap();
        assert_eq!(task.state, NodeState::Complete);
        let NodePayload::VectorCompletion(data) = &task.payload else {
            panic!("task must be a vector-completion node");
        };
        assert_eq!(data.vote_count(), 2);
        assert_eq!(data.votes.len(), 2);
        assert_eq!(data.scores.as_deref(), Some(&[0.75, 0.25][..]));
    }

    #[test]
    fn tasks_array_takes_precedence_over_scores() {
        let execution = parse(r#"{ "tasks": [{ "tasks": [], "scores": [0.5] }] }"#);
        let tree = build_tree(Some(&execution), None).unwrap();
        let task = tree.get("func-0").unwrap();
        assert_eq!(task.kind(), NodeKind::Function);
        assert!(tree.get("vc-0").is_none());
    }

    #[test]
    fn nested_function_task_linkage() {
        let execution = parse(
            r#"{
                "tasks": [
                    { "tasks": [ { "scores": [] }, { "scores": [] } ] },
                    { "scores": [] }
                ]
            }"#,
        );
        let tree = build_tree(Some(&execution), None).unwrap();
        assert_eq!(tree.len(), 5);

        let root = tree.root();
        assert_eq!(root.children.len(), 2);

        let nested = tree.get("func-0").unwrap();
        assert_eq!(nested.children.len(), 2);
        assert_eq!(nested.parent, Some(tree.root_index()));

        let sibling = tree.get("vc-1").unwrap();
        assert_eq!(sibling.children.len(), 0);
        assert_eq!(sibling.parent, Some(tree.root_index()));

        for &child in &nested.children {
            assert_eq!(tree.nodes()[child].parent, Some(tree.index_of("func-0").unwrap()));
        }
    }

    #[test]
    fn ids_are_stable_across_rebuilds() {
        let raw = r#"{ "tasks": [ { "task_path": [0, 1], "scores": [] }, { "tasks": [] } ] }"#;
        let first = build_tree(Some(&parse(raw)), None).unwrap();
        let second = build_tree(Some(&parse(raw)), None).unwrap();

        assert!(first.get("vc-0-1").is_some());
        assert!(first.get("func-1").is_some());
        for node in first.nodes() {
            assert!(second.get(&node.id).is_some());
        }
    }

    #[test]
    fn streaming_text_is_matched_by_model() {
        let execution = parse(
            r#"{
                "tasks": [{
                    "votes": [{ "model": "m1", "vote": [], "weight": 1.0 }],
                    "completions": [
                        { "model": "m0", "choices": [{ "delta": { "content": "other" } }] },
                        { "model": "m1", "choices": [{ "delta": { "content": "partial answer" } }] }
                    ]
                }]
            }"#,
        );
        let names = ModelNames::from([("m1".to_string(), "openai/gpt-4o".to_string())]);
        let tree = build_tree(Some(&execution), Some(&names)).unwrap();

        let task = tree.get("vc-0").unwrap();
        assert_eq!(task.state, NodeState::Streaming);
        let NodePayload::VectorCompletion(data) = &task.payload else {
            panic!("task must be a vector-completion node");
        };
        assert_eq!(data.votes[0].streaming_text, "partial answer");
        assert_eq!(data.votes[0].model_name.as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn state_derivation_matrix() {
        assert_eq!(derive_state(true, true, true), NodeState::Error);
        assert_eq!(derive_state(false, true, true), NodeState::Complete);
        assert_eq!(derive_state(false, false, true), NodeState::Streaming);
        assert_eq!(derive_state(false, false, false), NodeState::Pending);
    }
}
