//! Canvas renderer for function execution trees: streaming execution
//! snapshots go in, an interactive pan/zoom tree view comes out.

pub mod animation;
pub mod config;
pub mod engine;
pub mod input;
pub mod interaction;
pub mod layout;
pub mod lod;
pub mod render;
pub mod theme;
pub mod tree;
pub mod viewport;

pub use config::{FunctionTreeConfig, Orientation, ThemeMode};
pub use engine::FunctionTreeEngine;
pub use input::{ExecutionInput, InputError};
pub use tree::{ModelNames, NodeKind, NodePayload, NodeState, TreeData, TreeNode, build_tree};
