//! Duck-typed execution snapshots, as handed over by whatever fetching layer
//! sits upstream. Every field is optional; unknown fields are ignored.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid execution JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scalar or vector function output.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorInput {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VoteInput {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub vote: Vec<f64>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub flat_ensemble_index: Option<usize>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub from_rng: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompletionChoiceInput {
    #[serde(default)]
    pub delta: Option<MessageInput>,
    #[serde(default)]
    pub message: Option<MessageInput>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompletionInput {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<CompletionChoiceInput>,
}

impl CompletionInput {
    /// Accumulated text of the first choice, streaming delta preferred.
    pub fn text(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .delta
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .or_else(|| choice.message.as_ref().and_then(|m| m.content.as_deref()))
    }
}

/// One task of an execution. Function-shaped when `tasks` is present,
/// vector-completion-shaped otherwise.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub task_index: Option<usize>,
    #[serde(default)]
    pub task_path: Option<Vec<usize>>,
    #[serde(default)]
    pub tasks: Option<Vec<TaskInput>>,
    #[serde(default)]
    pub votes: Option<Vec<VoteInput>>,
    #[serde(default)]
    pub completions: Option<Vec<CompletionInput>>,
    #[serde(default)]
    pub scores: Option<Vec<f64>>,
    #[serde(default)]
    pub output: Option<OutputValue>,
    #[serde(default)]
    pub error: Option<ErrorInput>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

impl TaskInput {
    /// The `tasks` array wins: a task that also carries vote/score fields is
    /// still a function task.
    pub fn is_function_task(&self) -> bool {
        self.tasks.is_some()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExecutionInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub tasks: Option<Vec<TaskInput>>,
    #[serde(default)]
    pub output: Option<OutputValue>,
    #[serde(default)]
    pub error: Option<ErrorInput>,
}

impl ExecutionInput {
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: &Value) -> Result<Self, InputError> {
        Ok(Self::deserialize(value)?)
    }
}
