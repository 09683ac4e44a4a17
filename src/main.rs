use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use eframe::egui::{self, Align, Layout};

use function_tree::engine::FunctionTreeEngine;
use function_tree::input::ExecutionInput;
use function_tree::tree::{ModelNames, NodePayload};
use function_tree::{FunctionTreeConfig, ThemeMode};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to an execution snapshot JSON file.
    execution: Option<PathBuf>,

    /// Force a theme instead of following the system.
    #[arg(long, value_parser = parse_theme)]
    theme: Option<ThemeMode>,

    /// Replay a built-in execution in stages to exercise streaming updates.
    #[arg(long)]
    simulate: bool,
}

fn parse_theme(raw: &str) -> Result<ThemeMode, String> {
    match raw {
        "light" => Ok(ThemeMode::Light),
        "dark" => Ok(ThemeMode::Dark),
        "auto" => Ok(ThemeMode::Auto),
        other => Err(format!("unknown theme '{other}', expected light|dark|auto")),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let execution = match &args.execution {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading execution snapshot {}", path.display()))?;
            Some(ExecutionInput::from_json(&raw).context("parsing execution snapshot")?)
        }
        None => None,
    };

    let mut config = FunctionTreeConfig::default();
    if let Some(theme) = args.theme {
        config.theme = theme;
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };

    eframe::run_native(
        "function-tree-viewer",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(ViewerApp::new(
                config.clone(),
                execution.clone(),
                args.simulate,
            )))
        }),
    )
    .map_err(|error| anyhow::anyhow!("{error}"))
}

struct ViewerApp {
    engine: FunctionTreeEngine,
    model_names: ModelNames,
    simulation: Option<Simulation>,
    fed_initial: bool,
    execution: Option<ExecutionInput>,
}

impl ViewerApp {
    fn new(config: FunctionTreeConfig, execution: Option<ExecutionInput>, simulate: bool) -> Self {
        let model_names = ModelNames::from([
            ("m-4o".to_string(), "openai/gpt-4o".to_string()),
            ("m-sonnet".to_string(), "anthropic/claude-sonnet".to_string()),
            ("m-flash".to_string(), "google/gemini-flash".to_string()),
        ]);

        Self {
            engine: FunctionTreeEngine::new(config),
            model_names,
            simulation: simulate.then(Simulation::new),
            fed_initial: false,
            execution,
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("function tree");
                    ui.separator();
                    if ui.button("Zoom in").clicked() {
                        self.engine.zoom_in();
                    }
                    if ui.button("Zoom out").clicked() {
                        self.engine.zoom_out();
                    }
                    if ui.button("Fit").clicked() {
                        self.engine.fit_to_content();
                    }
                    if ui.button("Deselect").clicked() {
                        self.engine.deselect();
                    }
                    if self.simulation.is_none() && ui.button("Reload").clicked() {
                        self.fed_initial = false;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(tree) = self.engine.tree() {
                            ui.label(format!("nodes: {}", tree.len()));
                        }
                        if self.simulation.is_some() {
                            ui.label("simulating");
                        }
                    });
                });
            });
    }

    fn detail_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                let Some(node) = self.engine.selected_node() else {
                    ui.label("Click a node to inspect it.");
                    return;
                };

                ui.heading(&node.label);
                ui.monospace(&node.id);
                ui.label(format!("state: {:?}", node.state));
                ui.separator();

                match &node.payload {
                    NodePayload::Function(data) => {
                        if let Some(function) = &data.function_id {
                            ui.label(format!("function: {function}"));
                        }
                        if let Some(profile) = &data.profile_id {
                            ui.label(format!("profile: {profile}"));
                        }
                        ui.label(format!("tasks: {}", data.task_count));
                        if let Some(output) = &data.output {
                            ui.label(format!("output: {output:?}"));
                        }
                        if let Some(error) = &data.error {
                            ui.colored_label(egui::Color32::LIGHT_RED, error);
                        }
                    }
                    NodePayload::VectorCompletion(data) => {
                        ui.label(format!("task index: {}", data.task_index));
                        if let Some(scores) = &data.scores {
                            ui.label(format!("scores: {scores:?}"));
                        }
                        ui.separator();
                        for vote in &data.votes {
                            let name = vote.model_name.as_deref().unwrap_or(&vote.model_id);
                            ui.label(format!("{name} (weight {:.2})", vote.weight));
                            if !vote.vote.is_empty() {
                                ui.monospace(format!("{:?}", vote.vote));
                            }
                            if !vote.streaming_text.is_empty() {
                                ui.small(&vote.streaming_text);
                            }
                        }
                        if let Some(error) = &data.error {
                            ui.colored_label(egui::Color32::LIGHT_RED, error);
                        }
                    }
                    NodePayload::Llm(data) => {
                        let name = data.model_name.as_deref().unwrap_or(&data.model_id);
                        ui.label(format!("model: {name}"));
                        ui.label(format!("weight: {:.2}", data.weight));
                        if !data.streaming_text.is_empty() {
                            ui.small(&data.streaming_text);
                        }
                    }
                }
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|input| input.time);

        if let Some(simulation) = &mut self.simulation {
            if let Some(stage) = simulation.due_stage(now) {
                match ExecutionInput::from_json(stage) {
                    Ok(execution) => {
                        self.engine
                            .set_data(Some(&execution), Some(&self.model_names), now)
                    }
                    Err(error) => log::warn!("discarding bad simulation stage: {error}"),
                }
            }
            if !simulation.finished() {
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            }
        } else if !self.fed_initial {
            self.fed_initial = true;
            self.engine
                .set_data(self.execution.as_ref(), Some(&self.model_names), now);
        }

        self.top_bar(ctx);
        self.detail_panel(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.engine.show(ui);
            });
    }
}

/// Staged replay of one execution, from empty through streaming votes to a
/// final scalar output. Stages land faster than the layout debounce window
/// on purpose.
struct Simulation {
    next_stage: usize,
    next_at: f64,
}

impl Simulation {
    const STAGE_INTERVAL: f64 = 0.6;

    fn new() -> Self {
        Self {
            next_stage: 0,
            next_at: 0.0,
        }
    }

    fn finished(&self) -> bool {
        self.next_stage >= SIMULATION_STAGES.len()
    }

    fn due_stage(&mut self, now: f64) -> Option<&'static str> {
        if self.finished() || now < self.next_at {
            return None;
        }
        let stage = SIMULATION_STAGES[self.next_stage];
        self.next_stage += 1;
        self.next_at = now + Self::STAGE_INTERVAL;
        Some(stage)
    }
}

const SIMULATION_STAGES: &[&str] = &[
    r#"{ "function": "acme/reviews/quality" }"#,
    r#"{
        "function": "acme/reviews/quality",
        "tasks": [
            { "index": 0 },
            { "index": 1 }
        ]
    }"#,
    r#"{
        "function": "acme/reviews/quality",
        "tasks": [
            {
                "index": 0,
                "completions": [
                    { "model": "m-4o", "choices": [{ "delta": { "content": "The review is mostly" } }] },
                    { "model": "m-sonnet", "choices": [{ "delta": { "content": "Leaning positive" } }] }
                ]
            },
            { "index": 1, "tasks": [ { "index": 0 }, { "index": 1 } ] }
        ]
    }"#,
    r#"{
        "function": "acme/reviews/quality",
        "tasks": [
            {
                "index": 0,
                "votes": [
                    { "model": "m-4o", "vote": [0.7, 0.3], "weight": 1.0 },
                    { "model": "m-sonnet", "vote": [0.8, 0.2], "weight": 0.8 }
                ],
                "completions": [
                    { "model": "m-4o", "choices": [{ "delta": { "content": "The review is mostly favorable." } }] },
                    { "model": "m-sonnet", "choices": [{ "delta": { "content": "Leaning positive overall." } }] }
                ],
                "scores": [0.74, 0.26]
            },
            {
                "index": 1,
                "tasks": [
                    {
                        "index": 0,
                        "votes": [{ "model": "m-flash", "vote": [0.4, 0.6], "weight": 1.0, "from_cache": true }],
                        "scores": [0.4, 0.6]
                    },
                    { "index": 1 }
                ]
            }
        ]
    }"#,
    r#"{
        "function": "acme/reviews/quality",
        "output": 0.71,
        "tasks": [
            {
                "index": 0,
                "votes": [
                    { "model": "m-4o", "vote": [0.7, 0.3], "weight": 1.0 },
                    { "model": "m-sonnet", "vote": [0.8, 0.2], "weight": 0.8 }
                ],
                "scores": [0.74, 0.26]
            },
            {
                "index": 1,
                "output": 0.55,
                "tasks": [
                    {
                        "index": 0,
                        "votes": [{ "model": "m-flash", "vote": [0.4, 0.6], "weight": 1.0, "from_cache": true }],
                        "scores": [0.4, 0.6]
                    },
                    {
                        "index": 1,
                        "votes": [{ "model": "m-flash", "vote": [0.7, 0.3], "weight": 1.0, "from_rng": true }],
                        "scores": [0.7, 0.3]
                    }
                ]
            }
        ]
    }"#,
];
