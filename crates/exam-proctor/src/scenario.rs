//! Scripted replay of an exam page's event stream.
//!
//! A scenario is a JSON list of steps played against an [`ExamSession`] on a
//! manual clock with recording collaborators. The resulting report shows what
//! the monitor would have done, which is how thresholds get tuned for a new
//! deployment target without a browser in the loop.

use crate::controller::{Collaborators, ExamSession, ProctorError};
use exam_core::recording::{
    Notification, RecordingChannel, RecordingHost, RecordingNavigator, RecordingSink,
};
use exam_core::{ManualClock, MonitorConfig, MonitorObserver, ViolationType};
use integrity_metrics::IntegrityMetrics;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use violation_monitor::{ContextMenuDecision, ScriptedEnvironment, UnloadDecision, WindowMetrics};

/// Granularity of the simulated event loop for `advance_ms`.
const LOOP_SLICE_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Loads a fresh page context. Any previous context is unmounted.
    Mount,
    FinishMount,
    Start { session_id: String },
    EnterRoute { session_id: Option<String> },
    BeforeUnload,
    VisibilityChange,
    ContextMenu,
    SafeSubmit,
    Complete,
    Unmount,
    /// Lets time pass with the event loop running.
    AdvanceMs { ms: u64 },
    /// Lets time pass with the page's thread blocked, as under a breakpoint.
    StallMs { ms: u64 },
    SetWindow(WindowMetrics),
    SetConsoleMs { ms: u64 },
    SetStyleMutated { mutated: bool },
    ChannelFailing { failing: bool },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Mount => "mount",
            Step::FinishMount => "finish_mount",
            Step::Start { .. } => "start",
            Step::EnterRoute { .. } => "enter_route",
            Step::BeforeUnload => "before_unload",
            Step::VisibilityChange => "visibility_change",
            Step::ContextMenu => "context_menu",
            Step::SafeSubmit => "safe_submit",
            Step::Complete => "complete",
            Step::Unmount => "unmount",
            Step::AdvanceMs { .. } => "advance_ms",
            Step::StallMs { .. } => "stall_ms",
            Step::SetWindow(_) => "set_window",
            Step::SetConsoleMs { .. } => "set_console_ms",
            Step::SetStyleMutated { .. } => "set_style_mutated",
            Step::ChannelFailing { .. } => "channel_failing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: MonitorConfig,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step {index} (`{op}`) needs a mounted page")]
    NotMounted { index: usize, op: &'static str },
    #[error("step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: ProctorError,
    },
    #[error("metrics unavailable: {0}")]
    Metrics(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub at_ms: u64,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<StepOutcome>,
    pub violations: Vec<ViolationType>,
    pub emitted: Vec<Value>,
    pub submits: usize,
    pub routes: Vec<String>,
    pub notifications: Vec<Notification>,
    pub metrics: String,
}

pub struct ScenarioRunner {
    config: MonitorConfig,
    clock: Rc<ManualClock>,
    environment: Rc<ScriptedEnvironment>,
    sink: Rc<RecordingSink>,
    navigator: Rc<RecordingNavigator>,
    host: Rc<RecordingHost>,
    channel: Rc<RecordingChannel>,
    metrics: Rc<IntegrityMetrics>,
    page: Option<ExamSession>,
    outcomes: Vec<StepOutcome>,
}

impl ScenarioRunner {
    pub fn new(config: MonitorConfig) -> Result<Self, ScenarioError> {
        let metrics = IntegrityMetrics::new()
            .map_err(|e| ScenarioError::Metrics(e.to_string()))?;
        Ok(Self {
            config,
            clock: Rc::new(ManualClock::new()),
            environment: Rc::new(ScriptedEnvironment::desktop()),
            sink: Rc::new(RecordingSink::new()),
            navigator: Rc::new(RecordingNavigator::new()),
            host: Rc::new(RecordingHost::new()),
            channel: Rc::new(RecordingChannel::new()),
            metrics: Rc::new(metrics),
            page: None,
            outcomes: Vec::new(),
        })
    }

    pub fn run(scenario: &Scenario) -> Result<ReplayReport, ScenarioError> {
        let mut runner = Self::new(scenario.config.clone())?;
        for (index, step) in scenario.steps.iter().enumerate() {
            runner.apply(index, step)?;
        }
        runner.finish()
    }

    pub fn apply(&mut self, index: usize, step: &Step) -> Result<(), ScenarioError> {
        debug!(index, op = step.name(), "replaying step");
        let result = match step {
            Step::Mount => {
                if let Some(mut previous) = self.page.take() {
                    previous.unmount();
                }
                let page = ExamSession::mount(self.config.clone(), self.collaborators())
                    .map_err(|source| ScenarioError::Step { index, source })?;
                self.page = Some(page);
                Value::Null
            }
            Step::FinishMount => {
                self.page_mut(index, step)?.finish_mount();
                Value::Null
            }
            Step::Start { session_id } => {
                self.page_mut(index, step)?
                    .start(session_id)
                    .map_err(|source| ScenarioError::Step { index, source })?;
                Value::Null
            }
            Step::EnterRoute { session_id } => {
                let refreshed = self.page_mut(index, step)?.enter_route(session_id.as_deref());
                json!({ "refresh_detected": refreshed })
            }
            Step::BeforeUnload => match self.page_mut(index, step)?.before_unload() {
                UnloadDecision::Proceed => json!({ "unload": "proceed" }),
                UnloadDecision::Block { prompt } => json!({ "unload": "blocked", "prompt": prompt }),
            },
            Step::VisibilityChange => {
                self.page_mut(index, step)?.visibility_changed();
                Value::Null
            }
            Step::ContextMenu => match self.page_mut(index, step)?.context_menu() {
                ContextMenuDecision::ShowDefault => json!({ "context_menu": "default" }),
                ContextMenuDecision::Suppress => json!({ "context_menu": "suppressed" }),
            },
            Step::SafeSubmit => {
                self.page_mut(index, step)?.safe_submit();
                Value::Null
            }
            Step::Complete => {
                self.page_mut(index, step)?.complete();
                Value::Null
            }
            Step::Unmount => {
                if let Some(mut page) = self.page.take() {
                    page.unmount();
                }
                Value::Null
            }
            Step::AdvanceMs { ms } => {
                let mut left = *ms;
                while left > 0 {
                    let slice = left.min(LOOP_SLICE_MS);
                    self.clock.advance_ms(slice);
                    self.run_page_timers();
                    left -= slice;
                }
                Value::Null
            }
            Step::StallMs { ms } => {
                self.clock.advance_ms(*ms);
                self.run_page_timers();
                Value::Null
            }
            Step::SetWindow(metrics) => {
                self.environment.set_window(Some(*metrics));
                Value::Null
            }
            Step::SetConsoleMs { ms } => {
                self.environment
                    .set_console_time(Some(Duration::from_millis(*ms)));
                Value::Null
            }
            Step::SetStyleMutated { mutated } => {
                self.environment.set_style_mutated(*mutated);
                Value::Null
            }
            Step::ChannelFailing { failing } => {
                self.channel.set_failing(*failing);
                Value::Null
            }
        };
        self.outcomes.push(StepOutcome {
            index,
            op: step.name(),
            at_ms: u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            result,
        });
        Ok(())
    }

    pub fn finish(self) -> Result<ReplayReport, ScenarioError> {
        let metrics = self
            .metrics
            .gather_text()
            .map_err(|e| ScenarioError::Metrics(e.to_string()))?;
        Ok(ReplayReport {
            outcomes: self.outcomes,
            violations: self.host.violation_kinds(),
            emitted: self.channel.emitted().into_iter().map(|(_, p)| p).collect(),
            submits: self.host.submits(),
            routes: self.navigator.routes(),
            notifications: self.sink.log(),
            metrics,
        })
    }

    fn collaborators(&self) -> Collaborators {
        let observer: Rc<dyn MonitorObserver> = self.metrics.clone();
        Collaborators {
            clock: self.clock.clone(),
            environment: self.environment.clone(),
            sink: self.sink.clone(),
            navigator: self.navigator.clone(),
            host: self.host.clone(),
            channel: self.channel.clone(),
            observer: Some(observer),
        }
    }

    fn page_mut(&mut self, index: usize, step: &Step) -> Result<&mut ExamSession, ScenarioError> {
        self.page.as_mut().ok_or(ScenarioError::NotMounted {
            index,
            op: step.name(),
        })
    }

    fn run_page_timers(&mut self) {
        if let Some(page) = self.page.as_mut() {
            page.run_due_timers();
        }
    }
}
