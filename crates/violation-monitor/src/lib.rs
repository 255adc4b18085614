pub mod messages;
pub mod monitor;
pub mod probe;
pub mod scripted;
#[cfg(test)]
mod tests;

pub use monitor::{ArmError, ContextMenuDecision, UnloadDecision, ViolationMonitor};
pub use probe::{
    BrowserEnvironment, ConsoleTimingProbe, DetectionProbe, DevtoolsBattery, ProbeVerdict,
    StyleMutationProbe, WindowMetrics, WindowSizeProbe,
};
pub use scripted::ScriptedEnvironment;
