//! Devtools heuristics as swappable strategies.
//!
//! Each probe inspects the browser through [`BrowserEnvironment`] and returns a
//! verdict. Probes are best-effort: a probe that cannot read the environment
//! returns an error, which the battery logs and skips so the other probes
//! still run.

use exam_core::{DetectionExtras, DeviceInfo, MonitorConfig, MonitorObserver, ProbeError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

pub trait BrowserEnvironment {
    fn window_metrics(&self) -> Result<WindowMetrics, ProbeError>;
    /// Injects the probe element and reports whether its computed style was
    /// altered from what was written.
    fn probe_element_mutated(&self) -> Result<bool, ProbeError>;
    /// Runs the deliberately expensive console call and returns its wall time.
    fn time_console_probe(&self) -> Result<Duration, ProbeError>;
    fn device_info(&self) -> DeviceInfo;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeVerdict {
    Clear,
    Detected(DetectionExtras),
}

pub trait DetectionProbe {
    fn name(&self) -> &'static str;
    fn probe(&self, env: &dyn BrowserEnvironment) -> Result<ProbeVerdict, ProbeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StyleMutationProbe;

impl DetectionProbe for StyleMutationProbe {
    fn name(&self) -> &'static str {
        "style_mutation"
    }

    fn probe(&self, env: &dyn BrowserEnvironment) -> Result<ProbeVerdict, ProbeError> {
        if env.probe_element_mutated()? {
            let mut evidence = DetectionExtras::new();
            evidence.insert("probe".into(), json!(self.name()));
            return Ok(ProbeVerdict::Detected(evidence));
        }
        Ok(ProbeVerdict::Clear)
    }
}

/// Docked devtools shrink the inner viewport while the outer window stays put.
#[derive(Debug, Clone, Copy)]
pub struct WindowSizeProbe {
    pub threshold_px: u32,
}

impl DetectionProbe for WindowSizeProbe {
    fn name(&self) -> &'static str {
        "window_size"
    }

    fn probe(&self, env: &dyn BrowserEnvironment) -> Result<ProbeVerdict, ProbeError> {
        let m = env.window_metrics()?;
        let width_delta = m.outer_width.saturating_sub(m.inner_width);
        let height_delta = m.outer_height.saturating_sub(m.inner_height);
        if width_delta > self.threshold_px || height_delta > self.threshold_px {
            let mut evidence = DetectionExtras::new();
            evidence.insert("probe".into(), json!(self.name()));
            evidence.insert("width_delta".into(), json!(width_delta));
            evidence.insert("height_delta".into(), json!(height_delta));
            return Ok(ProbeVerdict::Detected(evidence));
        }
        Ok(ProbeVerdict::Clear)
    }
}

/// An open console makes formatted logging of large objects measurably slow.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleTimingProbe {
    pub threshold: Duration,
}

impl DetectionProbe for ConsoleTimingProbe {
    fn name(&self) -> &'static str {
        "console_timing"
    }

    fn probe(&self, env: &dyn BrowserEnvironment) -> Result<ProbeVerdict, ProbeError> {
        let took = env.time_console_probe()?;
        if took > self.threshold {
            let mut evidence = DetectionExtras::new();
            evidence.insert("probe".into(), json!(self.name()));
            evidence.insert(
                "console_ms".into(),
                json!(u64::try_from(took.as_millis()).unwrap_or(u64::MAX)),
            );
            return Ok(ProbeVerdict::Detected(evidence));
        }
        Ok(ProbeVerdict::Clear)
    }
}

#[derive(Default)]
pub struct DevtoolsBattery {
    probes: Vec<Box<dyn DetectionProbe>>,
}

impl DevtoolsBattery {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        let mut battery = Self::empty();
        if config.probes.style_mutation {
            battery = battery.with_probe(StyleMutationProbe);
        }
        if config.probes.window_size {
            battery = battery.with_probe(WindowSizeProbe {
                threshold_px: config.window_delta_threshold_px,
            });
        }
        if config.probes.console_timing {
            battery = battery.with_probe(ConsoleTimingProbe {
                threshold: config.console_timing_threshold(),
            });
        }
        battery
    }

    pub fn with_probe(mut self, probe: impl DetectionProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// First positive verdict wins. Failing probes are logged and skipped.
    pub fn run(
        &self,
        env: &dyn BrowserEnvironment,
        observer: &dyn MonitorObserver,
    ) -> Option<DetectionExtras> {
        for probe in &self.probes {
            match probe.probe(env) {
                Ok(ProbeVerdict::Detected(evidence)) => return Some(evidence),
                Ok(ProbeVerdict::Clear) => {}
                Err(err) => {
                    warn!(probe = probe.name(), error = %err, "devtools probe failed");
                    observer.probe_failed(probe.name());
                }
            }
        }
        None
    }
}
