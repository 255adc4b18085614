use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const AUTO_SUBMIT_DELAY: Duration = Duration::from_secs(2);
/// How long the overlay stays up after the forced submit.
pub const OVERLAY_LINGER: Duration = Duration::from_secs(3);
pub const REFRESH_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSwitches {
    pub style_mutation: bool,
    pub window_size: bool,
    pub console_timing: bool,
    pub debugger_pause: bool,
}

impl Default for ProbeSwitches {
    fn default() -> Self {
        Self {
            style_mutation: true,
            window_size: true,
            console_timing: true,
            debugger_pause: true,
        }
    }
}

/// Detection thresholds. These are heuristics tied to a browser's console and
/// layout behaviour, so each deployment target can tune them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub visibility_flap_window_ms: u64,
    pub devtools_probe_interval_ms: u64,
    pub window_delta_threshold_px: u32,
    pub console_timing_threshold_ms: u64,
    pub debugger_tick_interval_ms: u64,
    pub debugger_tolerance_ms: u64,
    pub warning_toast_ms: u64,
    pub probes: ProbeSwitches,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            visibility_flap_window_ms: 100,
            devtools_probe_interval_ms: 3000,
            window_delta_threshold_px: 160,
            console_timing_threshold_ms: 100,
            debugger_tick_interval_ms: 500,
            debugger_tolerance_ms: 200,
            warning_toast_ms: 7000,
            probes: ProbeSwitches::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("visibility_flap_window_ms", self.visibility_flap_window_ms, 1, 10_000)?;
        check_range("devtools_probe_interval_ms", self.devtools_probe_interval_ms, 100, 60_000)?;
        check_range(
            "window_delta_threshold_px",
            u64::from(self.window_delta_threshold_px),
            1,
            10_000,
        )?;
        check_range("console_timing_threshold_ms", self.console_timing_threshold_ms, 1, 10_000)?;
        check_range("debugger_tick_interval_ms", self.debugger_tick_interval_ms, 50, 60_000)?;
        check_range("debugger_tolerance_ms", self.debugger_tolerance_ms, 1, 60_000)?;
        check_range("warning_toast_ms", self.warning_toast_ms, 5_000, 10_000)?;
        Ok(())
    }

    pub fn visibility_flap_window(&self) -> Duration {
        Duration::from_millis(self.visibility_flap_window_ms)
    }

    pub fn devtools_probe_interval(&self) -> Duration {
        Duration::from_millis(self.devtools_probe_interval_ms)
    }

    pub fn console_timing_threshold(&self) -> Duration {
        Duration::from_millis(self.console_timing_threshold_ms)
    }

    pub fn debugger_tick_interval(&self) -> Duration {
        Duration::from_millis(self.debugger_tick_interval_ms)
    }

    pub fn debugger_tolerance(&self) -> Duration {
        Duration::from_millis(self.debugger_tolerance_ms)
    }

    pub fn warning_toast(&self) -> Duration {
        Duration::from_millis(self.warning_toast_ms)
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
