use crate::probe::{BrowserEnvironment, WindowMetrics};
use exam_core::{DeviceInfo, ProbeError};
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Browser environment whose readings are set by the caller. Backs scenario
/// replay and headless tests.
#[derive(Debug)]
pub struct ScriptedEnvironment {
    metrics: Cell<Option<WindowMetrics>>,
    style_mutated: Cell<bool>,
    style_probe_fails: Cell<bool>,
    console_time: Cell<Option<Duration>>,
    device: RefCell<DeviceInfo>,
}

impl ScriptedEnvironment {
    pub fn desktop() -> Self {
        Self {
            metrics: Cell::new(Some(WindowMetrics {
                outer_width: 1920,
                outer_height: 1080,
                inner_width: 1920,
                inner_height: 980,
            })),
            style_mutated: Cell::new(false),
            style_probe_fails: Cell::new(false),
            console_time: Cell::new(Some(Duration::from_millis(2))),
            device: RefCell::new(DeviceInfo::new(
                "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
                "Linux x86_64",
                1920,
                1080,
            )),
        }
    }

    /// `None` makes the window-size probe fail.
    pub fn set_window(&self, metrics: Option<WindowMetrics>) {
        self.metrics.set(metrics);
    }

    pub fn set_style_mutated(&self, mutated: bool) {
        self.style_mutated.set(mutated);
    }

    pub fn set_style_probe_fails(&self, fails: bool) {
        self.style_probe_fails.set(fails);
    }

    /// `None` makes the console-timing probe fail.
    pub fn set_console_time(&self, took: Option<Duration>) {
        self.console_time.set(took);
    }

    pub fn set_device(&self, device: DeviceInfo) {
        *self.device.borrow_mut() = device;
    }
}

impl Default for ScriptedEnvironment {
    fn default() -> Self {
        Self::desktop()
    }
}

impl BrowserEnvironment for ScriptedEnvironment {
    fn window_metrics(&self) -> Result<WindowMetrics, ProbeError> {
        self.metrics.get().ok_or(ProbeError::MetricsUnavailable)
    }

    fn probe_element_mutated(&self) -> Result<bool, ProbeError> {
        if self.style_probe_fails.get() {
            return Err(ProbeError::ElementInjection("document body unavailable".into()));
        }
        Ok(self.style_mutated.get())
    }

    fn time_console_probe(&self) -> Result<Duration, ProbeError> {
        self.console_time
            .get()
            .ok_or_else(|| ProbeError::ConsoleUnavailable("console is not writable".into()))
    }

    fn device_info(&self) -> DeviceInfo {
        self.device.borrow().clone()
    }
}
