//! Attach/detach lifecycle and window tracking for the target process.
//!
//! The monitor owns the process handle. Attach polling and per-tick
//! liveness checks are driven by scheduler routines; this type holds the
//! state and the transition logic so both stay testable without a
//! scheduler.

use tracing::{debug, info};

use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::memory::{ProcessHandle, ProcessInfo, ProcessProvider};

/// Window position and size in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub const EMPTY: WindowRect = WindowRect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// What changed during one monitor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorDelta {
    pub closed: bool,
    pub foreground_changed: bool,
    pub moved: bool,
}

impl MonitorDelta {
    const CLOSED: MonitorDelta = MonitorDelta {
        closed: true,
        foreground_changed: false,
        moved: false,
    };
}

/// Owns the process handle and tracks liveness, focus and geometry.
#[derive(Default)]
pub struct ProcessMonitor {
    handle: Option<ProcessHandle>,
    foreground: bool,
    window_area: WindowRect,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<&ProcessHandle> {
        self.handle.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Pid of the attached process, or zero when detached.
    pub fn pid(&self) -> u32 {
        self.handle.as_ref().map(|handle| handle.pid).unwrap_or(0)
    }

    pub fn foreground(&self) -> bool {
        self.foreground
    }

    pub fn window_area(&self) -> WindowRect {
        self.window_area
    }

    /// One attach attempt against the current process list.
    ///
    /// Zero matches keeps polling. One match attaches. Several matches are
    /// only resolvable through the configured index; an out-of-range index
    /// is a configuration error that retrying cannot fix.
    pub fn try_attach<P: ProcessProvider + ?Sized>(
        &mut self,
        provider: &P,
        config: &TargetConfig,
    ) -> Result<bool> {
        let mut candidates: Vec<ProcessInfo> = provider
            .processes()
            .into_iter()
            .filter(|process| config.matches(&process.name, &process.window_title))
            .collect();

        match candidates.len() {
            0 => Ok(false),
            1 => Ok(self.open(provider, candidates.remove(0))),
            count => {
                let index = config.process_index;
                if index >= count {
                    return Err(Error::InvalidConfig(format!(
                        "process_index {} out of range for {} matching processes",
                        index, count
                    )));
                }
                Ok(self.open(provider, candidates.remove(index)))
            }
        }
    }

    fn open<P: ProcessProvider + ?Sized>(&mut self, provider: &P, info: ProcessInfo) -> bool {
        match provider.open(&info) {
            Ok(handle) => {
                info!(
                    "Attached to {} (pid {}, base {:#x}, module {:#x} bytes)",
                    info.name, handle.pid, handle.base_address, handle.module_size
                );
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                debug!("Rejecting candidate pid {}: {}", info.pid, e);
                false
            }
        }
    }

    /// One liveness/geometry pass while attached.
    ///
    /// Exit, a dead window id, or any OS failure during the geometry
    /// queries all route through the same close path. Foreground and
    /// geometry changes are reported once per transition, not every call.
    pub fn check<P: ProcessProvider + ?Sized>(&mut self, provider: &P) -> MonitorDelta {
        let Some(handle) = &self.handle else {
            return MonitorDelta::default();
        };

        // The exit flag can lag; a gone window is treated as gone too.
        if provider.has_exited(handle) || handle.window <= 0 {
            self.close();
            return MonitorDelta::CLOSED;
        }
        let window = handle.window;

        let (width, height, x, y) =
            match (provider.client_rect(window), provider.client_origin(window)) {
                (Ok((width, height)), Ok((x, y))) => (width, height, x, y),
                _ => {
                    self.close();
                    return MonitorDelta::CLOSED;
                }
            };

        let mut delta = MonitorDelta::default();

        let foreground = provider.foreground_window() == window;
        if foreground != self.foreground {
            self.foreground = foreground;
            delta.foreground_changed = true;
        }

        let area = WindowRect {
            x,
            y,
            width,
            height,
        };
        if area != self.window_area && !area.is_empty() {
            self.window_area = area;
            delta.moved = true;
        }

        delta
    }

    /// Drop the handle and zero all tracked state.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!("Detached from pid {}", handle.pid);
        }
        self.foreground = false;
        self.window_area = WindowRect::EMPTY;
    }
}
