//! Best-effort lifecycle control of native device applications.
//!
//! Capture adapters stop the owning application before touching its files
//! and relaunch it afterwards. Everything here is advisory: a process that
//! refuses to die or fails to relaunch is logged, never a hard error, so a
//! stubborn tray utility cannot block a capture batch.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Delay between liveness polls after a kill request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Number of liveness polls before giving up on a stop.
const STOP_POLL_RETRIES: u32 = 6;

/// Stops and restarts the processes that own a device's configuration files.
#[derive(Debug, Clone)]
pub struct ProcessLifecycleGuard {
    names: Vec<String>,
}

impl ProcessLifecycleGuard {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any of the guarded processes is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        if self.names.is_empty() {
            return false;
        }
        let sys = refreshed_process_table();
        self.any_running(&sys)
    }

    /// Executable path of the first guarded process found running.
    ///
    /// Some utilities are launched from user-chosen install locations; the
    /// only reliable way to relaunch them is to ask the live process where
    /// it lives before stopping it.
    #[must_use]
    pub fn executable_path(&self) -> Option<PathBuf> {
        if self.names.is_empty() {
            return None;
        }
        let sys = refreshed_process_table();
        for name in &self.names {
            if let Some(process) = sys.processes_by_name(OsStr::new(name)).next() {
                if let Some(exe) = process.exe() {
                    return Some(exe.to_path_buf());
                }
            }
        }
        None
    }

    /// Kill every guarded process and wait (bounded) for them to exit.
    ///
    /// Returns whether any of them was running when the stop began, so the
    /// caller can decide about relaunching later.
    pub async fn stop(&self) -> bool {
        if self.names.is_empty() {
            return false;
        }

        let sys = refreshed_process_table();
        let was_running = self.any_running(&sys);
        if !was_running {
            return false;
        }

        for name in &self.names {
            for process in sys.processes_by_name(OsStr::new(name)) {
                debug!(name = %name, pid = %process.pid(), "Stopping process");
                process.kill();
            }
        }

        for _ in 0..STOP_POLL_RETRIES {
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
            let sys = refreshed_process_table();
            if !self.any_running(&sys) {
                return true;
            }
        }

        warn!(processes = ?self.names, "Processes still running after stop; continuing anyway");
        true
    }

    /// Relaunch the application at `executable`, detached.
    ///
    /// A missing executable or a failed spawn is logged and ignored.
    pub fn launch(&self, executable: &Path) {
        if !executable.exists() {
            debug!(path = %executable.display(), "Executable not present; skipping relaunch");
            return;
        }
        match tokio::process::Command::new(executable).spawn() {
            Ok(_) => debug!(path = %executable.display(), "Relaunched application"),
            Err(e) => {
                warn!(path = %executable.display(), error = %e, "Failed to relaunch application");
            }
        }
    }

    fn any_running(&self, sys: &System) -> bool {
        self.names
            .iter()
            .any(|name| sys.processes_by_name(OsStr::new(name)).next().is_some())
    }
}

fn refreshed_process_table() -> System {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_guard_reports_not_running() {
        let guard = ProcessLifecycleGuard::new(Vec::<String>::new());
        assert!(!guard.is_running());
        assert_eq!(guard.executable_path(), None);
    }

    #[tokio::test]
    async fn test_stop_on_absent_process_returns_false() {
        let guard = ProcessLifecycleGuard::new(["rigsync-no-such-process-a8f3"]);
        assert!(!guard.stop().await);
    }

    #[test]
    fn test_launch_missing_executable_is_noop() {
        let guard = ProcessLifecycleGuard::new(["anything"]);
        guard.launch(Path::new("/definitely/not/here/app.exe"));
    }
}
