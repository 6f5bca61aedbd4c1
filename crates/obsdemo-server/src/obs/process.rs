//! Default runtime metrics: process memory, CPU time, start time and tokio
//! runtime gauges, sampled on every scrape.

use std::sync::Mutex;

use sysinfo::{Pid, System};

use obsdemo_core::error::Result;

use super::metrics::Desc;
use super::registry::{Collector, DefaultLabels};

pub struct ProcessCollector {
    pid: Option<Pid>,
    sys: Mutex<System>,
    start_time: Desc,
    resident_memory: Desc,
    virtual_memory: Desc,
    cpu_user: Desc,
    cpu_system: Desc,
    cpu_total: Desc,
    runtime_workers: Desc,
    runtime_alive_tasks: Desc,
}

impl ProcessCollector {
    pub fn new() -> Result<Self> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "current pid unavailable, process memory metrics disabled");
                None
            }
        };

        Ok(Self {
            pid,
            sys: Mutex::new(System::new()),
            start_time: Desc::new(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                &[],
            )?,
            resident_memory: Desc::new(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                &[],
            )?,
            virtual_memory: Desc::new(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                &[],
            )?,
            cpu_user: Desc::new(
                "process_cpu_user_seconds_total",
                "Total user CPU time spent in seconds.",
                &[],
            )?,
            cpu_system: Desc::new(
                "process_cpu_system_seconds_total",
                "Total system CPU time spent in seconds.",
                &[],
            )?,
            cpu_total: Desc::new(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
                &[],
            )?,
            runtime_workers: Desc::new(
                "tokio_runtime_workers",
                "Number of worker threads used by the tokio runtime.",
                &[],
            )?,
            runtime_alive_tasks: Desc::new(
                "tokio_runtime_alive_tasks",
                "Number of alive tasks in the tokio runtime.",
                &[],
            )?,
        })
    }
}

#[cfg(unix)]
fn cpu_times() -> Option<(f64, f64)> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the provided struct.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 means the kernel filled the struct.
    let usage = unsafe { usage.assume_init() };
    let secs = |tv: libc::timeval| tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0;
    Some((secs(usage.ru_utime), secs(usage.ru_stime)))
}

#[cfg(not(unix))]
fn cpu_times() -> Option<(f64, f64)> {
    None
}

impl Collector for ProcessCollector {
    fn names(&self) -> Vec<String> {
        [
            &self.start_time,
            &self.resident_memory,
            &self.virtual_memory,
            &self.cpu_user,
            &self.cpu_system,
            &self.cpu_total,
            &self.runtime_workers,
            &self.runtime_alive_tasks,
        ]
        .iter()
        .map(|d| d.name.clone())
        .collect()
    }

    fn render(&self, defaults: &DefaultLabels, out: &mut String) {
        if let Some(pid) = self.pid {
            let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
            sys.refresh_process(pid);
            if let Some(p) = sys.process(pid) {
                self.start_time.render_scalar("gauge", defaults, p.start_time() as f64, out);
                self.resident_memory.render_scalar("gauge", defaults, p.memory() as f64, out);
                self.virtual_memory.render_scalar("gauge", defaults, p.virtual_memory() as f64, out);
            }
        }

        if let Some((user, system)) = cpu_times() {
            self.cpu_user.render_scalar("counter", defaults, user, out);
            self.cpu_system.render_scalar("counter", defaults, system, out);
            self.cpu_total.render_scalar("counter", defaults, user + system, out);
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let m = handle.metrics();
            self.runtime_workers.render_scalar("gauge", defaults, m.num_workers() as f64, out);
            self.runtime_alive_tasks.render_scalar("gauge", defaults, m.num_alive_tasks() as f64, out);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn renders_runtime_and_process_families() {
        let c = ProcessCollector::new().unwrap();
        let mut out = String::new();
        c.render(&DefaultLabels::default(), &mut out);

        assert!(out.contains("# TYPE tokio_runtime_workers gauge"));
        assert!(out.contains("tokio_runtime_alive_tasks "));
        #[cfg(unix)]
        assert!(out.contains("# TYPE process_cpu_seconds_total counter"));
        #[cfg(target_os = "linux")]
        assert!(out.contains("process_resident_memory_bytes "));
    }

    #[test]
    fn owns_every_family_it_renders() {
        let c = ProcessCollector::new().unwrap();
        let names = c.names();
        assert_eq!(names.len(), 8);
        assert!(names.iter().all(|n| n.starts_with("process_") || n.starts_with("tokio_")));
    }
}
