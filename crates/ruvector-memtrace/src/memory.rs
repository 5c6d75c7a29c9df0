use sysinfo::{get_current_pid, Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Memory observed at one instant, taken *before* the traced step runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemorySample {
    pub host_bytes: u64,
    pub accelerator_bytes: u64,
}

impl MemorySample {
    pub fn combined(&self) -> u64 {
        self.host_bytes.saturating_add(self.accelerator_bytes)
    }
}

/// Trait for reading the resident set size of the current process.
///
/// Use [`FixedHost`] for deterministic tests.
pub trait HostMemorySource: Send {
    fn name(&self) -> &'static str;

    fn resident_bytes(&mut self) -> u64;
}

/// Host backend backed by `sysinfo` process statistics.
pub struct SysinfoHost {
    system: System,
    pid: Pid,
}

impl SysinfoHost {
    /// Returns `None` when the current process cannot be found.
    pub fn new() -> Option<Self> {
        let pid = get_current_pid().ok()?;
        let mut host = Self {
            system: System::new(),
            pid,
        };
        host.refresh();
        host.system.process(pid)?;
        Some(host)
    }

    fn refresh(&mut self) {
        let targets = [self.pid];
        if self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&targets),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        ) == 0
        {
            self.system.refresh_processes(ProcessesToUpdate::All, false);
        }
    }
}

impl HostMemorySource for SysinfoHost {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn resident_bytes(&mut self) -> u64 {
        self.refresh();
        self.system.process(self.pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Host backend reading `VmRSS` from `/proc/self/status`.
pub struct ProcStatusHost;

impl ProcStatusHost {
    pub fn new() -> Option<Self> {
        read_vm_rss().map(|_| Self)
    }
}

impl HostMemorySource for ProcStatusHost {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn resident_bytes(&mut self) -> u64 {
        read_vm_rss().unwrap_or(0)
    }
}

#[cfg(target_os = "linux")]
fn read_vm_rss() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

/// `VmRSS` in bytes from the text of a `/proc/<pid>/status` file.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmRSS:")?;
        let kb = rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
        Some(kb * 1024)
    })
}

#[cfg(not(target_os = "linux"))]
fn read_vm_rss() -> Option<u64> {
    None
}

/// A host source that always reports the same value, or a scripted sequence
/// of values followed by the last one.
pub struct FixedHost {
    values: Vec<u64>,
    next: usize,
}

impl FixedHost {
    pub fn constant(bytes: u64) -> Self {
        Self::sequence(vec![bytes])
    }

    pub fn sequence(values: Vec<u64>) -> Self {
        Self { values, next: 0 }
    }
}

impl HostMemorySource for FixedHost {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn resident_bytes(&mut self) -> u64 {
        let idx = self.next.min(self.values.len().saturating_sub(1));
        self.next += 1;
        self.values.get(idx).copied().unwrap_or(0)
    }
}

/// Pick the first host backend that works on this platform.
pub fn detect_host() -> Option<Box<dyn HostMemorySource>> {
    if let Some(host) = SysinfoHost::new() {
        return Some(Box::new(host));
    }
    if let Some(host) = ProcStatusHost::new() {
        return Some(Box::new(host));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_saturates() {
        let s = MemorySample {
            host_bytes: u64::MAX,
            accelerator_bytes: 10,
        };
        assert_eq!(s.combined(), u64::MAX);
    }

    #[test]
    fn fixed_host_replays_sequence() {
        let mut h = FixedHost::sequence(vec![1000, 1500, 1200]);
        assert_eq!(h.resident_bytes(), 1000);
        assert_eq!(h.resident_bytes(), 1500);
        assert_eq!(h.resident_bytes(), 1200);
        assert_eq!(h.resident_bytes(), 1200);
    }

    #[test]
    fn fixed_host_empty_is_zero() {
        let mut h = FixedHost::sequence(Vec::new());
        assert_eq!(h.resident_bytes(), 0);
    }

    #[test]
    fn vm_rss_is_parsed_from_status() {
        let status = "Name:\tbench\nVmPeak:\t  20000 kB\nVmRSS:\t    1536 kB\nThreads:\t4\n";
        assert_eq!(parse_vm_rss(status), Some(1536 * 1024));
        assert_eq!(parse_vm_rss("Name:\tbench\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tlots kB\n"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn proc_status_host_reads_rss() {
        let mut host = ProcStatusHost::new().expect("/proc/self/status is readable on linux");
        assert_eq!(host.name(), "procfs");
        let first = host.resident_bytes();
        assert!(first > 0);
        assert_eq!(first % 1024, 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn detected_host_reports_nonzero_rss() {
        let mut host = detect_host().expect("linux has a host backend");
        assert!(host.resident_bytes() > 0);
    }
}
