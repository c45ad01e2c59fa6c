//! Process metadata provider.
//!
//! Best-effort resource-usage sampling from procfs, consumed only by the
//! metric plugin. Every reader degrades to `None` on a missing or unparsable
//! file, so a sample taken on a platform without procfs simply yields empty
//! gauges rather than an error.

use std::fs;

/// One point-in-time sample of the process's resource usage.
#[derive(Debug, Clone, Default)]
pub struct ProcSample {
    /// Cumulative CPU time spent in user/system mode, in clock ticks.
    pub cpu: Option<CpuTimes>,
    /// Resident and virtual memory sizes.
    pub memory: Option<MemoryStats>,
    /// Cumulative bytes read from / written to storage.
    pub io: Option<IoStats>,
    /// Cumulative bytes received/transmitted across non-loopback interfaces.
    pub net: Option<NetStats>,
    /// Number of threads in the process.
    pub threads: Option<u64>,
    /// System load averages over 1, 5 and 15 minutes.
    pub load: Option<LoadAverages>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub user_ticks: u64,
    pub system_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub rss_kb: u64,
    pub vm_kb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoStats {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetStats {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverages {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Identifier of the current process.
pub fn pid() -> u32 {
    std::process::id()
}

/// Takes a best-effort sample of the current process's resource usage.
pub fn sample() -> ProcSample {
    ProcSample {
        cpu: fs::read_to_string("/proc/self/stat")
            .ok()
            .and_then(|s| parse_stat_cpu(&s)),
        memory: fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| parse_status_memory(&s)),
        io: fs::read_to_string("/proc/self/io")
            .ok()
            .and_then(|s| parse_io(&s)),
        net: fs::read_to_string("/proc/net/dev")
            .ok()
            .and_then(|s| parse_net_dev(&s)),
        threads: fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| parse_status_threads(&s)),
        load: fs::read_to_string("/proc/loadavg")
            .ok()
            .and_then(|s| parse_loadavg(&s)),
    }
}

/// Parses utime/stime (fields 14 and 15) out of /proc/self/stat.
///
/// The comm field may contain spaces and parentheses, so fields are counted
/// from the last ')'.
fn parse_stat_cpu(stat: &str) -> Option<CpuTimes> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let mut fields = after_comm.split_whitespace();
    // after_comm starts at field 3 (state); utime/stime are fields 14/15
    let user_ticks = fields.nth(11)?.parse().ok()?;
    let system_ticks = fields.next()?.parse().ok()?;
    Some(CpuTimes {
        user_ticks,
        system_ticks,
    })
}

fn status_kb(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with(key))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

fn parse_status_memory(status: &str) -> Option<MemoryStats> {
    Some(MemoryStats {
        rss_kb: status_kb(status, "VmRSS:")?,
        vm_kb: status_kb(status, "VmSize:")?,
    })
}

fn parse_status_threads(status: &str) -> Option<u64> {
    status_kb(status, "Threads:")
}

fn parse_io(io: &str) -> Option<IoStats> {
    let field = |key: &str| -> Option<u64> {
        io.lines()
            .find(|line| line.starts_with(key))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    Some(IoStats {
        read_bytes: field("read_bytes:")?,
        write_bytes: field("write_bytes:")?,
    })
}

/// Sums rx/tx bytes across all interfaces except loopback.
fn parse_net_dev(net_dev: &str) -> Option<NetStats> {
    let mut rx_bytes = 0u64;
    let mut tx_bytes = 0u64;
    let mut seen = false;

    for line in net_dev.lines().skip(2) {
        let (name, rest) = match line.split_once(':') {
            Some(parts) => parts,
            None => continue,
        };
        if name.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        rx_bytes += fields[0].parse::<u64>().ok()?;
        tx_bytes += fields[8].parse::<u64>().ok()?;
        seen = true;
    }

    seen.then_some(NetStats { rx_bytes, tx_bytes })
}

fn parse_loadavg(loadavg: &str) -> Option<LoadAverages> {
    let mut fields = loadavg.split_whitespace();
    Some(LoadAverages {
        one: fields.next()?.parse().ok()?,
        five: fields.next()?.parse().ok()?,
        fifteen: fields.next()?.parse().ok()?,
    })
}
