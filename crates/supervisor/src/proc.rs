//! Process identity and signalling through the system tools.

use std::{
    fmt, fs, io,
    process::{self, Command, Stdio},
};

use tracing::trace;

/// Signals the controller sends.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Term => "TERM",
            Signal::Kill => "KILL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel start time of `pid` in clock ticks since boot.
///
/// Returns `None` when the process does not exist or is a zombie.
#[cfg(target_os = "linux")]
pub fn start_time(pid: u32) -> Option<u64> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    parse_stat(&stat)
}

#[cfg(not(target_os = "linux"))]
pub fn start_time(_pid: u32) -> Option<u64> {
    None
}

/// Extracts the start time from a `/proc/<pid>/stat` line.
///
/// The command name in field 2 may contain spaces and parens, so fields are
/// counted from the last `)`.
fn parse_stat(stat: &str) -> Option<u64> {
    let (_, rest) = stat.rsplit_once(')')?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let state = fields.first()?;
    if matches!(*state, "Z" | "X" | "x") {
        return None;
    }
    fields.get(19)?.parse().ok()
}

/// Whether `pid` is running and, when a fingerprint is given, is still the
/// same process that was recorded.
pub fn is_alive(pid: u32, expected_start: Option<u64>) -> bool {
    if pid == 0 {
        return false;
    }
    if cfg!(target_os = "linux") {
        match start_time(pid) {
            Some(actual) => expected_start.map_or(true, |e| e == actual),
            None => false,
        }
    } else {
        kill_cmd(&["-0", &pid.to_string()]).unwrap_or(false)
    }
}

/// Sends `signal` to a single process. Returns whether delivery succeeded.
pub fn send_signal(pid: u32, signal: Signal) -> io::Result<bool> {
    kill_cmd(&["-s", signal.as_str(), &pid.to_string()])
}

/// Sends `signal` to the process group led by `pid`, falling back to the
/// process alone when no such group exists.
pub fn signal_group(pid: u32, signal: Signal) -> io::Result<bool> {
    if kill_cmd(&["-s", signal.as_str(), "--", &format!("-{pid}")])? {
        return Ok(true);
    }
    send_signal(pid, signal)
}

fn kill_cmd(args: &[&str]) -> io::Result<bool> {
    trace!(?args, "running kill");
    let status = Command::new("kill")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

/// Pids of processes whose command line contains `marker`, excluding this
/// process.
pub fn find_by_cmdline(marker: &str) -> Vec<u32> {
    let own = process::id();
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };

    let mut pids: Vec<u32> = entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| *pid != own)
        .filter(|pid| {
            fs::read(format!("/proc/{pid}/cmdline"))
                .map(|raw| cmdline_contains(&raw, marker))
                .unwrap_or(false)
        })
        .filter(|pid| start_time(*pid).is_some())
        .collect();
    pids.sort_unstable();
    pids
}

fn cmdline_contains(raw: &[u8], marker: &str) -> bool {
    let joined: String = String::from_utf8_lossy(raw).replace('\0', " ");
    joined.contains(marker)
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn test_parse_stat_handles_odd_names() {
        let line = "4242 (my (odd) node) S 1 4242 4242 0 -1 4194560 100 0 0 0 \
                    1 2 0 0 20 0 1 0 987654 1000000 100 18446744073709551615";
        assert_eq!(parse_stat(line), Some(987654));

        let zombie = "4242 (node) Z 1 4242 4242 0 -1 4194560 100 0 0 0 \
                      1 2 0 0 20 0 1 0 987654 0 0 0";
        assert_eq!(parse_stat(zombie), None);

        assert_eq!(parse_stat("garbage"), None);
    }

    #[test]
    fn test_cmdline_contains() {
        let raw = b"ganache\0--database.dbPath\0/tmp/x/chaindata\0";
        assert!(cmdline_contains(raw, "/tmp/x/chaindata"));
        assert!(!cmdline_contains(raw, "/tmp/y"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_own_process_fingerprint() {
        let pid = process::id();
        let st = start_time(pid).expect("own process has a start time");
        assert!(is_alive(pid, Some(st)));
        assert!(is_alive(pid, None));
        // Same pid, different start time: a reused pid.
        assert!(!is_alive(pid, Some(st + 1)));
    }

    #[test]
    fn test_dead_process_is_not_alive() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!is_alive(pid, None));
        assert!(!is_alive(0, None));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_find_and_kill_by_marker() {
        let marker = format!("provctl-marker-{}", process::id());
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30; true", &marker])
            .spawn()
            .unwrap();

        let mut found = Vec::new();
        for _ in 0..50 {
            found = find_by_cmdline(&marker);
            if !found.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(found, vec![child.id()]);

        assert!(send_signal(child.id(), Signal::Kill).unwrap());
        child.wait().unwrap();
        assert!(find_by_cmdline(&marker).is_empty());
    }
}
