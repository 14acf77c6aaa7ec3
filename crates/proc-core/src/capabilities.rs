//! Runtime detection of the facilities process spawning relies on
//!
//! Probes the running system so front ends can report why spawning might
//! fail before trying.

use std::path::Path;

use crate::util::SHELL;

/// Detected system capabilities
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// The shell used by the shell entry point is executable
    pub has_shell: bool,
    /// `/dev/null` exists for discarded streams
    pub has_dev_null: bool,
    /// Upper bound for pipe buffers (Linux only)
    pub pipe_max_size: Option<u64>,
    /// Soft limit on open file descriptors
    pub max_open_files: Option<u64>,
}

impl SystemCapabilities {
    /// Detect all capabilities on the current system
    pub fn detect() -> Self {
        Self {
            has_shell: detect_shell(),
            has_dev_null: Path::new("/dev/null").exists(),
            pipe_max_size: detect_pipe_max_size(),
            max_open_files: detect_max_open_files(),
        }
    }

    /// Whether both entry points and discarded streams can work
    pub fn can_spawn(&self) -> bool {
        self.has_shell && self.has_dev_null
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let check = |available: bool| if available { "[ok]" } else { "[--]" };
        let mut lines = vec![
            format!("{} Shell ({})", check(self.has_shell), SHELL),
            format!("{} /dev/null", check(self.has_dev_null)),
        ];

        match self.pipe_max_size {
            Some(size) => lines.push(format!("[ok] Pipe max size: {} bytes", size)),
            None => lines.push("[--] Pipe max size unknown".to_string()),
        }
        match self.max_open_files {
            Some(limit) => lines.push(format!("[ok] Open file limit: {}", limit)),
            None => lines.push("[--] Open file limit unknown".to_string()),
        }

        lines.join("\n")
    }
}

fn detect_shell() -> bool {
    nix::unistd::access(SHELL, nix::unistd::AccessFlags::X_OK).is_ok()
}

fn detect_pipe_max_size() -> Option<u64> {
    std::fs::read_to_string("/proc/sys/fs/pipe-max-size")
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn detect_max_open_files() -> Option<u64> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the provided struct
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 || limit.rlim_cur == libc::RLIM_INFINITY {
        return None;
    }
    Some(limit.rlim_cur as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_finds_shell_and_dev_null() {
        let caps = SystemCapabilities::detect();
        assert!(caps.has_shell);
        assert!(caps.has_dev_null);
        assert!(caps.can_spawn());
    }

    #[test]
    fn summary_lists_every_probe() {
        let caps = SystemCapabilities {
            has_shell: true,
            has_dev_null: false,
            pipe_max_size: Some(1048576),
            max_open_files: None,
        };
        let summary = caps.summary();
        assert!(summary.contains("[ok] Shell"));
        assert!(summary.contains("[--] /dev/null"));
        assert!(summary.contains("1048576"));
        assert!(summary.contains("Open file limit unknown"));
        assert!(!caps.can_spawn());
    }
}
