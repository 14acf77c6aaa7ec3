//! Program lookup and command helpers

use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};

/// Search path used when the environment has no `PATH`
pub const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Shell used by the shell entry point
pub const SHELL: &str = "/bin/sh";

/// Resolve a program name to an executable path using PATH semantics.
///
/// Names containing a `/` are returned unchanged and checked by `execve`.
pub fn resolve_program_path(program: &str, path_value: Option<&str>) -> io::Result<PathBuf> {
    if program.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "program name is empty",
        ));
    }

    if program.contains('/') {
        return Ok(PathBuf::from(program));
    }

    for entry in path_value.unwrap_or(DEFAULT_PATH).split(':') {
        let dir = if entry.is_empty() { "." } else { entry };
        let candidate = Path::new(dir).join(program);

        if candidate.is_file() && access(&candidate, AccessFlags::X_OK).is_ok() {
            return Ok(candidate);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("command not found: {}", program),
    ))
}

/// argv for running `command` through the platform shell
pub fn shell_argv(command: &str) -> Vec<String> {
    vec![SHELL.to_string(), "-c".to_string(), command.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn resolve_program_path_uses_path_value() {
        let resolved = resolve_program_path("sh", Some("/bin:/usr/bin")).unwrap();
        assert!(
            resolved.ends_with("sh"),
            "expected sh in path, got {}",
            resolved.display()
        );
    }

    #[test]
    fn resolve_program_path_falls_back_to_default_path() {
        assert!(resolve_program_path("sh", None).is_ok());
    }

    #[test]
    fn resolve_program_path_reports_missing_binary() {
        let err = resolve_program_path("definitely_missing_cmd", Some("/nonexistent")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("command not found"));
    }

    #[test]
    fn resolve_program_path_keeps_explicit_paths() {
        let resolved = resolve_program_path("./not/checked", None).unwrap();
        assert_eq!(resolved, PathBuf::from("./not/checked"));
    }

    #[test]
    fn resolve_program_path_skips_non_executable_files() {
        let tmp = tempdir().unwrap();
        let script = tmp.path().join("tool");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let path_value = tmp.path().to_string_lossy().into_owned();
        assert!(resolve_program_path("tool", Some(&path_value)).is_err());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(resolve_program_path("tool", Some(&path_value)).unwrap(), script);
    }

    #[test]
    fn resolve_program_path_rejects_empty_name() {
        let err = resolve_program_path("", None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn shell_argv_wraps_command() {
        assert_eq!(shell_argv("echo hi"), vec!["/bin/sh", "-c", "echo hi"]);
    }
}
