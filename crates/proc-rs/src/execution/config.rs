//! Immutable execution configuration and the ambient context it is taken from

use std::path::{Path, PathBuf};

use proc_core::{Environment, ProcError, Result};

use crate::execution::sink::SinkPolicy;
use crate::stream::encoding::{Encoding, TextMode};

/// Working directory and environment that new processes start from.
///
/// A `Context` is an explicit value: processes spawned from it receive a
/// copy, so later changes only affect processes spawned afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    cwd: PathBuf,
    env: Environment,
}

impl Context {
    pub fn new(cwd: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            cwd: cwd.into(),
            env,
        }
    }

    /// Snapshot of the current process's working directory and environment.
    ///
    /// Environment entries that are not valid UTF-8 are left out (see
    /// [`Environment::ambient`]).
    pub fn ambient() -> Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir()?,
            env: Environment::ambient(),
        })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Change directory; relative paths are taken from the current one
    pub fn chdir(&mut self, path: impl AsRef<Path>) {
        self.cwd = self.cwd.join(path);
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.set(key, value);
    }

    pub fn remove_env(&mut self, key: &str) {
        self.env.remove(key);
    }
}

/// Everything the launcher needs besides the stream bindings
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    argv: Vec<String>,
    cwd: PathBuf,
    env: Environment,
    text: TextMode,
    merge: bool,
    sink_policy: SinkPolicy,
}

impl ExecutionConfig {
    /// Validate and freeze a configuration
    pub fn new(
        argv: Vec<String>,
        cwd: PathBuf,
        env: Environment,
        text: TextMode,
        merge: bool,
        sink_policy: SinkPolicy,
    ) -> Result<Self> {
        if argv.is_empty() || argv[0].is_empty() {
            return Err(ProcError::Config("Command cannot be empty".to_string()));
        }
        if let Some(arg) = argv.iter().find(|a| a.contains('\0')) {
            return Err(ProcError::Config(format!(
                "Argument contains a nul byte: {:?}",
                arg
            )));
        }
        env.validate()?;
        text.validate()?;

        Ok(Self {
            argv,
            cwd,
            env,
            text,
            merge,
            sink_policy,
        })
    }

    /// Program name as given (first element of argv)
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Program plus arguments
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn text(&self) -> &TextMode {
        &self.text
    }

    pub fn encoding(&self) -> Encoding {
        self.text.encoding
    }

    pub fn binary(&self) -> bool {
        self.text.binary
    }

    pub fn chomp(&self) -> bool {
        self.text.chomp
    }

    pub fn newline(&self) -> &str {
        &self.text.newline
    }

    pub fn merge(&self) -> bool {
        self.merge
    }

    pub fn sink_policy(&self) -> SinkPolicy {
        self.sink_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn config(args: &[&str]) -> Result<ExecutionConfig> {
        ExecutionConfig::new(
            argv(args),
            PathBuf::from("/tmp"),
            Environment::new(),
            TextMode::default(),
            false,
            SinkPolicy::default(),
        )
    }

    #[test]
    fn test_config_exposes_fields() {
        let config = config(&["echo", "hello"]).unwrap();
        assert_eq!(config.program(), "echo");
        assert_eq!(config.argv(), &["echo", "hello"]);
        assert_eq!(config.cwd(), Path::new("/tmp"));
        assert!(config.env().is_empty());
        assert_eq!(config.encoding(), Encoding::Utf8);
        assert!(config.chomp());
        assert!(!config.binary());
        assert!(!config.merge());
        assert_eq!(config.newline(), "\n");
        assert_eq!(config.sink_policy(), SinkPolicy::Panic);
    }

    #[test]
    fn test_config_rejects_empty_command() {
        assert!(matches!(config(&[]), Err(ProcError::Config(_))));
        assert!(matches!(config(&[""]), Err(ProcError::Config(_))));
    }

    #[test]
    fn test_config_rejects_nul_arguments() {
        assert!(matches!(
            config(&["echo", "a\0b"]),
            Err(ProcError::Config(_))
        ));
    }

    #[test]
    fn test_config_validates_environment() {
        let mut env = Environment::new();
        env.set("BAD=NAME", "1");
        let result = ExecutionConfig::new(
            argv(&["true"]),
            PathBuf::from("/"),
            env,
            TextMode::default(),
            false,
            SinkPolicy::default(),
        );
        assert!(matches!(result, Err(ProcError::Config(_))));
    }

    #[test]
    fn test_context_chdir_is_relative() {
        let mut ctx = Context::new("/srv", Environment::new());
        ctx.chdir("app");
        assert_eq!(ctx.cwd(), Path::new("/srv/app"));
        ctx.chdir("/var");
        assert_eq!(ctx.cwd(), Path::new("/var"));
    }

    #[test]
    fn test_context_clone_is_a_snapshot() {
        let mut ctx = Context::new("/", Environment::new());
        ctx.set_env("MODE", "first");
        let snapshot = ctx.clone();
        ctx.set_env("MODE", "second");
        ctx.remove_env("OTHER");
        assert_eq!(snapshot.env().get("MODE"), Some("first"));
        assert_eq!(ctx.env().get("MODE"), Some("second"));
    }

    #[test]
    fn test_ambient_context_uses_current_dir() {
        let ctx = Context::ambient().unwrap();
        assert_eq!(ctx.cwd(), std::env::current_dir().unwrap());
    }
}
