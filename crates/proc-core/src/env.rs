//! Environment mapping handed to spawned processes

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ffi::OsString;
use std::hash::Hash;

use log::warn;

use crate::associative::Associative;
use crate::error::{ProcError, Result};

/// String-to-string environment with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Entries that are not valid UTF-8 are skipped with a warning, so the
    /// child will not see them.
    pub fn ambient() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build from OS strings, skipping entries that are not valid UTF-8
    pub fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        vars.into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    warn!("Skipping environment variable {} with a non UTF-8 value", key);
                    None
                }
                (Err(key), _) => {
                    warn!("Skipping environment variable with non UTF-8 name {:?}", key);
                    None
                }
            })
            .collect()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Value of `PATH`, used for program lookup
    pub fn path(&self) -> Option<&str> {
        self.get("PATH")
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.vars.iter()
    }

    /// Reject entries that cannot be passed to `execve`
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.vars {
            if key.is_empty() {
                return Err(ProcError::Config(
                    "environment variable name cannot be empty".to_string(),
                ));
            }
            if key.contains('=') || key.contains('\0') {
                return Err(ProcError::Config(format!(
                    "invalid environment variable name: {:?}",
                    key
                )));
            }
            if value.contains('\0') {
                return Err(ProcError::Config(format!(
                    "environment variable {} contains a nul byte",
                    key
                )));
            }
        }
        Ok(())
    }

    /// `KEY=VALUE` strings in key order
    pub fn to_entries(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for Environment {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.vars.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl Associative for Environment {
    type Key = String;
    type Value = String;

    fn get<Q>(&self, key: &Q) -> Option<&String>
    where
        String: Borrow<Q>,
        Q: Hash + Ord + Eq + ?Sized,
    {
        self.vars.get(key)
    }

    fn store<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let replacement: Environment = entries.into_iter().collect();
        replacement.validate()?;
        *self = replacement;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Environment {
        let mut env = Environment::new();
        env.set("PATH", "/bin:/usr/bin");
        env.set("HOME", "/home/user");
        env
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut env = sample();
        let previous = env.set("HOME", "/root");
        assert_eq!(previous.as_deref(), Some("/home/user"));
        assert_eq!(env.get("HOME"), Some("/root"));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_entries_are_key_ordered() {
        let env = sample();
        assert_eq!(
            env.to_entries(),
            vec!["HOME=/home/user".to_string(), "PATH=/bin:/usr/bin".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut env = Environment::new();
        env.set("A=B", "x");
        assert!(env.validate().is_err());

        let mut env = Environment::new();
        env.set("", "x");
        assert!(env.validate().is_err());

        let mut env = Environment::new();
        env.set("OK", "bad\0value");
        assert!(env.validate().is_err());
    }

    #[test]
    fn test_ambient_snapshot_is_detached() {
        let mut env = Environment::ambient();
        let before = Environment::ambient();
        env.set("PROC_CORE_SNAPSHOT_ONLY", "1");
        assert!(!before.contains("PROC_CORE_SNAPSHOT_ONLY"));
        assert!(std::env::var("PROC_CORE_SNAPSHOT_ONLY").is_err());
    }

    #[test]
    fn test_associative_lookup() {
        let env = sample();
        assert!(Associative::has(&env, "PATH"));
        assert_eq!(
            Associative::get(&env, "HOME").map(String::as_str),
            Some("/home/user")
        );
    }

    #[test]
    fn test_associative_store_validates() {
        let mut env = sample();
        env.store(vec![("ONLY".to_string(), "1".to_string())])
            .unwrap();
        assert_eq!(env.len(), 1);

        let err = env
            .store(vec![("BAD=KEY".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(err, ProcError::Config(_)));
        assert_eq!(env.get("ONLY"), Some("1"));
    }

    #[test]
    fn from_os_vars_skips_non_utf8_entries() {
        use std::os::unix::ffi::OsStringExt;

        let env = Environment::from_os_vars([
            (OsString::from("KEEP"), OsString::from("yes")),
            (OsString::from_vec(vec![b'B', 0xff]), OsString::from("name")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0xfe])),
        ]);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("KEEP"), Some("yes"));
        assert!(!env.contains("BAD_VALUE"));
    }
}
