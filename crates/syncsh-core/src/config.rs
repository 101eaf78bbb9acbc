//! Configuration read once from the environment.
//!
//! There is no configuration file: the build tool exports everything the
//! wrapper needs. The resulting [`Config`] is immutable and passed
//! explicitly to every component.

use std::{
    env,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Shell used to run recipes.
pub const SHELL_VAR: &str = "SYNCSH_SHELL";
/// Regular expression selecting recipes that run fully serialized.
pub const SERIALIZE_VAR: &str = "SYNCSH_SERIALIZE";
/// Absolute path of the shared lock file.
pub const LOCKFILE_VAR: &str = "SYNCSH_LOCKFILE";
/// Absolute path of the append-only output log.
pub const TEE_VAR: &str = "SYNCSH_TEE";
/// Line written before every published block.
pub const HEADLINE_VAR: &str = "SYNCSH_HEADLINE";
/// Prefix for echoing the recipe text.
pub const VERBOSE_VAR: &str = "SYNCSH_VERBOSE";
/// Set by make for recipe shells, absent for `$(shell ...)`.
pub const RECURSION_MARKER_VAR: &str = "MAKEFILE_LIST";

/// Shell used when `SYNCSH_SHELL` is unset.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Wrapper configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub shell: PathBuf,
    pub serialize_pattern: Option<String>,
    pub lock_file: Option<PathBuf>,
    pub tee: Option<PathBuf>,
    pub headline: Option<String>,
    pub verbose: Option<String>,
    pub recursion_marker: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            serialize_pattern: None,
            lock_file: None,
            tee: None,
            headline: None,
            verbose: None,
            recursion_marker: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var_os(name))
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset, except for the verbose prefix (an empty
    /// prefix still enables echoing) and the recursion marker (make exports
    /// an empty `MAKEFILE_LIST` when no makefile was read).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let text = |name: &str| non_empty(name).map(|value| lossy(&value));

        Self {
            shell: non_empty(SHELL_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL)),
            serialize_pattern: text(SERIALIZE_VAR),
            lock_file: non_empty(LOCKFILE_VAR).map(PathBuf::from),
            tee: non_empty(TEE_VAR).map(PathBuf::from),
            headline: text(HEADLINE_VAR),
            verbose: lookup(VERBOSE_VAR).map(|value| lossy(&value)),
            recursion_marker: lookup(RECURSION_MARKER_VAR).is_some(),
        }
    }

    /// Locate the configured shell.
    ///
    /// Paths containing a separator are used as given; bare names are
    /// looked up on `PATH` so a missing shell is reported before any lock
    /// or capture storage is set up.
    pub fn resolve_shell(&self) -> Result<PathBuf> {
        if self.shell.components().count() > 1 || self.shell.is_absolute() {
            return Ok(self.shell.clone());
        }
        which::which(&self.shell).map_err(|source| Error::ShellNotFound {
            shell: self.shell.clone(),
            source,
        })
    }

    /// The tee path, if configured and usable.
    ///
    /// A relative tee path is ignored with a warning: instances run from
    /// different directories would otherwise write to different logs.
    pub fn tee_path(&self) -> Option<&Path> {
        match self.tee.as_deref() {
            Some(path) if path.is_absolute() => Some(path),
            Some(path) => {
                tracing::warn!(
                    "ignoring {TEE_VAR}={}: not an absolute path",
                    path.display()
                );
                None
            }
            None => None,
        }
    }
}

fn lossy(value: &OsStr) -> String {
    value.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), OsString::from(v)))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert!(!config.recursion_marker);
    }

    #[test]
    fn test_all_variables_are_read() {
        let config = config_from(&[
            (SHELL_VAR, "/bin/bash"),
            (SERIALIZE_VAR, "^link"),
            (LOCKFILE_VAR, "/tmp/build.lock"),
            (TEE_VAR, "/tmp/build.log"),
            (HEADLINE_VAR, "== job =="),
            (VERBOSE_VAR, "+ "),
            (RECURSION_MARKER_VAR, " Makefile"),
        ]);
        assert_eq!(config.shell, PathBuf::from("/bin/bash"));
        assert_eq!(config.serialize_pattern.as_deref(), Some("^link"));
        assert_eq!(config.lock_file, Some(PathBuf::from("/tmp/build.lock")));
        assert_eq!(config.tee, Some(PathBuf::from("/tmp/build.log")));
        assert_eq!(config.headline.as_deref(), Some("== job =="));
        assert_eq!(config.verbose.as_deref(), Some("+ "));
        assert!(config.recursion_marker);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[
            (SHELL_VAR, ""),
            (SERIALIZE_VAR, ""),
            (LOCKFILE_VAR, ""),
            (TEE_VAR, ""),
            (HEADLINE_VAR, ""),
        ]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_verbose_prefix_still_enables_echo() {
        let config = config_from(&[(VERBOSE_VAR, "")]);
        assert_eq!(config.verbose.as_deref(), Some(""));
    }

    #[test]
    fn test_empty_recursion_marker_counts_as_present() {
        let config = config_from(&[(RECURSION_MARKER_VAR, "")]);
        assert!(config.recursion_marker);
    }

    #[test]
    fn test_relative_tee_is_ignored() {
        let config = config_from(&[(TEE_VAR, "build.log")]);
        assert_eq!(config.tee_path(), None);

        let config = config_from(&[(TEE_VAR, "/var/log/build.log")]);
        assert_eq!(config.tee_path(), Some(Path::new("/var/log/build.log")));
    }

    #[test]
    fn test_resolve_shell_keeps_explicit_paths() {
        let config = config_from(&[(SHELL_VAR, "/opt/shells/dash")]);
        assert_eq!(
            config.resolve_shell().ok(),
            Some(PathBuf::from("/opt/shells/dash"))
        );
    }

    #[test]
    fn test_resolve_shell_searches_path_for_bare_names() {
        let config = config_from(&[(SHELL_VAR, "sh")]);
        let resolved = config.resolve_shell();
        assert!(matches!(resolved, Ok(ref path) if path.is_absolute()));
    }

    #[test]
    fn test_resolve_shell_reports_missing_shell() {
        let config = config_from(&[(SHELL_VAR, "syncsh-no-such-shell")]);
        let err = config.resolve_shell();
        assert!(matches!(err, Err(Error::ShellNotFound { .. })));
    }
}
