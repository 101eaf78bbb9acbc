//! Process-level driver: dispatch, run, report.

use std::ffi::OsString;

use anyhow::Context;
use syncsh_core::{exec_shell, Config, Dispatch, Invocation, Job, EXIT_INTERNAL};

/// Run one invocation and return the process exit code.
///
/// Pass-through invocations only return here if the shell could not be
/// exec'd.
pub fn run<I>(args: I, config: &Config) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    let invocation = Invocation::new(args);
    let program = invocation.program_name();

    match invocation.dispatch(config) {
        Dispatch::PassThrough(reason) => {
            tracing::debug!(%reason, "passing through to shell");
            let err = exec_shell(&config.shell, invocation.shell_args());
            report(&program, &anyhow::Error::new(err).context("pass-through failed"))
        }
        Dispatch::Synchronize { flag, recipe } => {
            let result = Job::new(config, flag, recipe)
                .run()
                .with_context(|| format!("recipe '{}'", recipe.to_string_lossy()));
            match result {
                Ok(code) => code,
                Err(err) => report(&program, &err),
            }
        }
    }
}

/// Print a fatal error and pick the reserved exit code for it.
pub fn report(program: &str, err: &anyhow::Error) -> i32 {
    #[allow(clippy::print_stderr)]
    {
        eprintln!("{program}: Error: {err:#}");
    }

    err.downcast_ref::<syncsh_core::Error>()
        .map_or(EXIT_INTERNAL, syncsh_core::Error::exit_code)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use syncsh_core::Error;

    use super::*;

    #[test]
    fn test_report_of_missing_shell_is_internal_failure() {
        let err = anyhow::Error::new(Error::Exec {
            shell: PathBuf::from("/nonexistent/sh"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
        .context("pass-through failed");
        assert_eq!(report("syncsh", &err), EXIT_INTERNAL);
    }

    #[test]
    fn test_missing_recipe_command_keeps_shell_code() {
        let config = Config {
            recursion_marker: true,
            lock_file: Some(std::env::temp_dir().join("syncsh-app-test.lock")),
            ..Config::default()
        };
        let args = ["syncsh", "-c", "syncsh_no_such_command_xyz"].map(OsString::from);
        assert_eq!(run(args, &config), 127);
    }

    #[test]
    fn test_report_defaults_to_internal_code() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(report("syncsh", &err), EXIT_INTERNAL);
    }

    #[test]
    fn test_synchronized_run_returns_recipe_code() {
        let config = Config {
            recursion_marker: true,
            lock_file: Some(std::env::temp_dir().join("syncsh-app-test.lock")),
            ..Config::default()
        };
        let args = ["syncsh", "-c", "exit 9"].map(OsString::from);
        assert_eq!(run(args, &config), 9);
    }

    #[test]
    fn test_relative_lock_file_is_reported_as_internal_failure() {
        let config = Config {
            recursion_marker: true,
            lock_file: Some(PathBuf::from("relative.lock")),
            ..Config::default()
        };
        let args = ["syncsh", "-c", "true"].map(OsString::from);
        assert_eq!(run(args, &config), EXIT_INTERNAL);
    }
}
