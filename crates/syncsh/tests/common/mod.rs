//! Common helpers for driving the `syncsh` binary in integration tests.
//!
//! Every command starts from an environment without any `SYNCSH_*`
//! variables so the developer's own settings cannot leak in.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::{
    fs::{File, OpenOptions},
    path::Path,
    process::{Child, Command, Stdio},
};

use syncsh_core::config::{
    HEADLINE_VAR, LOCKFILE_VAR, RECURSION_MARKER_VAR, SERIALIZE_VAR, SHELL_VAR, TEE_VAR,
    VERBOSE_VAR,
};

/// Path of the binary under test
pub const SYNCSH: &str = env!("CARGO_BIN_EXE_syncsh");

const LOG_VAR: &str = "SYNCSH_LOG";

const ALL_VARS: [&str; 8] = [
    SHELL_VAR,
    SERIALIZE_VAR,
    LOCKFILE_VAR,
    TEE_VAR,
    HEADLINE_VAR,
    VERBOSE_VAR,
    RECURSION_MARKER_VAR,
    LOG_VAR,
];

/// `syncsh -c <recipe>` as make would run it for a recipe.
pub fn recipe(recipe: &str) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(SYNCSH);
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    cmd.env(RECURSION_MARKER_VAR, " Makefile").arg("-c").arg(recipe);
    cmd
}

/// `syncsh <args>` with no recursion marker, like a `$(shell ...)` call.
pub fn substitution(args: &[&str]) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(SYNCSH);
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    cmd.args(args);
    cmd
}

/// Append-mode file shared as stdout by concurrently running jobs.
pub fn shared_output(path: &Path) -> File {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap()
}

/// Start one recipe job in the background writing to `stdout`.
pub fn spawn_job(recipe: &str, stdout: &File, envs: &[(&str, &str)]) -> Child {
    let mut cmd = Command::new(SYNCSH);
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    cmd.env(RECURSION_MARKER_VAR, " Makefile")
        .envs(envs.iter().copied())
        .arg("-c")
        .arg(recipe)
        .stdout(Stdio::from(stdout.try_clone().unwrap()))
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

/// Wait for every job and assert each one succeeded.
pub fn wait_all(children: Vec<Child>) {
    for mut child in children {
        let status = child.wait().unwrap();
        assert!(status.success(), "job failed: {status:?}");
    }
}

/// Assert that every line tagged `tag` forms one contiguous run in `lines`.
pub fn assert_contiguous(lines: &[&str], tag: &str, expected_len: usize) {
    let positions: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(tag))
        .map(|(index, _)| index)
        .collect();

    assert_eq!(positions.len(), expected_len, "lines for {tag}: {lines:?}");
    let first = positions[0];
    assert_eq!(
        positions,
        (first..first + expected_len).collect::<Vec<_>>(),
        "block {tag} was interleaved: {lines:?}"
    );
}
