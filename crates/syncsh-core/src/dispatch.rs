//! Deciding whether an invocation is a recipe at all.
//!
//! Only `syncsh -<flags with c> <command>` run by make for a recipe gets
//! synchronized. Everything else, `$(shell ...)` substitutions included, is
//! handed to the real shell by replacing this process image, which keeps
//! output and exit status byte-identical to running the shell directly.

use std::{
    ffi::{OsStr, OsString},
    fmt,
    os::unix::{ffi::OsStrExt, process::CommandExt},
    path::{Path, PathBuf},
    process::Command,
};

use crate::{config::Config, Error};

const DEFAULT_PROGRAM_NAME: &str = "syncsh";

/// Command-line tokens this process was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<I>(args: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        Self {
            args: args.into_iter().collect(),
        }
    }

    /// Basename of `argv[0]`, for diagnostics.
    pub fn program_name(&self) -> String {
        self.args
            .first()
            .map(Path::new)
            .and_then(Path::file_name)
            .map_or_else(
                || DEFAULT_PROGRAM_NAME.to_string(),
                |name| name.to_string_lossy().into_owned(),
            )
    }

    /// Arguments meant for the shell: everything after the program name.
    pub fn shell_args(&self) -> &[OsString] {
        self.args.get(1..).unwrap_or_default()
    }

    /// Classify this invocation.
    pub fn dispatch(&self, config: &Config) -> Dispatch<'_> {
        let [_, flag, recipe] = self.args.as_slice() else {
            return Dispatch::PassThrough(PassThroughReason::ArgumentCount(self.args.len()));
        };

        if !is_execute_flag(flag) {
            return Dispatch::PassThrough(PassThroughReason::NotExecuteFlag);
        }
        if recipe.as_bytes().starts_with(b"-") {
            return Dispatch::PassThrough(PassThroughReason::RecipeLooksLikeFlag);
        }
        if !config.recursion_marker {
            return Dispatch::PassThrough(PassThroughReason::NotARecipe);
        }

        Dispatch::Synchronize {
            flag: flag.as_os_str(),
            recipe: recipe.as_os_str(),
        }
    }
}

/// What to do with an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// Hand the arguments to the shell unchanged
    PassThrough(PassThroughReason),
    /// Run `shell flag recipe` under the publication protocol
    Synchronize { flag: &'a OsStr, recipe: &'a OsStr },
}

/// Why an invocation bypasses synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// Not exactly program, flag and command
    ArgumentCount(usize),
    /// Second token is not a flag word containing `c`
    NotExecuteFlag,
    /// Third token starts with `-`
    RecipeLooksLikeFlag,
    /// No recursion marker: a shell substitution, not a recipe
    NotARecipe,
}

impl fmt::Display for PassThroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentCount(count) => write!(f, "{count} arguments instead of 3"),
            Self::NotExecuteFlag => write!(f, "no -c flag"),
            Self::RecipeLooksLikeFlag => write!(f, "command looks like a flag"),
            Self::NotARecipe => write!(f, "not a recipe invocation"),
        }
    }
}

fn is_execute_flag(flag: &OsStr) -> bool {
    let bytes = flag.as_bytes();
    bytes.len() > 1 && bytes[0] == b'-' && bytes[1..].contains(&b'c')
}

/// Replace this process with `shell args...`.
///
/// Only returns if the exec failed.
pub fn exec_shell(shell: &Path, args: &[OsString]) -> Error {
    tracing::debug!(shell = %shell.display(), "exec pass-through");
    let source = Command::new(shell).args(args).exec();
    Error::Exec {
        shell: PathBuf::from(shell),
        source,
    }
}
