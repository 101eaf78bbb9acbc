//! Syncsh CLI
//!
//! Binary name: `syncsh`

use std::{env, process};

use syncsh_core::Config;

fn main() {
    syncsh::logging::init();

    let config = Config::from_env();
    let code = syncsh::app::run(env::args_os(), &config);

    #[allow(clippy::exit)]
    process::exit(code);
}
