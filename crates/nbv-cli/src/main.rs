mod cli;
mod env;
mod probe;

use nbv_core::capability::ConfigError;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        if e.downcast_ref::<ConfigError>().is_some() {
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}
