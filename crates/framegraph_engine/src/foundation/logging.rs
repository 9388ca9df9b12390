//! Logging bootstrap and error-chain reporting

pub use log::{debug, error, info, trace, warn};

use std::error::Error;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default filter that `RUST_LOG` can override.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Collect the error and all of its sources, outermost first
pub fn error_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

/// Log an error followed by every nested cause
pub fn log_error_chain(error: &(dyn Error + 'static)) {
    let chain = error_chain(error);
    log::error!("{}", chain[0]);
    for (depth, cause) in chain.iter().enumerate().skip(1) {
        log::error!("{:>width$}caused by: {}", "", cause, width = depth * 2);
    }
}
