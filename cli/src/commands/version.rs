//! Command: print version information.

/// Version string, preferring the one injected at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("SAGE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the installer version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("sage {}", version());
}
