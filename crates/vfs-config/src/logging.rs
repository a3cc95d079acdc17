//! Structured logging macros for the VFS core, mirroring the grounding
//! workspace's component-tagged `log_*_info!`/`log_*_debug!` convention.
//!
//! Every parse failure, resolver fallback, and key-acquisition step emits a
//! `debug!`/`warn!` span tagged with one of the [`Component`] constants.

/// Component identifiers for log filtering.
pub struct Component;

impl Component {
    pub const VFS: &'static str = "VFS";
    pub const RESOLVE: &'static str = "RESOLVE";
    pub const KEYSTORE: &'static str = "KEYSTORE";
    pub const OPEN: &'static str = "OPEN";
}

#[macro_export]
macro_rules! log_vfs_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "VFS", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_resolve_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "RESOLVE", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_resolve_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "RESOLVE", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_keystore_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "KEYSTORE", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_open_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "OPEN", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_open_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "OPEN", $($key = $value,)* $msg)
    };
}

/// Initializes `tracing-subscriber` from `RUST_LOG`, falling back to `level`.
/// Call once at process startup (the CLI's `main` does this; library
/// embedders are expected to install their own subscriber instead).
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_constants_match_spec_tags() {
        assert_eq!(Component::VFS, "VFS");
        assert_eq!(Component::RESOLVE, "RESOLVE");
        assert_eq!(Component::KEYSTORE, "KEYSTORE");
        assert_eq!(Component::OPEN, "OPEN");
    }
}
