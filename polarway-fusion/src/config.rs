//! Configuration for the native runtime a session creates

/// Environment variable overriding [`FusionConfig::worker_threads`]
pub const WORKER_THREADS_ENV: &str = "POLARWAY_FUSION_WORKER_THREADS";

/// Environment variable overriding [`FusionConfig::thread_name`]
pub const THREAD_NAME_ENV: &str = "POLARWAY_FUSION_THREAD_NAME";

const DEFAULT_THREAD_NAME: &str = "polarway-fusion";

/// Host-side runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionConfig {
    /// Worker threads for the native runtime (`None` = one per core)
    pub worker_threads: Option<usize>,

    /// Name given to the runtime's worker threads
    pub thread_name: String,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionConfig {
    /// Create config with built-in defaults, ignoring the environment
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Create config from defaults overridden by `POLARWAY_FUSION_*` variables
    ///
    /// Unparseable or zero thread counts are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new();
        Self {
            worker_threads: lookup(WORKER_THREADS_ENV)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .or(defaults.worker_threads),
            thread_name: lookup(THREAD_NAME_ENV)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.thread_name),
        }
    }

    /// Override worker thread count
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    /// Override worker thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = FusionConfig::new();
        assert_eq!(cfg.worker_threads, None);
        assert_eq!(cfg.thread_name, "polarway-fusion");
        assert_eq!(cfg, FusionConfig::default());
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = FusionConfig::new()
            .with_worker_threads(2)
            .with_thread_name("fusion-test");
        assert_eq!(cfg.worker_threads, Some(2));
        assert_eq!(cfg.thread_name, "fusion-test");

        assert_eq!(FusionConfig::new().with_worker_threads(0).worker_threads, Some(1));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = FusionConfig::from_lookup(lookup_from(&[
            (WORKER_THREADS_ENV, "3"),
            (THREAD_NAME_ENV, "etl-worker"),
        ]));
        assert_eq!(cfg.worker_threads, Some(3));
        assert_eq!(cfg.thread_name, "etl-worker");
    }

    #[test]
    fn test_invalid_env_falls_back_to_defaults() {
        let cfg = FusionConfig::from_lookup(lookup_from(&[
            (WORKER_THREADS_ENV, "lots"),
            (THREAD_NAME_ENV, "  "),
        ]));
        assert_eq!(cfg, FusionConfig::new());

        let cfg = FusionConfig::from_lookup(lookup_from(&[(WORKER_THREADS_ENV, "0")]));
        assert_eq!(cfg.worker_threads, None);
    }
}
