//! Engine configuration.

/// When to re-fetch the whole buffer instead of patching individual missing hunks.
///
/// A full refresh happens when the fraction of stale lines exceeds `max_missing_ratio` **and**
/// there are more than `max_hunks` separate stale runs. Otherwise each hunk is fetched on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    /// Stale-line fraction above which a full refresh is considered.
    pub max_missing_ratio: f64,
    /// Hunk count above which a full refresh is considered.
    pub max_hunks: usize,
}

impl RefreshPolicy {
    /// Default stale-line fraction (25%).
    pub const DEFAULT_MAX_MISSING_RATIO: f64 = 0.25;
    /// Default hunk count threshold.
    pub const DEFAULT_MAX_HUNKS: usize = 2;

    /// Decide whether `missing` stale lines spread over `hunks` runs warrant a full refresh.
    pub fn prefers_full_refresh(&self, missing: usize, hunks: usize, line_count: usize) -> bool {
        if line_count == 0 {
            return false;
        }
        let ratio = missing as f64 / line_count as f64;
        ratio > self.max_missing_ratio && hunks > self.max_hunks
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            max_missing_ratio: Self::DEFAULT_MAX_MISSING_RATIO,
            max_hunks: Self::DEFAULT_MAX_HUNKS,
        }
    }
}

/// Configuration for a [`FoldRegistry`](crate::FoldRegistry) and the buffers it owns.
#[derive(Debug, Clone)]
pub struct FoldConfig {
    /// Name of the structural query that yields fold candidates.
    pub query_name: String,
    /// Capture name whose nodes become fold candidates.
    pub capture_name: String,
    /// Priority assigned to candidates without a numeric `priority` property.
    pub default_priority: i32,
    /// Separator placed between the start and end text of a closed fold.
    pub ellipsis: String,
    /// Line cache refresh policy.
    pub refresh: RefreshPolicy,
}

impl FoldConfig {
    /// Default query name.
    pub const DEFAULT_QUERY_NAME: &'static str = "folds";
    /// Default capture name.
    pub const DEFAULT_CAPTURE_NAME: &'static str = "fold";
    /// Default candidate priority.
    pub const DEFAULT_PRIORITY: i32 = 1000;

    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different query name.
    pub fn with_query_name(mut self, name: impl Into<String>) -> Self {
        self.query_name = name.into();
        self
    }

    /// Use a different fold capture name.
    pub fn with_capture_name(mut self, name: impl Into<String>) -> Self {
        self.capture_name = name.into();
        self
    }

    /// Override the closed-fold separator.
    pub fn with_ellipsis(mut self, ellipsis: impl Into<String>) -> Self {
        self.ellipsis = ellipsis.into();
        self
    }

    /// Override the line cache refresh policy.
    pub fn with_refresh_policy(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            query_name: Self::DEFAULT_QUERY_NAME.to_string(),
            capture_name: Self::DEFAULT_CAPTURE_NAME.to_string(),
            default_priority: Self::DEFAULT_PRIORITY,
            ellipsis: String::from(" ... "),
            refresh: RefreshPolicy::default(),
        }
    }
}
