//! Options that control how a decode pass treats its input.

/// Limits and policies applied by a [`Reader`](crate::reader::Reader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    pub(crate) max_depth: u32,
    pub(crate) strict_utf8: bool,
}

impl DecodeConfig {
    /// Default limit on nested messages and groups.
    pub const DEFAULT_MAX_DEPTH: u32 = 100;

    pub fn new() -> Self {
        DecodeConfig::default()
    }

    /// Set the maximum nesting depth of messages and groups.
    ///
    /// Input nested deeper than this poisons the reader with
    /// [`RecursionLimitExceeded`](crate::error::DecodeErrorKind::RecursionLimitExceeded).
    pub fn max_depth(&mut self, depth: u32) -> &mut Self {
        self.max_depth = depth;
        self
    }

    /// Reject invalid UTF-8 in string fields instead of skipping the offending bytes.
    pub fn strict_utf8(&mut self, strict: bool) -> &mut Self {
        self.strict_utf8 = strict;
        self
    }

    pub fn get_max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn is_strict_utf8(&self) -> bool {
        self.strict_utf8
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            strict_utf8: false,
        }
    }
}
