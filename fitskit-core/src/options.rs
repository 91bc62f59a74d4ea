//! Reader and writer options

/// Conventions applied when decoding and encoding headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FitsOptions {
    /// Accept and emit `HIERARCH` keywords longer than 8 characters
    pub use_hierarch: bool,
    /// Split long strings over CONTINUE cards even without a LONGSTRN card
    pub long_strings: bool,
    /// Treat a non-header block after the first unit as end of input
    pub allow_terminal_junk: bool,
    /// Require blank fill after fixed-width numeric fields
    pub strict_fields: bool,
}

impl FitsOptions {
    pub const fn new() -> Self {
        Self {
            use_hierarch: true,
            long_strings: false,
            allow_terminal_junk: true,
            strict_fields: false,
        }
    }

    /// Enable or disable the HIERARCH convention
    pub fn with_hierarch(mut self, use_hierarch: bool) -> Self {
        self.use_hierarch = use_hierarch;
        self
    }

    /// Enable long-string handling from the start
    pub fn with_long_strings(mut self, long_strings: bool) -> Self {
        self.long_strings = long_strings;
        self
    }

    /// Tolerate junk after the last unit of a file
    pub fn with_terminal_junk(mut self, allow: bool) -> Self {
        self.allow_terminal_junk = allow;
        self
    }

    /// Require blank fill after numeric fields
    pub fn with_strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }
}

impl Default for FitsOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let opts = FitsOptions::default()
            .with_hierarch(false)
            .with_long_strings(true)
            .with_terminal_junk(false)
            .with_strict_fields(true);
        assert!(!opts.use_hierarch);
        assert!(opts.long_strings);
        assert!(!opts.allow_terminal_junk);
        assert!(opts.strict_fields);
        assert_ne!(opts, FitsOptions::new());
    }
}
