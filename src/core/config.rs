//! # Registry configuration.
//!
//! Provides [`Config`] centralized settings for a [`Registry`](crate::Registry).
//!
//! ## Sentinel values
//! - `table_capacity = 0` → clamped to 1 when a table is created

/// Configuration for a registry instance.
///
/// ## Field semantics
/// - `isolate_panics`: Convert handler panics into [`HandlerError::Panicked`](crate::HandlerError::Panicked)
/// - `table_capacity`: Initial entry capacity of each newly created subscription table
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Catch panics raised by handlers during `send`.
    ///
    /// - `true`: the panic is caught, reported in the failure list and dispatch continues
    /// - `false`: the panic unwinds through `send` into the caller
    pub isolate_panics: bool,

    /// Initial capacity of a subscription table's entry vector.
    ///
    /// Tables grow as needed; this only avoids early reallocations for
    /// channels with a known number of subscribers.
    pub table_capacity: usize,
}

impl Config {
    /// Returns a table capacity clamped to a minimum of 1.
    #[inline]
    pub fn table_capacity_clamped(&self) -> usize {
        self.table_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `isolate_panics = true`
    /// - `table_capacity = 4`
    fn default() -> Self {
        Self {
            isolate_panics: true,
            table_capacity: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.isolate_panics);
        assert_eq!(cfg.table_capacity_clamped(), 4);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cfg = Config {
            table_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.table_capacity_clamped(), 1);
    }
}
