//! How a stage represents an item whose lookup failed.
//!
//! The trend stage keeps a failed keyword as a 0.0 score while the news
//! stage drops a failed day from its output. Both are expressed as an
//! explicit [`FailurePolicy`] so the choice is visible in configuration.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the item with its type's zero value.
    ZeroFill,
    /// Leave the item out of the output.
    Omit,
}

impl FailurePolicy {
    /// Resolve one item's lookup result. Failures are logged with `item`
    /// as context.
    pub fn resolve<T, E>(self, item: &str, result: Result<T, E>) -> Option<T>
    where
        T: Default,
        E: Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(item, error = %e, policy = ?self, "Lookup failed");
                match self {
                    FailurePolicy::ZeroFill => Some(T::default()),
                    FailurePolicy::Omit => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fill_keeps_default() {
        let r: Result<f64, &str> = Err("boom");
        assert_eq!(FailurePolicy::ZeroFill.resolve("apple", r), Some(0.0));
    }

    #[test]
    fn test_omit_drops_failure() {
        let r: Result<u64, &str> = Err("boom");
        assert_eq!(FailurePolicy::Omit.resolve("2025-05-25", r), None);
    }

    #[test]
    fn test_success_passes_through() {
        let r: Result<u64, &str> = Ok(7);
        assert_eq!(FailurePolicy::Omit.resolve("x", r), Some(7));
        assert_eq!(FailurePolicy::ZeroFill.resolve("x", Ok::<_, &str>(7)), Some(7));
    }

    #[test]
    fn test_yaml_names() {
        let p: FailurePolicy = serde_yaml::from_str("zero_fill").unwrap();
        assert_eq!(p, FailurePolicy::ZeroFill);
        let p: FailurePolicy = serde_yaml::from_str("omit").unwrap();
        assert_eq!(p, FailurePolicy::Omit);
    }
}
