//! Configuration validation
//!
//! Every config section implements [`Validatable`]; [`NetgraphConfig`](super::NetgraphConfig)
//! validates its sections in order and stops at the first failure.

use super::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration objects
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Name used as the field prefix in error messages
    fn config_name(&self) -> &'static str {
        "config"
    }
}

/// Check `value` lies in `min..=max`, reporting `section.field` on failure.
pub(crate) fn check_range<T>(
    section: &str,
    field: &str,
    value: T,
    min: T,
    max: T,
    hint: &str,
) -> ConfigResult<()>
where
    T: PartialOrd + ToString + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::range_with_hint(
            format!("{}.{}", section, field),
            value,
            min,
            max,
            hint,
        ));
    }
    Ok(())
}
