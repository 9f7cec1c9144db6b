//! Registry-wide and per-call observation options.
//!
//! Registry options can be loaded from TOML; every field is optional and
//! unknown keys are rejected:
//!
//! ```toml
//! threshold = 0.25
//! margin = "0px 0px -10%"
//! once = false
//! ```

use serde::{Deserialize, Serialize};

use crate::{Margin, ObserverError};

pub const DEFAULT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_MARGIN: Margin = Margin::px(50.0);
pub const DEFAULT_ONCE: bool = true;

/// Options a registry is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObserverOptions {
    /// Fraction of the target's area that must be inside the viewport.
    pub threshold: f64,
    /// Expansion (or contraction) applied to the viewport before intersecting.
    pub margin: Margin,
    /// Default policy: drop a registration after its first delivery.
    pub once: bool,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            margin: DEFAULT_MARGIN,
            once: DEFAULT_ONCE,
        }
    }
}

impl ObserverOptions {
    /// Checks that the options can configure a monitor.
    ///
    /// # Errors
    ///
    /// - `InvalidThreshold` when `threshold` is not within `0.0..=1.0`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visibility_registry::{ObserverError, ObserverOptions};
    ///
    /// assert!(ObserverOptions::default().validate().is_ok());
    ///
    /// let options = ObserverOptions { threshold: 1.5, ..ObserverOptions::default() };
    /// assert_eq!(options.validate(), Err(ObserverError::InvalidThreshold(1.5)));
    /// ```
    pub fn validate(&self) -> Result<(), ObserverError> {
        validate_threshold(self.threshold)
    }

    /// Parses and validates options from a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ObserverError> {
        let options: ObserverOptions =
            toml::from_str(source).map_err(|e| ObserverError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// The part of the options that is fixed into the monitor at connect time.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            threshold: self.threshold,
            margin: self.margin,
        }
    }
}

/// Configuration handed to a monitor when the registry connects it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub threshold: f64,
    pub margin: Margin,
}

/// Per-call overrides accepted by `observe_with`.
///
/// `once` is honoured per registration. `threshold` and `margin` are only
/// accepted when they match the shared monitor's configuration, since a
/// running monitor cannot be reconfigured for a single target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObserveOptions {
    pub threshold: Option<f64>,
    pub margin: Option<Margin>,
    pub once: Option<bool>,
}

impl ObserveOptions {
    /// Overrides only the one-shot policy for this registration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visibility_registry::ObserveOptions;
    ///
    /// let persistent = ObserveOptions::once(false);
    /// assert_eq!(persistent.once, Some(false));
    /// assert_eq!(persistent.threshold, None);
    /// ```
    pub fn once(once: bool) -> Self {
        Self {
            once: Some(once),
            ..Self::default()
        }
    }

    /// Requests a threshold; it must equal the registry's own.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Requests a margin; it must equal the registry's own.
    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Fails when a requested threshold or margin differs from `config`.
    pub(crate) fn check_against(&self, config: &MonitorConfig) -> Result<(), ObserverError> {
        if let Some(threshold) = self.threshold {
            validate_threshold(threshold)?;
        }

        let requested_threshold = self.threshold.unwrap_or(config.threshold);
        let requested_margin = self.margin.unwrap_or(config.margin);

        if requested_threshold != config.threshold || requested_margin != config.margin {
            return Err(ObserverError::ConflictingOptions {
                monitor_threshold: config.threshold,
                monitor_margin: config.margin.to_string(),
                requested_threshold,
                requested_margin: requested_margin.to_string(),
            });
        }
        Ok(())
    }
}

fn validate_threshold(threshold: f64) -> Result<(), ObserverError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ObserverError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Length;

    #[test]
    fn test_defaults() {
        let options = ObserverOptions::default();
        assert_eq!(options.threshold, 0.1);
        assert_eq!(options.margin.to_string(), "50px");
        assert!(options.once);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let options = ObserverOptions::from_toml("once = false\nmargin = \"0px 0px -10%\"").unwrap();
        assert!(!options.once);
        assert_eq!(options.threshold, DEFAULT_THRESHOLD);
        assert_eq!(options.margin.bottom, Length::Percent(-10.0));
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = ObserverOptions::from_toml("root_margin = \"50px\"").unwrap_err();
        assert!(matches!(err, ObserverError::Config(_)));
    }

    #[test]
    fn test_from_toml_rejects_bad_margin() {
        let err = ObserverOptions::from_toml("margin = \"5em\"").unwrap_err();
        assert!(matches!(err, ObserverError::Config(msg) if msg.contains("5em")));
    }

    #[test]
    fn test_from_toml_rejects_out_of_range_threshold() {
        assert_eq!(
            ObserverOptions::from_toml("threshold = 1.5"),
            Err(ObserverError::InvalidThreshold(1.5))
        );
    }

    #[test]
    fn test_nan_threshold_is_invalid() {
        let options = ObserverOptions {
            threshold: f64::NAN,
            ..ObserverOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ObserverError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_check_against_matching_overrides() {
        let config = ObserverOptions::default().monitor_config();
        assert!(ObserveOptions::default().check_against(&config).is_ok());
        assert!(ObserveOptions::once(false)
            .with_threshold(0.1)
            .with_margin(Margin::px(50.0))
            .check_against(&config)
            .is_ok());
    }

    #[test]
    fn test_check_against_conflict() {
        let config = ObserverOptions::default().monitor_config();
        let err = ObserveOptions::default()
            .with_margin(Margin::px(0.0))
            .check_against(&config)
            .unwrap_err();
        assert_eq!(
            err,
            ObserverError::ConflictingOptions {
                monitor_threshold: 0.1,
                monitor_margin: "50px".to_string(),
                requested_threshold: 0.1,
                requested_margin: "0px".to_string(),
            }
        );
    }
}
