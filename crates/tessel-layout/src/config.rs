//! Layout configuration and the per-resolution context.
//!
//! [`LayoutConfig`] holds defaults that containers fall back to. It can be
//! read from `TESSEL_LAYOUT_*` environment variables; unparsable values are
//! ignored with a warning.

#[cfg(feature = "tracing")]
use tessel_core::logging::LAYOUT_TARGET;
use tessel_core::scale::ScaleFactor;

use crate::error::LayoutError;

pub const SPACING_ENV: &str = "TESSEL_LAYOUT_SPACING";
pub const MARGIN_ENV: &str = "TESSEL_LAYOUT_MARGIN";
pub const COHERENCE_CAPACITY_ENV: &str = "TESSEL_LAYOUT_COHERENCE_CAPACITY";
pub const STRICT_ANCHORS_ENV: &str = "TESSEL_LAYOUT_STRICT_ANCHORS";

/// Engine-wide layout defaults. Spacing and margin are logical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutConfig {
    /// Spacing for containers that do not set their own.
    pub default_spacing: u32,
    /// Margin on every side for containers that do not set their own.
    pub default_margin: u32,
    /// Maximum number of track allocations kept for rounding tie-breaks.
    pub coherence_capacity: usize,
    /// Size anchors outside an item's bounds fail instead of clamping.
    pub strict_anchors: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_spacing: 0,
            default_margin: 0,
            coherence_capacity: 1024,
            strict_anchors: true,
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn with_default_spacing(mut self, spacing: u32) -> Self {
        self.default_spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_default_margin(mut self, margin: u32) -> Self {
        self.default_margin = margin;
        self
    }

    #[must_use]
    pub fn with_coherence_capacity(mut self, capacity: usize) -> Self {
        self.coherence_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_strict_anchors(mut self, strict: bool) -> Self {
        self.strict_anchors = strict;
        self
    }

    /// Defaults overridden by `TESSEL_LAYOUT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    #[must_use]
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(spacing) = env_parse(&lookup, SPACING_ENV) {
            config.default_spacing = spacing;
        }
        if let Some(margin) = env_parse(&lookup, MARGIN_ENV) {
            config.default_margin = margin;
        }
        if let Some(capacity) = env_parse(&lookup, COHERENCE_CAPACITY_ENV) {
            config.coherence_capacity = capacity;
        }
        if let Some(strict) = env_flag(&lookup, STRICT_ANCHORS_ENV) {
            config.strict_anchors = strict;
        }
        config
    }
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let value = env_value(lookup, name)?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tessel_core::warn!(
                target: LAYOUT_TARGET,
                variable = name,
                value = %value,
                "ignoring unparsable layout setting"
            );
            None
        }
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let value = env_value(lookup, name)?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tessel_core::warn!(
                target: LAYOUT_TARGET,
                variable = name,
                value = %value,
                "ignoring unrecognized layout flag"
            );
            None
        }
    }
}

/// Everything a resolution pass needs from its host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutContext {
    pub scale: ScaleFactor,
    pub config: LayoutConfig,
}

impl LayoutContext {
    pub const fn new(scale: ScaleFactor, config: LayoutConfig) -> Self {
        Self { scale, config }
    }

    /// Default config at the given scale.
    pub fn with_scale_factor(factor: f32) -> Result<Self, LayoutError> {
        Ok(Self {
            scale: ScaleFactor::new(factor)?,
            config: LayoutConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: ScaleFactor) -> Self {
        self.scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(LayoutConfig::from_env_with(|_| None), LayoutConfig::default());
    }

    #[test]
    fn environment_overrides_fields() {
        let config = LayoutConfig::from_env_with(lookup(&[
            (SPACING_ENV, "6"),
            (MARGIN_ENV, " 2 "),
            (COHERENCE_CAPACITY_ENV, "16"),
            (STRICT_ANCHORS_ENV, "off"),
        ]));
        assert_eq!(config.default_spacing, 6);
        assert_eq!(config.default_margin, 2);
        assert_eq!(config.coherence_capacity, 16);
        assert!(!config.strict_anchors);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let config = LayoutConfig::from_env_with(lookup(&[
            (SPACING_ENV, "-3"),
            (MARGIN_ENV, "wide"),
            (STRICT_ANCHORS_ENV, "maybe"),
        ]));
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn blank_values_are_unset() {
        let config = LayoutConfig::from_env_with(lookup(&[(SPACING_ENV, "   ")]));
        assert_eq!(config.default_spacing, 0);
    }

    #[test]
    fn context_rejects_bad_scale() {
        assert!(matches!(
            LayoutContext::with_scale_factor(f32::NAN),
            Err(LayoutError::InvalidScale { .. })
        ));
        let ctx = LayoutContext::with_scale_factor(1.5).expect("valid scale");
        assert_eq!(ctx.scale.get(), 1.5);
        assert_eq!(ctx.config, LayoutConfig::default());
    }

    #[test]
    fn builder_setters_chain() {
        let config = LayoutConfig::default()
            .with_default_spacing(1)
            .with_default_margin(2)
            .with_coherence_capacity(3)
            .with_strict_anchors(false);
        assert_eq!(
            config,
            LayoutConfig {
                default_spacing: 1,
                default_margin: 2,
                coherence_capacity: 3,
                strict_anchors: false,
            }
        );
    }
}
