//! Centralized configuration for Marquee.
//!
//! All tunable playback parameters are defined here to avoid
//! hard-coded values scattered throughout the engines.

use tracing::warn;

use crate::MarqueeError;

/// Upper bound for any per-category recovery budget.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Central configuration for all playback components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarqueeConfig {
    pub adaptive: AdaptiveConfig,
    pub native: NativeConfig,
}

/// Adaptive stream engine configuration.
///
/// Controls autoplay and the bounded recovery performed on fatal runtime
/// errors before they are surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveConfig {
    /// Request playback as soon as the manifest (or metadata) is ready
    pub autoplay: bool,
    /// Segment loader restarts allowed per attach for fatal network errors
    pub network_recovery_attempts: u32,
    /// Media recovery calls allowed per attach for fatal decode errors
    pub media_recovery_attempts: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            network_recovery_attempts: 1,
            media_recovery_attempts: 1,
        }
    }
}

/// Native file playback configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeConfig {
    /// Request playback immediately after the source is assigned
    pub autoplay: bool,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self { autoplay: true }
    }
}

impl MarqueeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(autoplay) = std::env::var("MARQUEE_AUTOPLAY")
            && let Ok(enabled) = autoplay.parse::<bool>()
        {
            config.adaptive.autoplay = enabled;
            config.native.autoplay = enabled;
        }

        if let Ok(attempts) = std::env::var("MARQUEE_NETWORK_RECOVERY_ATTEMPTS")
            && let Ok(count) = attempts.parse::<u32>()
        {
            config.adaptive.network_recovery_attempts = count;
        }

        if let Ok(attempts) = std::env::var("MARQUEE_MEDIA_RECOVERY_ATTEMPTS")
            && let Ok(count) = attempts.parse::<u32>()
        {
            config.adaptive.media_recovery_attempts = count;
        }

        config
    }

    /// Creates a configuration that never starts playback on its own.
    pub fn without_autoplay() -> Self {
        Self {
            adaptive: AdaptiveConfig {
                autoplay: false,
                ..Default::default()
            },
            native: NativeConfig { autoplay: false },
        }
    }

    /// Caps every recovery budget at `MAX_RECOVERY_ATTEMPTS`, warning for each one lowered.
    pub fn bounded(mut self) -> Self {
        let budgets = [
            ("network", &mut self.adaptive.network_recovery_attempts),
            ("media", &mut self.adaptive.media_recovery_attempts),
        ];

        for (category, attempts) in budgets {
            if *attempts > MAX_RECOVERY_ATTEMPTS {
                warn!(
                    category,
                    requested = *attempts,
                    limit = MAX_RECOVERY_ATTEMPTS,
                    "Recovery budget above limit, clamping"
                );
                *attempts = MAX_RECOVERY_ATTEMPTS;
            }
        }

        self
    }

    /// Checks that recovery stays bounded.
    ///
    /// # Errors
    /// - `MarqueeError::Configuration` - A recovery budget exceeds `MAX_RECOVERY_ATTEMPTS`
    pub fn validate(&self) -> Result<(), MarqueeError> {
        let budgets = [
            ("network", self.adaptive.network_recovery_attempts),
            ("media", self.adaptive.media_recovery_attempts),
        ];

        for (category, attempts) in budgets {
            if attempts > MAX_RECOVERY_ATTEMPTS {
                return Err(MarqueeError::Configuration {
                    reason: format!(
                        "{category} recovery attempts {attempts} exceeds limit of {MAX_RECOVERY_ATTEMPTS}"
                    ),
                });
            }
        }

        Ok(())
    }
}
