use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::snapshot::{SnapshotOptions, DEFAULT_ENTRY_PREFIX};

pub const DEFAULT_ENTRY_DISTANCE_M: f64 = 4.0;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

pub const SPEED_WALKING_MPS: f64 = 1.35;
pub const SPEED_ACCESSIBLE_MPS: f64 = 1.10;
pub const SPEED_GUIDED_MPS: f64 = 1.20;
pub const SPEED_DEFAULT_MPS: f64 = 1.30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Walking,
    Accessible,
    Guided,
    #[default]
    Default,
}

impl FromStr for Profile {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walking" | "walk" | "foot" => Ok(Profile::Walking),
            "accessible" | "wheelchair" => Ok(Profile::Accessible),
            "guided" => Ok(Profile::Guided),
            "default" | "" => Ok(Profile::Default),
            other => Err(NavError::invalid(format!("unknown profile '{}'", other))),
        }
    }
}

/// Average speeds in metres per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpeeds {
    pub walking: f64,
    pub accessible: f64,
    pub guided: f64,
    pub default: f64,
}

impl Default for ProfileSpeeds {
    fn default() -> Self {
        Self {
            walking: SPEED_WALKING_MPS,
            accessible: SPEED_ACCESSIBLE_MPS,
            guided: SPEED_GUIDED_MPS,
            default: SPEED_DEFAULT_MPS,
        }
    }
}

impl ProfileSpeeds {
    pub fn speed(&self, profile: Profile) -> f64 {
        match profile {
            Profile::Walking => self.walking,
            Profile::Accessible => self.accessible,
            Profile::Guided => self.guided,
            Profile::Default => self.default,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutingConfig {
    /// A start coordinate this close to its nearest node snaps to it directly.
    pub entry_distance_m: f64,
    /// Case-insensitive name prefix marking entry nodes.
    pub entry_prefix: String,
    pub max_page_size: u32,
    pub speeds: ProfileSpeeds,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            entry_distance_m: DEFAULT_ENTRY_DISTANCE_M,
            entry_prefix: DEFAULT_ENTRY_PREFIX.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            speeds: ProfileSpeeds::default(),
        }
    }
}

fn positive_f64(var: &str) -> Option<f64> {
    env::var(var).ok().and_then(|s| s.trim().parse::<f64>().ok()).filter(|v| v.is_finite() && *v > 0.0)
}

impl RoutingConfig {
    /// Load overrides from environment variables. Missing/invalid values fall back to defaults.
    ///
    /// Variables:
    /// - TRAILNAV_ENTRY_DISTANCE_M: metres, > 0
    /// - TRAILNAV_ENTRY_PREFIX: non-empty name prefix
    /// - TRAILNAV_MAX_PAGE_SIZE: integer >= 1
    /// - TRAILNAV_SPEED_WALKING / _ACCESSIBLE / _GUIDED / _DEFAULT: m/s, > 0
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = positive_f64("TRAILNAV_ENTRY_DISTANCE_M") {
            cfg.entry_distance_m = v;
        }
        if let Ok(v) = env::var("TRAILNAV_ENTRY_PREFIX") {
            if !v.trim().is_empty() {
                cfg.entry_prefix = v.trim().to_string();
            }
        }
        if let Some(n) = env::var("TRAILNAV_MAX_PAGE_SIZE").ok().and_then(|s| s.parse::<u32>().ok()) {
            if n >= 1 {
                cfg.max_page_size = n;
            }
        }
        if let Some(v) = positive_f64("TRAILNAV_SPEED_WALKING") {
            cfg.speeds.walking = v;
        }
        if let Some(v) = positive_f64("TRAILNAV_SPEED_ACCESSIBLE") {
            cfg.speeds.accessible = v;
        }
        if let Some(v) = positive_f64("TRAILNAV_SPEED_GUIDED") {
            cfg.speeds.guided = v;
        }
        if let Some(v) = positive_f64("TRAILNAV_SPEED_DEFAULT") {
            cfg.speeds.default = v;
        }
        cfg
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions { entry_prefix: self.entry_prefix.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_parse_case_insensitively() {
        assert_eq!("Walking".parse::<Profile>().unwrap(), Profile::Walking);
        assert_eq!("WHEELCHAIR".parse::<Profile>().unwrap(), Profile::Accessible);
        assert_eq!("guided".parse::<Profile>().unwrap(), Profile::Guided);
        assert_eq!("".parse::<Profile>().unwrap(), Profile::Default);
        assert!(matches!("bicycle".parse::<Profile>(), Err(NavError::InvalidInput(_))));
    }

    #[test]
    fn default_speeds() {
        let s = ProfileSpeeds::default();
        assert_eq!(s.speed(Profile::Walking), 1.35);
        assert_eq!(s.speed(Profile::Accessible), 1.10);
        assert_eq!(s.speed(Profile::Guided), 1.20);
        assert_eq!(s.speed(Profile::Default), 1.30);
    }

    #[test]
    fn routing_config_defaults() {
        let cfg = RoutingConfig::default();
        assert_eq!(cfg.entry_distance_m, 4.0);
        assert_eq!(cfg.entry_prefix, "ENTRY");
        assert_eq!(cfg.snapshot_options().entry_prefix, "ENTRY");
        assert_eq!(cfg.max_page_size, 100);
    }
}
