//! Per-session generation settings and their bounds.
//!
//! Both numerics are newtypes that can only hold in-range, on-step values;
//! serde goes through the same checks, so a settings update that arrives
//! over HTTP is rejected before it touches the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("temperature must be between 0.1 and 1.0 in steps of 0.1, got {0}")]
    Temperature(f32),
    #[error("max tokens must be between 100 and 2000 in steps of 100, got {0}")]
    MaxTokens(u32),
}

/// Sampling temperature, 0.1 ..= 1.0 in steps of 0.1.
///
/// Stored as tenths so equality and the step rule are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Temperature(u8);

impl Temperature {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;
    pub const STEP: f32 = 0.1;
    pub const DEFAULT: f32 = 0.7;

    pub fn new(value: f32) -> Result<Self, SettingsError> {
        let scaled = value * 10.0;
        let tenths = scaled.round();
        if !value.is_finite() || (scaled - tenths).abs() > 1e-3 || !(1.0..=10.0).contains(&tenths) {
            return Err(SettingsError::Temperature(value));
        }
        Ok(Self(tenths as u8))
    }

    pub fn get(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(7)
    }
}

impl TryFrom<f32> for Temperature {
    type Error = SettingsError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Temperature> for f32 {
    fn from(t: Temperature) -> Self {
        t.get()
    }
}

/// Upper bound on generated tokens, 100 ..= 2000 in steps of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxTokens(u32);

impl MaxTokens {
    pub const MIN: u32 = 100;
    pub const MAX: u32 = 2000;
    pub const STEP: u32 = 100;
    pub const DEFAULT: u32 = 500;

    pub fn new(value: u32) -> Result<Self, SettingsError> {
        if !(Self::MIN..=Self::MAX).contains(&value) || value % Self::STEP != 0 {
            return Err(SettingsError::MaxTokens(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u32> for MaxTokens {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxTokens> for u32 {
    fn from(m: MaxTokens) -> Self {
        m.0
    }
}

/// Everything the user can tune from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub temperature: Temperature,
    pub max_tokens: MaxTokens,
    /// Show the model's `<think>` segment instead of only the final answer.
    pub show_thinking: bool,
}

impl Settings {
    pub fn new(temperature: f32, max_tokens: u32, show_thinking: bool) -> Result<Self, SettingsError> {
        Ok(Self {
            temperature: Temperature::new(temperature)?,
            max_tokens: MaxTokens::new(max_tokens)?,
            show_thinking,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: Temperature::default(),
            max_tokens: MaxTokens::default(),
            show_thinking: true,
        }
    }
}
