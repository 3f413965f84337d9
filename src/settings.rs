//! Effect parameters handed to the pipeline on every invocation.

use anyhow::{anyhow, bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;

/// Canonical 4x4 Bayer threshold matrix, values 0..=15.
pub const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Opaque fill painted before the base image (`#0a0a0a`).
pub const BACKGROUND_RGBA: [u8; 4] = [10, 10, 10, 255];

pub const PERCENT_MAX: u32 = 100;
pub const LOGO_SIZE_MIN: u32 = 10;
pub const LOGO_SIZE_MAX: u32 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherType {
    #[default]
    None,
    Threshold,
    #[serde(alias = "bayer")]
    Ordered,
    #[serde(alias = "fs")]
    FloydSteinberg,
}

impl DitherType {
    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "threshold" => Ok(Self::Threshold),
            "ordered" | "bayer" => Ok(Self::Ordered),
            "floyd-steinberg" | "floyd_steinberg" | "fs" => Ok(Self::FloydSteinberg),
            _ => Err(anyhow!(CodedError::usage(
                "INVALID_DITHER_TYPE",
                format!("invalid dither type '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": ["none", "threshold", "ordered", "floyd-steinberg"]
            })))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Threshold => "threshold",
            Self::Ordered => "ordered",
            Self::FloydSteinberg => "floyd-steinberg",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    #[serde(alias = "centre")]
    Center,
}

impl LogoPosition {
    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" | "centre" => Ok(Self::Center),
            _ => Err(anyhow!(CodedError::usage(
                "INVALID_LOGO_POSITION",
                format!("invalid logo position '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": ["top-left", "top-right", "bottom-left", "bottom-right", "center"]
            })))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Center => "center",
        }
    }
}

/// Image effect parameters. Percent-style fields are 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ImageSettings {
    pub dither_type: DitherType,
    /// `true` keeps colour, `false` collapses to luma.
    pub color_mode: bool,
    pub dither_intensity: u32,
    pub pixelate: u32,
    pub noise: u32,
    pub glitch: u32,
    pub rgb_shift: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            dither_type: DitherType::None,
            color_mode: true,
            dither_intensity: 50,
            pixelate: 0,
            noise: 0,
            glitch: 0,
            rgb_shift: 0,
        }
    }
}

impl ImageSettings {
    /// Strict range check used for look files and CLI input.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("dither_intensity", self.dither_intensity),
            ("pixelate", self.pixelate),
            ("noise", self.noise),
            ("glitch", self.glitch),
            ("rgb_shift", self.rgb_shift),
        ] {
            if value > PERCENT_MAX {
                bail!("image.{name} must be within 0..={PERCENT_MAX}, got {value}");
            }
        }
        Ok(())
    }

    /// Same settings with every numeric field clamped into range.
    pub fn normalized(self) -> Self {
        Self {
            dither_intensity: self.dither_intensity.min(PERCENT_MAX),
            pixelate: self.pixelate.min(PERCENT_MAX),
            noise: self.noise.min(PERCENT_MAX),
            glitch: self.glitch.min(PERCENT_MAX),
            rgb_shift: self.rgb_shift.min(PERCENT_MAX),
            ..self
        }
    }

    pub fn apply(&mut self, update: SettingUpdate) {
        match update {
            SettingUpdate::DitherType(value) => self.dither_type = value,
            SettingUpdate::ColorMode(value) => self.color_mode = value,
            SettingUpdate::DitherIntensity(value) => self.dither_intensity = value,
            SettingUpdate::Pixelate(value) => self.pixelate = value,
            SettingUpdate::Noise(value) => self.noise = value,
            SettingUpdate::Glitch(value) => self.glitch = value,
            SettingUpdate::RgbShift(value) => self.rgb_shift = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogoSettings {
    /// Logo width as a percent of the target width, 10..=50.
    pub size: u32,
    pub opacity: u32,
    pub position: LogoPosition,
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            size: 20,
            opacity: 100,
            position: LogoPosition::BottomRight,
        }
    }
}

impl LogoSettings {
    pub fn validate(&self) -> Result<()> {
        if !(LOGO_SIZE_MIN..=LOGO_SIZE_MAX).contains(&self.size) {
            bail!(
                "logo.size must be within {LOGO_SIZE_MIN}..={LOGO_SIZE_MAX}, got {}",
                self.size
            );
        }
        if self.opacity > PERCENT_MAX {
            bail!(
                "logo.opacity must be within 0..={PERCENT_MAX}, got {}",
                self.opacity
            );
        }
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            size: self.size.clamp(LOGO_SIZE_MIN, LOGO_SIZE_MAX),
            opacity: self.opacity.min(PERCENT_MAX),
            ..self
        }
    }
}

/// A single parameter change coming from an interactive caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    DitherType(DitherType),
    ColorMode(bool),
    DitherIntensity(u32),
    Pixelate(u32),
    Noise(u32),
    Glitch(u32),
    RgbShift(u32),
}

impl SettingUpdate {
    pub fn touches_glitch(&self) -> bool {
        matches!(self, Self::Glitch(_))
    }
}

/// Seed for glitch slice geometry, owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlitchSeed(pub f64);

impl GlitchSeed {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Seed derived from the wall clock (milliseconds since the epoch).
    pub fn from_clock() -> Self {
        Self(chrono::Utc::now().timestamp_millis() as f64)
    }

    /// Seed after `update`: re-rolled only when the glitch amount itself changed.
    pub fn after_update<R: Rng + ?Sized>(self, update: &SettingUpdate, rng: &mut R) -> Self {
        if update.touches_glitch() {
            Self(rng.random::<f64>())
        } else {
            self
        }
    }
}

/// Everything an interactive caller holds between renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectState {
    pub image: ImageSettings,
    pub logo: LogoSettings,
    pub glitch_seed: GlitchSeed,
}

impl EffectState {
    pub fn new(glitch_seed: GlitchSeed) -> Self {
        Self {
            image: ImageSettings::default(),
            logo: LogoSettings::default(),
            glitch_seed,
        }
    }

    pub fn update_image<R: Rng + ?Sized>(&mut self, update: SettingUpdate, rng: &mut R) {
        self.image.apply(update);
        self.glitch_seed = self.glitch_seed.after_update(&update, rng);
    }
}
