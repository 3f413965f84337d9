use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::{ImageSettings, LogoSettings};

/// Largest output edge a look file may request.
pub const MAX_OUTPUT_EDGE: u32 = 16_384;

/// A saved set of effect parameters, stored as YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Look {
    #[serde(default)]
    pub image: ImageSettings,
    #[serde(default)]
    pub logo: LogoSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glitch_seed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl Look {
    pub fn validate(&self) -> Result<()> {
        self.image.validate()?;
        self.logo.validate()?;

        if let Some(seed) = self.glitch_seed {
            if !seed.is_finite() {
                bail!("glitch_seed must be a finite number, got {seed}");
            }
        }

        if let Some(output) = self.output {
            if output.width == 0 || output.height == 0 {
                bail!(
                    "output size must be positive, got {}x{}",
                    output.width,
                    output.height
                );
            }
            if output.width > MAX_OUTPUT_EDGE || output.height > MAX_OUTPUT_EDGE {
                bail!(
                    "output size {}x{} exceeds {MAX_OUTPUT_EDGE} on an edge",
                    output.width,
                    output.height
                );
            }
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize look")
    }
}

pub fn parse_look(contents: &str, origin: &Path) -> Result<Look> {
    let look: Look = serde_yaml::from_str(contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(
            "failed to parse yaml in {} at {}: {}",
            origin.display(),
            location,
            error
        )
    })?;

    look.validate()
        .with_context(|| format!("invalid look {}", origin.display()))?;
    Ok(look)
}
