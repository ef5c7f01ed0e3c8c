use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::tool::{ParamBinding, ParamKey, Requirement, ToolSpec};
use crate::ConvertError;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex"));

/// AI upscale factor accepted by the upscaler endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpscaleFactor {
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
    #[serde(rename = "8x")]
    X8,
}

impl UpscaleFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpscaleFactor::X2 => "2x",
            UpscaleFactor::X4 => "4x",
            UpscaleFactor::X8 => "8x",
        }
    }

    /// Digits only, as used in output filenames (`_4x_upscaled.png`).
    pub fn digits(&self) -> &'static str {
        self.as_str().trim_end_matches('x')
    }
}

impl std::str::FromStr for UpscaleFactor {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().trim_end_matches('x') {
            "2" => Ok(UpscaleFactor::X2),
            "4" => Ok(UpscaleFactor::X4),
            "8" => Ok(UpscaleFactor::X8),
            _ => Err(ConvertError::InvalidParameter(format!(
                "Upscale factor must be 2x, 4x or 8x (got {})",
                s
            ))),
        }
    }
}

/// Options for one conversion run. Immutable for the duration of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConversionParameters {
    #[validate(range(min = 1, max = 100))]
    pub quality: Option<u8>,
    #[validate(range(min = 1))]
    pub width: Option<u32>,
    #[validate(range(min = 1))]
    pub height: Option<u32>,
    #[validate(range(min = 1, max = 500))]
    pub percentage: Option<u32>,
    pub mode: Option<String>,
    pub maintain_aspect_ratio: Option<bool>,
    pub upscale_factor: Option<UpscaleFactor>,
    pub background_type: Option<String>,
    pub background_color: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl ConversionParameters {
    fn value_for(&self, key: &ParamKey) -> Option<Value> {
        match key {
            ParamKey::Quality => self.quality.map(Value::from),
            ParamKey::Width => self.width.map(Value::from),
            ParamKey::Height => self.height.map(Value::from),
            ParamKey::Percentage => self.percentage.map(Value::from),
            ParamKey::Mode => self.mode.clone().map(Value::from),
            ParamKey::MaintainAspectRatio => self.maintain_aspect_ratio.map(Value::from),
            ParamKey::UpscaleFactor => self.upscale_factor.map(|f| Value::from(f.as_str())),
            ParamKey::BackgroundType => self.background_type.clone().map(Value::from),
            ParamKey::BackgroundColor => self.background_color.clone().map(Value::from),
            ParamKey::Extra(name) => self.extra.get(name).cloned().map(Value::from),
        }
    }

    /// Mode used for `when_mode` bindings: the explicit mode, else the default
    /// declared on the tool's mode binding.
    pub fn effective_mode(&self, bindings: &[ParamBinding]) -> Option<String> {
        self.mode.clone().or_else(|| {
            bindings
                .iter()
                .find(|b| b.key == ParamKey::Mode)
                .and_then(|b| b.default.as_ref())
                .and_then(|v| v.as_str().map(str::to_string))
        })
    }

    /// Check ranges and the tool's requirements. Runs before any request is made.
    pub fn check_against(&self, tool: &ToolSpec) -> Result<(), ConvertError> {
        self.validate()?;

        if let Some(color) = &self.background_color {
            if !HEX_COLOR_RE.is_match(color) {
                return Err(ConvertError::InvalidParameter(format!(
                    "Background color must look like #rrggbb (got {})",
                    color
                )));
            }
        }

        let mode = self.effective_mode(&tool.params);
        for binding in &tool.params {
            let needed = match &binding.required {
                Requirement::Optional => false,
                Requirement::Always => true,
                Requirement::WhenMode(modes) => mode
                    .as_deref()
                    .map(|m| modes.iter().any(|x| x == m))
                    .unwrap_or(false),
            };
            if needed && self.value_for(&binding.key).is_none() && binding.default.is_none() {
                return Err(ConvertError::InvalidParameter(format!(
                    "Please enter a valid {}",
                    binding.wire
                )));
            }
        }

        Ok(())
    }

    /// Resolve the ordered wire fields for a tool. Absent optional values are
    /// omitted; `when_mode` fields are only sent for their modes.
    pub fn wire_fields(&self, bindings: &[ParamBinding]) -> Vec<(String, Value)> {
        let mode = self.effective_mode(bindings);
        bindings
            .iter()
            .filter(|b| match &b.required {
                Requirement::WhenMode(modes) => mode
                    .as_deref()
                    .map(|m| modes.iter().any(|x| x == m))
                    .unwrap_or(false),
                _ => true,
            })
            .filter_map(|b| {
                self.value_for(&b.key)
                    .or_else(|| b.default.clone())
                    .map(|v| (b.wire.clone(), v))
            })
            .collect()
    }
}

/// Render a wire value as a multipart text field.
pub fn value_as_form_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
