use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid simulation config: {0}")]
    Invalid(String),
}

/// How the scheduler's `time` cursor moves from one tick to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    /// Advance by one nominal step per tick.
    #[default]
    Tick,
    /// Take the time straight from the host clock.
    #[serde(alias = "time", alias = "wall-clock")]
    Wall,
    /// Accumulate `fixed_step` per tick regardless of the clock.
    #[serde(alias = "fixed-step")]
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    #[default]
    Float,
    HalfFloat,
    UnsignedByte,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    pub version: u32,
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_textures_max")]
    pub textures_max: usize,
    #[serde(default = "default_channels")]
    pub channels_max: usize,
    #[serde(default = "default_channels")]
    pub channels_min: usize,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub timing: TimingMode,
    #[serde(
        default,
        deserialize_with = "deserialize_step",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_step: Option<Duration>,
    #[serde(default)]
    pub size: SizeConfig,
    #[serde(default)]
    pub values: Vec<ValueConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SizeConfig {
    pub radius: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            radius: None,
            width: None,
            height: None,
            scale: default_scale(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValueConfig {
    pub name: String,
    pub channels: usize,
    #[serde(default)]
    pub derives: Vec<DeriveRef>,
}

/// A value named either by its position in `values` or by its `name`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ValueRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Index(index) => write!(f, "#{index}"),
            ValueRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// One entry of a value's `derives` list.
///
/// Accepted spellings:
///
/// - `"velocity"` or `1` for the latest state of a value,
/// - `[1, 0]` for `[ticks back, value index]`,
/// - `{ value = "velocity", past = 1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DeriveRef {
    Latest(ValueRef),
    Pair([usize; 2]),
    Past {
        value: ValueRef,
        #[serde(default)]
        past: usize,
    },
}

impl DeriveRef {
    fn parts(&self) -> (usize, ValueRef) {
        match self {
            DeriveRef::Latest(value) => (0, value.clone()),
            DeriveRef::Pair([past, value]) => (*past, ValueRef::Index(*value)),
            DeriveRef::Past { value, past } => (*past, value.clone()),
        }
    }
}

/// A derive entry with its target resolved to a value index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDerive {
    pub past: usize,
    pub value: usize,
}

fn default_steps() -> usize {
    2
}

fn default_textures_max() -> usize {
    1
}

fn default_channels() -> usize {
    4
}

fn default_scale() -> u32 {
    3
}

/// `fixed_step` as written in TOML: bare seconds or a humantime string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StepSpec {
    Seconds(f64),
    Text(String),
}

fn deserialize_step<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(spec) = Option::<StepSpec>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let step = match spec {
        StepSpec::Seconds(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            Duration::from_secs_f64(seconds)
        }
        StepSpec::Seconds(seconds) => {
            return Err(D::Error::custom(format!(
                "fixed_step must be a finite non-negative number of seconds; got {seconds}"
            )))
        }
        StepSpec::Text(text) => humantime::parse_duration(text.trim())
            .map_err(|err| D::Error::custom(format!("invalid fixed_step '{text}': {err}")))?,
    };
    Ok(Some(step))
}

impl SizeConfig {
    /// Texture extent in texels; `radius` beats `width`/`height`, which beat `scale`.
    pub fn extent(&self) -> (u32, u32) {
        let fallback = 1u32.checked_shl(self.scale).unwrap_or(u32::MAX);
        let width = self.radius.or(self.width).unwrap_or(fallback);
        let height = self.radius.or(self.height).unwrap_or(fallback);
        (width, height)
    }
}

impl SimConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SimConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Channel counts in declaration order, ready for packing.
    pub fn value_channels(&self) -> Vec<usize> {
        self.values.iter().map(|value| value.channels).collect()
    }

    pub fn value_index(&self, reference: &ValueRef) -> Option<usize> {
        match reference {
            ValueRef::Index(index) => (*index < self.values.len()).then_some(*index),
            ValueRef::Name(name) => self.values.iter().position(|value| &value.name == name),
        }
    }

    pub fn value_name(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|value| value.name.as_str())
    }

    /// Every value's derives with names resolved to indices.
    pub fn resolved_derives(&self) -> Result<Vec<Vec<ResolvedDerive>>, ConfigError> {
        self.values
            .iter()
            .map(|value| {
                value
                    .derives
                    .iter()
                    .map(|derive| {
                        let (past, target) = derive.parts();
                        let index = self.value_index(&target).ok_or_else(|| {
                            ConfigError::Invalid(format!(
                                "value '{}' derives from unknown value {target}",
                                value.name
                            ))
                        })?;
                        Ok(ResolvedDerive { past, value: index })
                    })
                    .collect()
            })
            .collect()
    }

    /// The fixed step in seconds, when `timing = "fixed"`.
    pub fn fixed_step_secs(&self) -> Option<f64> {
        self.fixed_step.map(|step| step.as_secs_f64())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.values.is_empty() {
            return Err(ConfigError::Invalid(
                "config must declare at least one value".into(),
            ));
        }

        if self.steps < 2 {
            return Err(ConfigError::Invalid(format!(
                "steps must be at least 2 to read a previous state; got {}",
                self.steps
            )));
        }

        if self.textures_max == 0 {
            return Err(ConfigError::Invalid("textures_max must be >= 1".into()));
        }

        if self.channels_max == 0 {
            return Err(ConfigError::Invalid("channels_max must be >= 1".into()));
        }

        if self.channels_min > self.channels_max {
            return Err(ConfigError::Invalid(format!(
                "channels_min ({}) may not exceed channels_max ({})",
                self.channels_min, self.channels_max
            )));
        }

        let (width, height) = self.size.extent();
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(
                "size dimensions must be greater than zero".into(),
            ));
        }
        if self.size.radius.is_none() && self.size.scale >= 32 {
            return Err(ConfigError::Invalid(format!(
                "size.scale {} is too large",
                self.size.scale
            )));
        }

        if self.timing == TimingMode::Fixed {
            match self.fixed_step {
                Some(step) if !step.is_zero() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "timing = \"fixed\" requires a non-zero fixed_step".into(),
                    ))
                }
            }
        }

        let mut names = BTreeSet::new();
        for value in &self.values {
            if value.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "values may not have an empty name".into(),
                ));
            }
            if !names.insert(value.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "value name '{}' is declared more than once",
                    value.name
                )));
            }
            if value.channels == 0 {
                return Err(ConfigError::Invalid(format!(
                    "value '{}' must use at least one channel",
                    value.name
                )));
            }
            if self.strict && value.channels > self.channels_max {
                return Err(ConfigError::Invalid(format!(
                    "value '{}' needs {} channels but a texture holds {}",
                    value.name, value.channels, self.channels_max
                )));
            }
        }

        for value in &self.values {
            for derive in &value.derives {
                let (past, target) = derive.parts();
                if self.value_index(&target).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "value '{}' derives from unknown value {target}",
                        value.name
                    )));
                }
                if past >= self.steps {
                    return Err(ConfigError::Invalid(format!(
                        "value '{}' reads {past} steps back but only {} steps are kept",
                        value.name, self.steps
                    )));
                }
            }
        }

        Ok(())
    }
}
