use simconfig::SimConfig;

use crate::error::{ConfigurationError, SetupError};
use crate::groups::{pack, Groups};
use crate::history::HistoryDepth;
use crate::ids::ValueId;
use crate::inputs::{read_lag, UniformBinder};
use crate::resources::{DataType, Extent, History, TargetFactory, TextureFormat};
use crate::samples::{resolve, Derive, SampleMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    pub textures_max: usize,
    pub channels_max: usize,
    pub channels_min: usize,
    pub steps: usize,
    pub extent: Extent,
    pub data_type: DataType,
    /// Fail instead of dropping values wider than a texture.
    pub strict: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            textures_max: 1,
            channels_max: 4,
            channels_min: 4,
            steps: 2,
            extent: Extent {
                width: 8,
                height: 8,
            },
            data_type: DataType::Float,
            strict: false,
        }
    }
}

/// A validated schedule: packed groups, per-pass samples, and history depth.
///
/// Everything that can go wrong with a simulation's layout is caught while
/// building a plan; stepping through it afterwards cannot fail.
#[derive(Debug, Clone)]
pub struct Plan {
    groups: Groups,
    samples: SampleMap,
    depth: HistoryDepth,
    options: PlanOptions,
}

impl Plan {
    pub fn new(
        channels: &[usize],
        derives: &[Vec<Derive>],
        options: PlanOptions,
    ) -> Result<Self, SetupError> {
        let depth = HistoryDepth::new(options.steps)?;
        if options.channels_min > options.channels_max {
            return Err(ConfigurationError::ChannelsMinAboveMax {
                channels_min: options.channels_min,
                channels_max: options.channels_max,
            }
            .into());
        }
        Extent::new(options.extent.width, options.extent.height)?;

        let groups = pack(channels, options.textures_max, options.channels_max)?;
        if options.strict {
            if let Some(warning) = groups.warnings().first() {
                return Err(ConfigurationError::OversizedValue {
                    value: warning.value,
                    channels: warning.channels,
                    channels_max: warning.channels_max,
                }
                .into());
            }
        }
        groups.verify()?;

        let samples = resolve(derives, &groups)?;
        for (pass, pass_samples) in samples.passes() {
            for sample in pass_samples {
                let lag = read_lag(&groups, pass, sample.texture);
                depth.check_offset(sample.offset, lag).map_err(|required| {
                    ConfigurationError::InsufficientHistory {
                        pass,
                        texture: sample.texture,
                        offset: sample.offset,
                        required,
                        depth: depth.get(),
                    }
                })?;
            }
        }

        tracing::info!(
            values = channels.len(),
            textures = groups.texture_count(),
            passes = groups.pass_count(),
            samples = samples.sample_count(),
            steps = depth.get(),
            "simulation plan ready"
        );

        Ok(Self {
            groups,
            samples,
            depth,
            options,
        })
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, SetupError> {
        let (width, height) = config.size.extent();
        let options = PlanOptions {
            textures_max: config.textures_max,
            channels_max: config.channels_max,
            channels_min: config.channels_min,
            steps: config.steps,
            extent: Extent::new(width, height)?,
            data_type: config.data_type,
            strict: config.strict,
        };
        let derives = config_derives(config)?;
        Self::new(&config.value_channels(), &derives, options)
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    pub fn samples(&self) -> &SampleMap {
        &self.samples
    }

    pub fn depth(&self) -> HistoryDepth {
        self.depth
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn texture_format(&self) -> TextureFormat {
        TextureFormat {
            extent: self.options.extent,
            data_type: self.options.data_type,
            channels_min: self.options.channels_min,
        }
    }

    /// Creates every texture and target of the ring through `factory`.
    pub fn allocate<F>(&self, factory: &mut F) -> Result<History<F::Texture, F::Target>, SetupError>
    where
        F: TargetFactory,
    {
        History::allocate(&self.groups, self.depth, self.texture_format(), factory)
    }

    pub fn binder(&self) -> UniformBinder<'_> {
        UniformBinder::new(&self.groups, &self.samples, self.depth)
    }
}

fn config_derives(config: &SimConfig) -> Result<Vec<Vec<Derive>>, SetupError> {
    let resolved = config.resolved_derives()?;
    Ok(resolved
        .into_iter()
        .map(|derives| {
            derives
                .into_iter()
                .map(|derive| match derive.past {
                    0 => Derive::Latest(ValueId(derive.value)),
                    ticks => Derive::Past {
                        ticks,
                        value: ValueId(derive.value),
                    },
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PassId, TextureGroupId};
    use crate::resources::RecordingFactory;

    const VERLET: &str = r#"
version = 1
steps = 3
textures_max = 2

[[values]]
name = "position"
channels = 3
derives = ["position", { value = "position", past = 1 }, "acceleration", "life"]

[[values]]
name = "life"
channels = 1
derives = ["life"]

[[values]]
name = "acceleration"
channels = 3
derives = ["acceleration", "life"]
"#;

    fn options(steps: usize, textures_max: usize) -> PlanOptions {
        PlanOptions {
            steps,
            textures_max,
            ..PlanOptions::default()
        }
    }

    #[test]
    fn builds_plan_from_config() {
        let config = SimConfig::from_toml_str(VERLET).unwrap();
        let plan = Plan::from_config(&config).unwrap();
        assert_eq!(plan.groups().texture_lists(), vec![vec![0, 1], vec![2]]);
        assert_eq!(plan.groups().pass_lists(), vec![vec![0, 1]]);
        assert_eq!(plan.depth().get(), 3);
        assert_eq!(plan.samples().samples(PassId(0)).len(), 3);
        assert_eq!(plan.samples().max_offset(), Some(1));

        let history = plan.allocate(&mut RecordingFactory).unwrap();
        assert_eq!(history.size().textures, 6);
        assert_eq!(history.size().passes, 3);
    }

    #[test]
    fn rejects_reads_past_the_kept_history() {
        // two steps: one being written, one readable
        let derives = vec![vec![Derive::Past {
            ticks: 1,
            value: ValueId(0),
        }]];
        let err = Plan::new(&[4], &derives, options(2, 1)).unwrap_err();
        assert!(matches!(
            err,
            SetupError::Configuration(ConfigurationError::InsufficientHistory {
                pass: PassId(0),
                texture: TextureGroupId(0),
                offset: 1,
                required: 3,
                depth: 2,
            })
        ));
        assert!(Plan::new(&[4], &derives, options(3, 1)).is_ok());
    }

    #[test]
    fn rejects_offsets_that_overflow_the_depth_check() {
        let derives = vec![vec![Derive::Past {
            ticks: usize::MAX,
            value: ValueId(0),
        }]];
        let err = Plan::new(&[4], &derives, options(3, 1)).unwrap_err();
        assert!(matches!(
            err,
            SetupError::Configuration(ConfigurationError::InsufficientHistory {
                offset: usize::MAX,
                required: usize::MAX,
                depth: 3,
                ..
            })
        ));
    }

    #[test]
    fn same_tick_reads_need_one_step_less() {
        // value 1 lives in pass 1 and reads pass 0's output one tick back
        let derives = vec![
            vec![],
            vec![Derive::Past {
                ticks: 1,
                value: ValueId(0),
            }],
        ];
        assert!(Plan::new(&[4, 4], &derives, options(2, 1)).is_ok());
    }

    #[test]
    fn strict_plans_refuse_to_drop_values() {
        let strict = PlanOptions {
            strict: true,
            ..PlanOptions::default()
        };
        let err = Plan::new(&[2, 6], &[], strict).unwrap_err();
        assert!(matches!(
            err,
            SetupError::Configuration(ConfigurationError::OversizedValue {
                value: ValueId(1),
                channels: 6,
                channels_max: 4,
            })
        ));

        let relaxed = Plan::new(&[2, 6], &[], PlanOptions::default()).unwrap();
        assert_eq!(relaxed.groups().warnings().len(), 1);
    }

    #[test]
    fn rejects_inconsistent_options() {
        let err = Plan::new(
            &[1],
            &[],
            PlanOptions {
                channels_min: 8,
                ..PlanOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SetupError::Configuration(ConfigurationError::ChannelsMinAboveMax { .. })
        ));
        assert!(matches!(
            Plan::new(&[1], &[], options(0, 1)).unwrap_err(),
            SetupError::Configuration(ConfigurationError::HistoryTooShallow { .. })
        ));
    }
}
