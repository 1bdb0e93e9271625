use std::fmt;

use gpgpu::{pass_channels, Plan, Sample, ValueId};
use serde::Serialize;
use simconfig::SimConfig;

/// Everything `stepplan plan` prints, in a shape that serializes cleanly.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub steps: usize,
    pub textures_max: usize,
    pub channels_max: usize,
    pub width: u32,
    pub height: u32,
    pub values: Vec<ValueReport>,
    pub textures: Vec<TextureReport>,
    pub passes: Vec<PassReport>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValueReport {
    pub index: usize,
    pub name: String,
    pub channels: usize,
    pub texture: Option<usize>,
    pub pass: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TextureReport {
    pub index: usize,
    pub values: Vec<usize>,
    pub channels: usize,
    pub pass: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PassReport {
    pub index: usize,
    pub textures: Vec<usize>,
    /// Channels allocated per attachment.
    pub channels: usize,
    pub samples: Vec<Sample>,
    pub reads: Vec<ReadReport>,
}

#[derive(Debug, Serialize)]
pub struct ReadReport {
    pub value: usize,
    pub name: String,
    pub samples: Vec<usize>,
}

impl PlanReport {
    pub fn new(config: &SimConfig, plan: &Plan) -> Self {
        let groups = plan.groups();
        let samples = plan.samples();
        let options = plan.options();
        let limits = groups.limits();

        let values = config
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| ValueReport {
                index,
                name: value.name.clone(),
                channels: value.channels,
                texture: groups.value_to_texture(ValueId(index)).map(|t| t.0),
                pass: groups.value_to_pass(ValueId(index)).map(|p| p.0),
            })
            .collect();

        let textures = groups
            .textures()
            .map(|(texture, members)| TextureReport {
                index: texture.0,
                values: members.iter().map(|value| value.0).collect(),
                channels: groups.texture_channels(texture),
                pass: groups.texture_to_pass(texture).map(|p| p.0),
            })
            .collect();

        let passes = groups
            .passes()
            .map(|(pass, span)| PassReport {
                index: pass.0,
                textures: span.iter().map(|texture| texture.0).collect(),
                channels: pass_channels(groups, pass, options.channels_min),
                samples: samples.samples(pass).to_vec(),
                reads: samples
                    .reads()
                    .pass(pass)
                    .map(|(value, slots)| ReadReport {
                        value: value.0,
                        name: config.value_name(value.0).unwrap_or_default().to_string(),
                        samples: slots.to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            steps: plan.depth().get(),
            textures_max: limits.textures_max,
            channels_max: limits.channels_max,
            width: options.extent.width,
            height: options.extent.height,
            values,
            textures,
            passes,
            warnings: groups
                .warnings()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} steps of {}x{} texels, up to {} textures of {} channels per pass",
            self.steps, self.width, self.height, self.textures_max, self.channels_max
        )?;

        writeln!(f, "Values:")?;
        for value in &self.values {
            let placement = match (value.texture, value.pass) {
                (Some(texture), Some(pass)) => format!("texture {texture}, pass {pass}"),
                _ => "dropped".to_string(),
            };
            writeln!(
                f,
                "  {:>3} {:<20} channels={} {}",
                value.index, value.name, value.channels, placement
            )?;
        }

        writeln!(f, "Textures:")?;
        for texture in &self.textures {
            writeln!(
                f,
                "  {:>3} values={:?} channels={}",
                texture.index, texture.values, texture.channels
            )?;
        }

        writeln!(f, "Passes:")?;
        for pass in &self.passes {
            writeln!(
                f,
                "  {:>3} textures={:?} attachment_channels={}",
                pass.index, pass.textures, pass.channels
            )?;
            for (index, sample) in pass.samples.iter().enumerate() {
                writeln!(
                    f,
                    "      sample {index}: {} ticks back from {}",
                    sample.offset, sample.texture
                )?;
            }
            for read in &pass.reads {
                writeln!(
                    f,
                    "      value {} ({}) reads samples {:?}",
                    read.value, read.name, read.samples
                )?;
            }
        }

        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
version = 1
textures_max = 2

[[values]]
name = "position"
channels = 2
derives = ["velocity", "position"]

[[values]]
name = "velocity"
channels = 4

[[values]]
name = "life"
channels = 1
derives = ["position", { value = "velocity", past = 1 }]

[[values]]
name = "spawn"
channels = 2
derives = ["life"]
"#;

    #[test]
    fn reports_layout_and_reads() {
        let config = SimConfig::from_toml_str(CONFIG).unwrap();
        let plan = Plan::from_config(&config).unwrap();
        let report = PlanReport::new(&config, &plan);

        let textures: Vec<_> = report.textures.iter().map(|t| t.values.clone()).collect();
        assert_eq!(textures, vec![vec![0], vec![1], vec![2, 3]]);
        let passes: Vec<_> = report.passes.iter().map(|p| p.textures.clone()).collect();
        assert_eq!(passes, vec![vec![0, 1], vec![2]]);
        assert_eq!(report.passes[0].samples.len(), 2);
        assert_eq!(report.passes[1].samples.len(), 3);
        assert_eq!(report.values[3].pass, Some(1));

        let text = report.to_string();
        assert!(text.contains("position"));
        assert!(text.contains("value 2 (life) reads samples [0, 1]"));
        assert_eq!(report.passes[1].reads[1].name, "spawn");
        assert_eq!(report.textures_max, 2);
    }
}
