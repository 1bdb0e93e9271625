//! Packs an ordered list of values into texture groups and draw passes.
//!
//! Each value asks for a number of co-dependent channels that must be written
//! together. The packer walks the values once, left to right, filling a texture
//! until the next value would overflow its channels, and filling a pass until it
//! holds `textures_max` textures. Order is never changed: downstream shader code
//! relies on exactly this greedy layout.
//!
//! ```text
//!   pack([2, 4, 1, 2], textures_max = 2, channels_max = 4)
//!
//!   values    0:2   1:4   2:1 3:2
//!   textures  [0]   [1]   [2, 3]
//!   passes    [0,   1]    [2]
//! ```
//!
//! Texture group 0 and pass 0 exist before any value is seen, so both indices
//! are always valid even for an empty or fully dropped input.

use std::fmt;
use std::ops::Range;

use crate::error::{ConfigurationError, InvariantViolation};
use crate::ids::{PassId, TextureGroupId, ValueId};

/// Capacity limits of the target pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Render targets a single pass can write.
    pub textures_max: usize,
    /// Channels a single texture holds.
    pub channels_max: usize,
}

/// A value that could not fit in any texture and was left out of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityWarning {
    pub value: ValueId,
    pub channels: usize,
    pub channels_max: usize,
}

impl fmt::Display for CapacityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} needs {} channels but a texture holds {}; it was dropped",
            self.value, self.channels, self.channels_max
        )
    }
}

/// Contiguous run of texture groups drawn by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSpan {
    start: usize,
    end: usize,
}

impl TextureSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, texture: TextureGroupId) -> bool {
        (self.start..self.end).contains(&texture.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = TextureGroupId> + Clone {
        (self.start..self.end).map(TextureGroupId)
    }
}

/// Result of [`pack`]: textures, passes, and their reverse maps.
#[derive(Debug, Clone)]
pub struct Groups {
    channels: Vec<usize>,
    limits: Limits,
    /// Packed values, concatenated in texture order.
    members: Vec<ValueId>,
    /// Range of `members` held by each texture.
    textures: Vec<Range<usize>>,
    /// Textures drawn by each pass.
    passes: Vec<TextureSpan>,
    value_to_texture: Vec<Option<TextureGroupId>>,
    value_to_pass: Vec<Option<PassId>>,
    texture_to_pass: Vec<PassId>,
    warnings: Vec<CapacityWarning>,
}

/// Greedily groups `values` (channel counts, in order) into textures and passes.
///
/// Values wider than `channels_max` are dropped and reported through
/// [`Groups::warnings`] as well as a `tracing` warning.
pub fn pack(
    values: &[usize],
    textures_max: usize,
    channels_max: usize,
) -> Result<Groups, ConfigurationError> {
    if textures_max == 0 {
        return Err(ConfigurationError::ZeroTexturesMax);
    }
    if channels_max == 0 {
        return Err(ConfigurationError::ZeroChannelsMax);
    }

    let mut members = Vec::with_capacity(values.len());
    let mut textures = vec![0..0];
    let mut passes = vec![TextureSpan { start: 0, end: 1 }];
    let mut texture_to_pass = vec![PassId(0)];
    let mut value_to_texture = Vec::with_capacity(values.len());
    let mut value_to_pass = Vec::with_capacity(values.len());
    let mut warnings = Vec::new();
    let mut sum = 0;

    for (index, &channels) in values.iter().enumerate() {
        let value = ValueId(index);
        if channels == 0 {
            return Err(ConfigurationError::EmptyValue(value));
        }
        if channels > channels_max {
            tracing::warn!(
                value = index,
                channels,
                channels_max,
                "value exceeds the channels available in a texture; dropping it"
            );
            warnings.push(CapacityWarning {
                value,
                channels,
                channels_max,
            });
            value_to_texture.push(None);
            value_to_pass.push(None);
            continue;
        }

        sum += channels;
        if sum > channels_max {
            sum = channels;
            let texture = textures.len();
            textures.push(members.len()..members.len());

            let last = passes.len() - 1;
            if passes[last].len() >= textures_max {
                passes.push(TextureSpan {
                    start: texture,
                    end: texture,
                });
            }
            let pass = passes.len() - 1;
            passes[pass].end = texture + 1;
            texture_to_pass.push(PassId(pass));
        }

        let texture = textures.len() - 1;
        members.push(value);
        textures[texture].end = members.len();
        value_to_texture.push(Some(TextureGroupId(texture)));
        value_to_pass.push(Some(texture_to_pass[texture]));
    }

    let groups = Groups {
        channels: values.to_vec(),
        limits: Limits {
            textures_max,
            channels_max,
        },
        members,
        textures,
        passes,
        value_to_texture,
        value_to_pass,
        texture_to_pass,
        warnings,
    };

    tracing::debug!(
        values = values.len(),
        textures = groups.texture_count(),
        passes = groups.pass_count(),
        dropped = groups.warnings.len(),
        "packed values into textures and passes"
    );

    Ok(groups)
}

impl Groups {
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Number of values given to [`pack`], dropped ones included.
    pub fn value_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self, value: ValueId) -> Option<usize> {
        self.channels.get(value.0).copied()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Values held by a texture group, in order.
    pub fn texture(&self, texture: TextureGroupId) -> Option<&[ValueId]> {
        let range = self.textures.get(texture.0)?;
        Some(&self.members[range.clone()])
    }

    pub fn pass(&self, pass: PassId) -> Option<TextureSpan> {
        self.passes.get(pass.0).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureGroupId, &[ValueId])> + '_ {
        self.textures
            .iter()
            .enumerate()
            .map(|(index, range)| (TextureGroupId(index), &self.members[range.clone()]))
    }

    pub fn passes(&self) -> impl Iterator<Item = (PassId, TextureSpan)> + '_ {
        self.passes
            .iter()
            .enumerate()
            .map(|(index, span)| (PassId(index), *span))
    }

    /// Values drawn by a pass, in texture then member order.
    pub fn pass_values(&self, pass: PassId) -> impl Iterator<Item = ValueId> + '_ {
        self.pass(pass)
            .into_iter()
            .flat_map(|span| span.iter())
            .flat_map(move |texture| self.texture(texture).unwrap_or(&[]).iter().copied())
    }

    pub fn value_to_texture(&self, value: ValueId) -> Option<TextureGroupId> {
        self.value_to_texture.get(value.0).copied().flatten()
    }

    pub fn value_to_pass(&self, value: ValueId) -> Option<PassId> {
        self.value_to_pass.get(value.0).copied().flatten()
    }

    pub fn texture_to_pass(&self, texture: TextureGroupId) -> Option<PassId> {
        self.texture_to_pass.get(texture.0).copied()
    }

    /// Summed channels of the values held by a texture group.
    pub fn texture_channels(&self, texture: TextureGroupId) -> usize {
        self.texture(texture)
            .unwrap_or(&[])
            .iter()
            .filter_map(|value| self.channels(*value))
            .sum()
    }

    /// Values that were left out of the layout.
    pub fn warnings(&self) -> &[CapacityWarning] {
        &self.warnings
    }

    pub fn is_dropped(&self, value: ValueId) -> bool {
        value.0 < self.value_count() && self.value_to_texture(value).is_none()
    }

    /// Nested `textures[t] = [value, ...]` view.
    pub fn texture_lists(&self) -> Vec<Vec<usize>> {
        self.textures()
            .map(|(_, values)| values.iter().map(|value| value.0).collect())
            .collect()
    }

    /// Nested `passes[p] = [texture, ...]` view.
    pub fn pass_lists(&self) -> Vec<Vec<usize>> {
        self.passes()
            .map(|(_, span)| span.iter().map(|texture| texture.0).collect())
            .collect()
    }

    /// Re-checks the capacity limits of every group.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        for (texture, _) in self.textures() {
            let channels = self.texture_channels(texture);
            if channels > self.limits.channels_max {
                return Err(InvariantViolation::TextureOverCapacity {
                    texture,
                    channels,
                    channels_max: self.limits.channels_max,
                });
            }
        }
        for (pass, span) in self.passes() {
            if span.len() > self.limits.textures_max {
                return Err(InvariantViolation::PassOverCapacity {
                    pass,
                    textures: span.len(),
                    textures_max: self.limits.textures_max,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn layout(values: &[usize], textures_max: usize, channels_max: usize) -> Groups {
        pack(values, textures_max, channels_max).expect("pack")
    }

    #[test]
    fn one_texture_per_pass() {
        let groups = layout(&[2, 4, 1], 1, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn exact_fill_closes_the_texture() {
        let groups = layout(&[4, 2, 1], 1, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1, 2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0], vec![1]]);

        let groups = layout(&[2, 2, 1], 4, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0, 1], vec![2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0, 1]]);
    }

    #[test]
    fn several_textures_share_a_pass() {
        let groups = layout(&[4, 2, 1], 4, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1, 2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0, 1]]);

        let groups = layout(&[2, 4, 1], 4, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn passes_split_at_textures_max() {
        let groups = layout(&[2, 4, 1], 2, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0, 1], vec![2]]);

        let groups = layout(&[2, 4, 1, 2], 2, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0], vec![1], vec![2, 3]]);
        assert_eq!(groups.pass_lists(), vec![vec![0, 1], vec![2]]);

        let groups = layout(&[2, 4, 1, 4], 2, 4);
        assert_eq!(
            groups.texture_lists(),
            vec![vec![0], vec![1], vec![2], vec![3]]
        );
        assert_eq!(groups.pass_lists(), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn reverse_maps_follow_the_layout() {
        let groups = layout(&[2, 4, 1, 2], 2, 4);
        let textures: Vec<_> = (0..4)
            .map(|v| groups.value_to_texture(ValueId(v)).unwrap().0)
            .collect();
        let passes: Vec<_> = (0..4)
            .map(|v| groups.value_to_pass(ValueId(v)).unwrap().0)
            .collect();
        assert_eq!(textures, vec![0, 1, 2, 2]);
        assert_eq!(passes, vec![0, 0, 1, 1]);
        assert_eq!(groups.texture_to_pass(TextureGroupId(2)), Some(PassId(1)));
        let values: Vec<_> = groups.pass_values(PassId(1)).collect();
        assert_eq!(values, vec![ValueId(2), ValueId(3)]);
    }

    #[test]
    fn oversized_values_are_dropped_with_a_warning() {
        let groups = layout(&[2, 5, 2], 1, 4);
        assert_eq!(groups.texture_lists(), vec![vec![0, 2]]);
        assert_eq!(groups.pass_lists(), vec![vec![0]]);
        assert!(groups.is_dropped(ValueId(1)));
        assert!(!groups.is_dropped(ValueId(2)));
        assert_eq!(
            groups.warnings(),
            &[CapacityWarning {
                value: ValueId(1),
                channels: 5,
                channels_max: 4,
            }]
        );
    }

    #[test]
    fn empty_input_keeps_the_seeded_containers() {
        let groups = layout(&[], 2, 4);
        assert_eq!(groups.texture_lists(), vec![Vec::<usize>::new()]);
        assert_eq!(groups.pass_lists(), vec![vec![0]]);
        assert_eq!(groups.texture_to_pass(TextureGroupId(0)), Some(PassId(0)));
    }

    #[test]
    fn rejects_degenerate_limits_and_values() {
        assert_eq!(
            pack(&[1], 0, 4).unwrap_err(),
            ConfigurationError::ZeroTexturesMax
        );
        assert_eq!(
            pack(&[1], 1, 0).unwrap_err(),
            ConfigurationError::ZeroChannelsMax
        );
        assert_eq!(
            pack(&[1, 0], 1, 4).unwrap_err(),
            ConfigurationError::EmptyValue(ValueId(1))
        );
    }

    #[test]
    fn random_layouts_hold_their_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let channels_max = rng.gen_range(1..=8);
            let textures_max = rng.gen_range(1..=4);
            let len = rng.gen_range(0..24);
            let values: Vec<usize> = (0..len).map(|_| rng.gen_range(1..=channels_max)).collect();
            let groups = layout(&values, textures_max, channels_max);

            groups.verify().expect("capacity invariants");
            assert!(groups.warnings().is_empty());

            let flattened: Vec<usize> = groups.texture_lists().concat();
            assert_eq!(flattened, (0..len).collect::<Vec<_>>());

            let pass_order: Vec<usize> = groups.pass_lists().concat();
            assert_eq!(pass_order, (0..groups.texture_count()).collect::<Vec<_>>());

            for v in 0..len {
                let value = ValueId(v);
                let texture = groups.value_to_texture(value).unwrap();
                assert!(groups.texture(texture).unwrap().contains(&value));
                let pass = groups.value_to_pass(value).unwrap();
                assert_eq!(groups.texture_to_pass(texture), Some(pass));
                assert!(groups.pass(pass).unwrap().contains(texture));
            }
        }
    }
}
