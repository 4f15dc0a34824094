
use std::fmt;

use shared::error::{Error, Result};

/// Template ids are coded in 6 bits, which also caps the template count.
pub const MAX_TEMPLATE_ID: u8 = 64;
pub const MAX_TEMPLATES: usize = MAX_TEMPLATE_ID as usize;
/// dt_cnt_minus_one is coded in 5 bits.
pub const MAX_DECODE_TARGETS: usize = 32;
pub const MAX_CHAINS: usize = 32;

pub(crate) const MAX_TEMPLATE_FRAME_DIFF: u32 = 1 << 4;
pub(crate) const MAX_TEMPLATE_CHAIN_DIFF: u32 = (1 << 4) - 1;
pub(crate) const MAX_FRAME_DIFF: u32 = 1 << 12;
pub(crate) const MAX_FRAME_CHAIN_DIFF: u32 = (1 << 8) - 1;
pub(crate) const MAX_RENDER_DIMENSION: u32 = 1 << 16;

/// Per decode target forwarding hint, coded in 2 bits.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DecodeTargetIndication {
    #[default]
    NotPresent = 0,
    Discardable = 1,
    Switch = 2,
    Required = 3,
}

impl DecodeTargetIndication {
    pub fn symbol(&self) -> char {
        match self {
            DecodeTargetIndication::NotPresent => '-',
            DecodeTargetIndication::Discardable => 'D',
            DecodeTargetIndication::Switch => 'S',
            DecodeTargetIndication::Required => 'R',
        }
    }
}

impl TryFrom<char> for DecodeTargetIndication {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        match c {
            '-' => Ok(DecodeTargetIndication::NotPresent),
            'D' => Ok(DecodeTargetIndication::Discardable),
            'S' => Ok(DecodeTargetIndication::Switch),
            'R' => Ok(DecodeTargetIndication::Required),
            _ => Err(Error::DependencyDescriptorInvalidDtiSymbol(c)),
        }
    }
}

impl fmt::Display for DecodeTargetIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Parses one indication per character, e.g. `"SS-D"`.
pub fn parse_decode_target_indications(s: &str) -> Result<Vec<DecodeTargetIndication>> {
    s.chars().map(DecodeTargetIndication::try_from).collect()
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderResolution {
    pub width: u32,
    pub height: u32,
}

impl RenderResolution {
    pub fn new(width: u32, height: u32) -> Self {
        RenderResolution { width, height }
    }
}

/// FrameDependencyTemplate describes the typical dependencies of a frame on a
/// given spatial/temporal layer.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FrameDependencyTemplate {
    pub spatial_id: u8,
    pub temporal_id: u8,
    /// One entry per decode target.
    pub decode_target_indications: Vec<DecodeTargetIndication>,
    /// Positive backward frame number offsets of referenced frames.
    pub frame_diffs: Vec<u32>,
    /// One entry per chain.
    pub chain_diffs: Vec<u32>,
}

impl FrameDependencyTemplate {
    pub fn with_spatial_id(mut self, spatial_id: u8) -> Self {
        self.spatial_id = spatial_id;
        self
    }

    pub fn with_temporal_id(mut self, temporal_id: u8) -> Self {
        self.temporal_id = temporal_id;
        self
    }

    pub fn with_decode_target_indications(mut self, dtis: Vec<DecodeTargetIndication>) -> Self {
        self.decode_target_indications = dtis;
        self
    }

    pub fn with_frame_diffs(mut self, frame_diffs: Vec<u32>) -> Self {
        self.frame_diffs = frame_diffs;
        self
    }

    pub fn with_chain_diffs(mut self, chain_diffs: Vec<u32>) -> Self {
        self.chain_diffs = chain_diffs;
        self
    }

    fn same_layer(&self, other: &FrameDependencyTemplate) -> bool {
        self.spatial_id == other.spatial_id && self.temporal_id == other.temporal_id
    }
}

/// FrameDependencyStructure is the catalog of templates, decode targets and
/// chains that a stream of descriptors refers to.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FrameDependencyStructure {
    pub template_id_offset: u8,
    pub decode_target_count: usize,
    pub chain_count: usize,
    /// Chain index protecting each decode target. Unused when there are no
    /// chains.
    pub decode_target_protected_by: Vec<usize>,
    /// Either empty or one resolution per spatial layer.
    pub resolutions: Vec<RenderResolution>,
    pub templates: Vec<FrameDependencyTemplate>,
}

impl FrameDependencyStructure {
    /// Highest spatial id used by any template.
    pub fn max_spatial_id(&self) -> u8 {
        self.templates
            .iter()
            .map(|t| t.spatial_id)
            .max()
            .unwrap_or_default()
    }

    /// Checks that the structure can be expressed by the wire format.
    pub fn validate(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(Error::ErrDependencyDescriptorNoTemplates);
        }
        if self.templates.len() > MAX_TEMPLATES {
            return Err(Error::DependencyDescriptorTooManyTemplates(
                self.templates.len(),
                MAX_TEMPLATES,
            ));
        }
        if self.template_id_offset >= MAX_TEMPLATE_ID {
            return Err(Error::DependencyDescriptorTemplateIdOffset(
                self.template_id_offset,
                MAX_TEMPLATE_ID,
            ));
        }
        if self.decode_target_count == 0 || self.decode_target_count > MAX_DECODE_TARGETS {
            return Err(Error::DependencyDescriptorDecodeTargetCount(
                self.decode_target_count,
                MAX_DECODE_TARGETS,
            ));
        }
        if self.chain_count > self.decode_target_count {
            return Err(Error::DependencyDescriptorChainCount(
                self.chain_count,
                self.decode_target_count,
            ));
        }

        if self.chain_count > 0 {
            check_len(
                "decode_target_protected_by",
                self.decode_target_protected_by.len(),
                self.decode_target_count,
            )?;
            for (dt, &chain) in self.decode_target_protected_by.iter().enumerate() {
                if chain >= self.chain_count {
                    return Err(Error::DependencyDescriptorProtectedBy(
                        dt,
                        chain,
                        self.chain_count,
                    ));
                }
            }
        }

        let first = &self.templates[0];
        if first.spatial_id != 0 || first.temporal_id != 0 {
            return Err(Error::ErrDependencyDescriptorFirstTemplateLayer);
        }
        for (i, pair) in self.templates.windows(2).enumerate() {
            if next_layer_idc(&pair[0], &pair[1]).is_none() {
                return Err(Error::DependencyDescriptorInvalidLayerTransition(i + 1));
            }
        }

        for template in &self.templates {
            self.check_lengths(template)?;
            for &fdiff in &template.frame_diffs {
                check_range("template frame diff", fdiff, 1, MAX_TEMPLATE_FRAME_DIFF)?;
            }
            for &chain_diff in &template.chain_diffs {
                check_range("template chain diff", chain_diff, 0, MAX_TEMPLATE_CHAIN_DIFF)?;
            }
        }

        if !self.resolutions.is_empty() {
            check_len(
                "resolutions",
                self.resolutions.len(),
                self.max_spatial_id() as usize + 1,
            )?;
            for resolution in &self.resolutions {
                check_range("render width", resolution.width, 1, MAX_RENDER_DIMENSION)?;
                check_range("render height", resolution.height, 1, MAX_RENDER_DIMENSION)?;
            }
        }

        Ok(())
    }

    /// Checks the per decode target and per chain list lengths of a template
    /// or of a frame's dependencies.
    pub(crate) fn check_lengths(&self, template: &FrameDependencyTemplate) -> Result<()> {
        check_len(
            "decode_target_indications",
            template.decode_target_indications.len(),
            self.decode_target_count,
        )?;
        check_len("chain_diffs", template.chain_diffs.len(), self.chain_count)
    }
}

/// DependencyDescriptor carries the per frame values written into the RTP
/// header extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub start_of_frame: bool,
    pub end_of_frame: bool,
    pub frame_number: u16,
    pub dependency_template: FrameDependencyTemplate,
    /// Not part of the extension payload, kept for the caller.
    pub resolution: Option<RenderResolution>,
    /// None means all decode targets are active.
    pub active_decode_targets_bitmask: Option<u32>,
    pub structure_attached: bool,
}

impl Default for DependencyDescriptor {
    fn default() -> Self {
        DependencyDescriptor {
            start_of_frame: true,
            end_of_frame: true,
            frame_number: 0,
            dependency_template: FrameDependencyTemplate::default(),
            resolution: None,
            active_decode_targets_bitmask: None,
            structure_attached: false,
        }
    }
}

/// ActiveChains marks which of up to 32 chains are active for a frame.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ActiveChains(u32);

impl ActiveChains {
    pub fn new(mask: u32) -> Self {
        ActiveChains(mask)
    }

    pub fn all() -> Self {
        ActiveChains(u32::MAX)
    }

    pub fn none() -> Self {
        ActiveChains(0)
    }

    /// Returns a copy with chain `index` marked active.
    pub fn with(self, index: usize) -> Result<Self> {
        if index >= MAX_CHAINS {
            return Err(Error::DependencyDescriptorChainIndex(index, MAX_CHAINS));
        }
        Ok(ActiveChains(self.0 | (1 << index)))
    }

    pub fn is_active(&self, index: usize) -> bool {
        index < MAX_CHAINS && self.0 & (1 << index) != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ActiveChains {
    fn from(mask: u32) -> Self {
        ActiveChains(mask)
    }
}

/// Coding of the step between consecutive templates in template_layers().
pub(crate) const NEXT_LAYER_IDC_SAME_LAYER: u64 = 0;
pub(crate) const NEXT_LAYER_IDC_NEXT_TEMPORAL: u64 = 1;
pub(crate) const NEXT_LAYER_IDC_NEXT_SPATIAL: u64 = 2;
pub(crate) const NEXT_LAYER_IDC_NO_MORE_TEMPLATES: u64 = 3;

pub(crate) fn next_layer_idc(
    prev: &FrameDependencyTemplate,
    next: &FrameDependencyTemplate,
) -> Option<u64> {
    if next.same_layer(prev) {
        Some(NEXT_LAYER_IDC_SAME_LAYER)
    } else if next.spatial_id == prev.spatial_id
        && Some(next.temporal_id) == prev.temporal_id.checked_add(1)
    {
        Some(NEXT_LAYER_IDC_NEXT_TEMPORAL)
    } else if Some(next.spatial_id) == prev.spatial_id.checked_add(1) && next.temporal_id == 0 {
        Some(NEXT_LAYER_IDC_NEXT_SPATIAL)
    } else {
        None
    }
}

fn check_len(field: &'static str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(Error::DependencyDescriptorLengthMismatch(field, len, expected));
    }
    Ok(())
}

pub(crate) fn check_range(field: &'static str, v: u32, min: u32, max: u32) -> Result<()> {
    if v < min || v > max {
        return Err(Error::DependencyDescriptorValueOutOfRange(field, v));
    }
    Ok(())
}
