
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize};

use crate::bit_writer::BitWriter;
use crate::dependency_descriptor::*;

/// URI of the Dependency Descriptor RTP Header Extension
pub const DEPENDENCY_DESCRIPTOR_URI: &str =
    "https://aomediacodec.github.io/av1-rtp-spec/#dependency-descriptor-rtp-header-extension";

/// Largest value an RFC 8285 one-byte header extension element can carry.
pub const ONE_BYTE_HEADER_MAX_SIZE: usize = 16;

/// Outcome of comparing a frame's dependencies against one template.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
struct TemplateMatch {
    template_index: usize,
    need_custom_dtis: bool,
    need_custom_fdiffs: bool,
    need_custom_chains: bool,
    /// Bits needed on top of the template to describe the frame.
    extra_size_bits: usize,
}

/// DependencyDescriptorWriter serializes one frame's dependency descriptor.
///
/// Construction validates the structure/descriptor pair, picks the template
/// that describes the frame most cheaply and sizes the output with a dry run
/// against a null [`BitWriter`]. [`write_to`](Self::write_to) then replays the
/// same field sequence into a real buffer.
///
/// <https://aomediacodec.github.io/av1-rtp-spec/#dependency-descriptor-rtp-header-extension>
#[derive(Debug)]
pub struct DependencyDescriptorWriter<'a> {
    structure: &'a FrameDependencyStructure,
    active_chains: ActiveChains,
    descriptor: &'a DependencyDescriptor,
    best_template: TemplateMatch,
    size_bits: usize,
}

impl<'a> DependencyDescriptorWriter<'a> {
    pub fn new(
        structure: &'a FrameDependencyStructure,
        active_chains: ActiveChains,
        descriptor: &'a DependencyDescriptor,
    ) -> Result<Self> {
        let best_template = match validate(structure, active_chains, descriptor)
            .and_then(|_| find_best_template(structure, active_chains, descriptor))
        {
            Ok(best_template) => best_template,
            Err(err) => {
                log::warn!(
                    "dependency descriptor for frame {} rejected: {}",
                    descriptor.frame_number,
                    err
                );
                return Err(err);
            }
        };
        let mut writer = DependencyDescriptorWriter {
            structure,
            active_chains,
            descriptor,
            best_template,
            size_bits: 0,
        };

        let mut null_writer = BitWriter::from_null();
        writer.encode(&mut null_writer)?;
        writer.size_bits = null_writer.written_bits();

        log::trace!(
            "dependency descriptor for frame {}: template {} with {} extra bits, {} bits total",
            descriptor.frame_number,
            best_template.template_index,
            best_template.extra_size_bits,
            writer.size_bits
        );

        Ok(writer)
    }

    /// Number of bits the descriptor occupies, without padding.
    pub fn size_bits(&self) -> usize {
        self.size_bits
    }

    /// True when the value does not fit in a one-byte header extension element.
    pub fn needs_two_byte_header(&self) -> bool {
        self.marshal_size() > ONE_BYTE_HEADER_MAX_SIZE
    }

    /// Writes the descriptor into the first `size_bits` bits of `buf` and
    /// returns the number of bytes it occupies. Bits up to the end of the
    /// last byte are zeroed.
    pub fn write_to(&self, buf: &mut [u8], size_bits: usize) -> Result<usize> {
        if size_bits < self.size_bits {
            return Err(Error::ErrBufferTooSmall);
        }
        let size = size_bits.div_ceil(8);
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }
        buf[..size].fill(0);

        let mut writer = BitWriter::from_size_bits(buf, 0, size_bits)?;
        self.encode(&mut writer)?;
        if writer.written_bits() != self.size_bits {
            return Err(Error::WrongMarshalSize);
        }

        Ok(self.size_bits.div_ceil(8))
    }

    fn encode(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        self.write_mandatory_fields(writer)?;
        if self.has_extended_fields() {
            self.write_extended_fields(writer)?;
            self.write_frame_dependency_definition(writer)?;
        }
        Ok(())
    }

    fn has_extended_fields(&self) -> bool {
        self.best_template.extra_size_bits > 0
            || self.descriptor.structure_attached
            || self.descriptor.active_decode_targets_bitmask.is_some()
    }

    fn should_write_active_decode_targets_bitmask(&self) -> bool {
        match self.descriptor.active_decode_targets_bitmask {
            None => false,
            // An attached structure already implies every target is active.
            Some(mask) => {
                !(self.descriptor.structure_attached
                    && mask == all_decode_targets_mask(self.structure.decode_target_count))
            }
        }
    }

    fn write_mandatory_fields(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        let template_id = (self.best_template.template_index
            + self.structure.template_id_offset as usize)
            % MAX_TEMPLATES;

        writer.write(self.descriptor.start_of_frame as u64, 1)?;
        writer.write(self.descriptor.end_of_frame as u64, 1)?;
        writer.write(template_id as u64, 6)?;
        writer.write(self.descriptor.frame_number as u64, 16)
    }

    fn write_extended_fields(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        let structure_present = self.descriptor.structure_attached;
        let active_decode_targets_present = self.should_write_active_decode_targets_bitmask();

        writer.write(structure_present as u64, 1)?;
        writer.write(active_decode_targets_present as u64, 1)?;
        writer.write(self.best_template.need_custom_dtis as u64, 1)?;
        writer.write(self.best_template.need_custom_fdiffs as u64, 1)?;
        writer.write(self.best_template.need_custom_chains as u64, 1)?;

        if structure_present {
            self.write_template_dependency_structure(writer)?;
        }
        if active_decode_targets_present {
            if let Some(mask) = self.descriptor.active_decode_targets_bitmask {
                writer.write(mask as u64, self.structure.decode_target_count)?;
            }
        }

        Ok(())
    }

    fn write_template_dependency_structure(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        writer.write(self.structure.template_id_offset as u64, 6)?;
        writer.write(self.structure.decode_target_count as u64 - 1, 5)?;

        self.write_template_layers(writer)?;
        self.write_template_dtis(writer)?;
        self.write_template_fdiffs(writer)?;
        self.write_template_chains(writer)?;

        let has_resolutions = !self.structure.resolutions.is_empty();
        writer.write(has_resolutions as u64, 1)?;
        if has_resolutions {
            self.write_resolutions(writer)?;
        }

        Ok(())
    }

    fn write_template_layers(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for (i, pair) in self.structure.templates.windows(2).enumerate() {
            let idc = next_layer_idc(&pair[0], &pair[1])
                .ok_or(Error::DependencyDescriptorInvalidLayerTransition(i + 1))?;
            writer.write(idc, 2)?;
        }
        writer.write(NEXT_LAYER_IDC_NO_MORE_TEMPLATES, 2)
    }

    fn write_template_dtis(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for template in &self.structure.templates {
            for &dti in &template.decode_target_indications {
                writer.write(dti as u64, 2)?;
            }
        }
        Ok(())
    }

    fn write_template_fdiffs(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for template in &self.structure.templates {
            for &fdiff in &template.frame_diffs {
                // fdiff_follows_flag followed by fdiff_minus_one
                writer.write((1 << 4) | (fdiff as u64 - 1), 1 + 4)?;
            }
            writer.write(0, 1)?;
        }
        Ok(())
    }

    fn write_template_chains(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        let chain_count = self.structure.chain_count as u64;
        writer.write_non_symmetric(
            chain_count,
            self.structure.decode_target_count as u64 + 1,
        )?;
        if chain_count == 0 {
            return Ok(());
        }

        for &protected_by in &self.structure.decode_target_protected_by {
            writer.write_non_symmetric(protected_by as u64, chain_count)?;
        }
        for template in &self.structure.templates {
            for &chain_diff in &template.chain_diffs {
                writer.write(chain_diff as u64, 4)?;
            }
        }
        Ok(())
    }

    fn write_resolutions(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for resolution in &self.structure.resolutions {
            writer.write(resolution.width as u64 - 1, 16)?;
            writer.write(resolution.height as u64 - 1, 16)?;
        }
        Ok(())
    }

    fn write_frame_dependency_definition(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        if self.best_template.need_custom_dtis {
            self.write_frame_dtis(writer)?;
        }
        if self.best_template.need_custom_fdiffs {
            self.write_frame_fdiffs(writer)?;
        }
        if self.best_template.need_custom_chains {
            self.write_frame_chains(writer)?;
        }
        Ok(())
    }

    fn write_frame_dtis(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for &dti in &self.descriptor.dependency_template.decode_target_indications {
            writer.write(dti as u64, 2)?;
        }
        Ok(())
    }

    fn write_frame_fdiffs(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        for &fdiff in &self.descriptor.dependency_template.frame_diffs {
            // next_fdiff_size selects a 4, 8 or 12 bit fdiff_minus_one
            let fdiff_minus_one = fdiff as u64 - 1;
            if fdiff <= 1 << 4 {
                writer.write((1 << 4) | fdiff_minus_one, 2 + 4)?;
            } else if fdiff <= 1 << 8 {
                writer.write((2 << 8) | fdiff_minus_one, 2 + 8)?;
            } else {
                writer.write((3 << 12) | fdiff_minus_one, 2 + 12)?;
            }
        }
        writer.write(0, 2)
    }

    fn write_frame_chains(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        let chain_diffs = &self.descriptor.dependency_template.chain_diffs;
        for (i, &chain_diff) in chain_diffs.iter().enumerate() {
            let chain_diff = if self.active_chains.is_active(i) {
                chain_diff
            } else {
                0
            };
            writer.write(chain_diff as u64, 8)?;
        }
        Ok(())
    }
}

impl MarshalSize for DependencyDescriptorWriter<'_> {
    fn marshal_size(&self) -> usize {
        self.size_bits.div_ceil(8)
    }
}

impl Marshal for DependencyDescriptorWriter<'_> {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        self.write_to(buf, self.size_bits)
    }
}

fn validate(
    structure: &FrameDependencyStructure,
    active_chains: ActiveChains,
    descriptor: &DependencyDescriptor,
) -> Result<()> {
    structure.validate()?;

    let frame = &descriptor.dependency_template;
    structure.check_lengths(frame)?;
    for &fdiff in &frame.frame_diffs {
        check_range("frame diff", fdiff, 1, MAX_FRAME_DIFF)?;
    }
    for (i, &chain_diff) in frame.chain_diffs.iter().enumerate() {
        if active_chains.is_active(i) {
            check_range("frame chain diff", chain_diff, 0, MAX_FRAME_CHAIN_DIFF)?;
        }
    }

    if let Some(mask) = descriptor.active_decode_targets_bitmask {
        if mask & !all_decode_targets_mask(structure.decode_target_count) != 0 {
            return Err(Error::DependencyDescriptorActiveDecodeTargets(
                mask,
                structure.decode_target_count,
            ));
        }
    }

    Ok(())
}

/// Picks, among templates on the frame's layer, the one needing the fewest
/// extra bits to describe the frame.
fn find_best_template(
    structure: &FrameDependencyStructure,
    active_chains: ActiveChains,
    descriptor: &DependencyDescriptor,
) -> Result<TemplateMatch> {
    let frame = &descriptor.dependency_template;
    let mut best: Option<TemplateMatch> = None;

    for (index, template) in structure.templates.iter().enumerate() {
        if template.spatial_id != frame.spatial_id || template.temporal_id != frame.temporal_id {
            continue;
        }

        let candidate = calculate_match(structure, active_chains, index, template, frame);
        if best.is_none_or(|b| candidate.extra_size_bits < b.extra_size_bits) {
            best = Some(candidate);
            if candidate.extra_size_bits == 0 {
                break;
            }
        }
    }

    best.ok_or(Error::DependencyDescriptorTemplateNotFound(
        frame.spatial_id,
        frame.temporal_id,
    ))
}

fn calculate_match(
    structure: &FrameDependencyStructure,
    active_chains: ActiveChains,
    template_index: usize,
    template: &FrameDependencyTemplate,
    frame: &FrameDependencyTemplate,
) -> TemplateMatch {
    let need_custom_dtis = frame.decode_target_indications != template.decode_target_indications;
    let need_custom_fdiffs = frame.frame_diffs != template.frame_diffs;
    let need_custom_chains = (0..structure.chain_count)
        .any(|i| active_chains.is_active(i) && frame.chain_diffs[i] != template.chain_diffs[i]);

    let mut extra_size_bits = 0;
    if need_custom_dtis {
        extra_size_bits += 2 * frame.decode_target_indications.len();
    }
    if need_custom_fdiffs {
        extra_size_bits += 2 * (1 + frame.frame_diffs.len());
        for &fdiff in &frame.frame_diffs {
            extra_size_bits += if fdiff <= 1 << 4 {
                4
            } else if fdiff <= 1 << 8 {
                8
            } else {
                12
            };
        }
    }
    if need_custom_chains {
        extra_size_bits += 8 * structure.chain_count;
    }

    TemplateMatch {
        template_index,
        need_custom_dtis,
        need_custom_fdiffs,
        need_custom_chains,
        extra_size_bits,
    }
}

fn all_decode_targets_mask(decode_target_count: usize) -> u32 {
    ((1u64 << decode_target_count) - 1) as u32
}
