//! # rtc-dependency-descriptor
//!
//! Writer for the AV1 Dependency Descriptor RTP header extension.
//!
//! A [`DependencyDescriptorWriter`] turns a [`FrameDependencyStructure`], the
//! set of [`ActiveChains`] and a per frame [`DependencyDescriptor`] into the
//! extension value bytes. Sizing and writing run the same field sequence, the
//! first against a null [`BitWriter`](bit_writer::BitWriter).
//!
//! ```rust
//! use rtc_dependency_descriptor::{
//!     ActiveChains, DecodeTargetIndication, DependencyDescriptor, DependencyDescriptorWriter,
//!     FrameDependencyStructure, FrameDependencyTemplate,
//! };
//! use shared::marshal::Marshal;
//!
//! # fn main() -> shared::error::Result<()> {
//! let template = FrameDependencyTemplate::default()
//!     .with_decode_target_indications(vec![
//!         DecodeTargetIndication::Required,
//!         DecodeTargetIndication::Discardable,
//!     ])
//!     .with_frame_diffs(vec![1])
//!     .with_chain_diffs(vec![1]);
//! let structure = FrameDependencyStructure {
//!     decode_target_count: 2,
//!     chain_count: 1,
//!     decode_target_protected_by: vec![0, 0],
//!     templates: vec![template.clone()],
//!     ..Default::default()
//! };
//! let descriptor = DependencyDescriptor {
//!     frame_number: 0x1234,
//!     dependency_template: template,
//!     ..Default::default()
//! };
//!
//! let writer = DependencyDescriptorWriter::new(&structure, ActiveChains::all(), &descriptor)?;
//! assert_eq!(writer.size_bits(), 24);
//! assert_eq!(writer.marshal()?.as_ref(), &[0xC0, 0x12, 0x34]);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod bit_writer;
pub mod dependency_descriptor;
pub mod dependency_descriptor_writer;

pub use dependency_descriptor::{
    ActiveChains, DecodeTargetIndication, DependencyDescriptor, FrameDependencyStructure,
    FrameDependencyTemplate, RenderResolution, parse_decode_target_indications,
};
pub use dependency_descriptor_writer::{DEPENDENCY_DESCRIPTOR_URI, DependencyDescriptorWriter};
