#![allow(dead_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer too small")]
    ErrBufferTooSmall,
    /// Wrong marshal size.
    #[error("Wrong marshal size")]
    WrongMarshalSize,

    //BitWriter errors
    #[error("bit writer: write of {0} bits exceeds remaining capacity of {1} bits")]
    BitWriterOverflow(usize, usize),
    #[error("bit writer: value {0} does not fit in {1} bits")]
    BitWriterValueTooLarge(u64, usize),
    #[error("bit writer: value {0} is outside non-symmetric range [0, {1})")]
    NonSymmetricValueOutOfRange(u64, u64),

    //Dependency descriptor errors
    #[error("dependency descriptor: structure has no templates")]
    ErrDependencyDescriptorNoTemplates,
    #[error("dependency descriptor: {0} templates exceeds the limit of {1}")]
    DependencyDescriptorTooManyTemplates(usize, usize),
    #[error("dependency descriptor: template id offset {0} must be less than {1}")]
    DependencyDescriptorTemplateIdOffset(u8, u8),
    #[error("dependency descriptor: decode target count {0} must be in 1..={1}")]
    DependencyDescriptorDecodeTargetCount(usize, usize),
    #[error("dependency descriptor: chain count {0} must not exceed decode target count {1}")]
    DependencyDescriptorChainCount(usize, usize),
    #[error("dependency descriptor: chain index {0} exceeds the limit of {1} chains")]
    DependencyDescriptorChainIndex(usize, usize),
    #[error("dependency descriptor: decode target {0} protected by chain {1}, only {2} chains")]
    DependencyDescriptorProtectedBy(usize, usize, usize),
    #[error("dependency descriptor: {0} has length {1}, expected {2}")]
    DependencyDescriptorLengthMismatch(&'static str, usize, usize),
    #[error("dependency descriptor: first template must be spatial id 0, temporal id 0")]
    ErrDependencyDescriptorFirstTemplateLayer,
    #[error("dependency descriptor: invalid layer transition at template {0}")]
    DependencyDescriptorInvalidLayerTransition(usize),
    #[error("dependency descriptor: {0} value {1} is out of range")]
    DependencyDescriptorValueOutOfRange(&'static str, u32),
    #[error("dependency descriptor: no template for spatial id {0}, temporal id {1}")]
    DependencyDescriptorTemplateNotFound(u8, u8),
    #[error("dependency descriptor: active decode targets bitmask {0:#x} exceeds {1} decode targets")]
    DependencyDescriptorActiveDecodeTargets(u32, usize),
    #[error("dependency descriptor: invalid decode target indication symbol {0:?}")]
    DependencyDescriptorInvalidDtiSymbol(char),

    #[error("{0}")]
    Other(String),
}
