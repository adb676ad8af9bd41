// /starry/.arceos/modules/axbram/src/error.rs

use axerrno::{AxError, LinuxError};
use core::fmt;

/// Errors reported by the block-RAM mapper.
///
/// Resource failures keep the error code of the primitive that failed so the
/// caller sees it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BramError {
    /// All `MAX_DEVICES` slots are occupied.
    TableFull,
    /// The region handed over by discovery cannot be described.
    InvalidResource,
    /// The kernel mapping of the region could not be established.
    MapFailed(AxError),
    /// No device is registered under the requested id.
    NotFound,
    /// The caller asked for more address space than the region provides.
    SizeExceedsRegion,
    /// The caller asked for a zero-length mapping.
    EmptyMapping,
    /// Only offset 0 can be mapped.
    UnsupportedOffset,
    /// Installing the caller's page-table entries failed.
    RemapFailed(AxError),
    /// The interrupt line is busy or invalid.
    InterruptRegistrationFailed(AxError),
    /// The wait was cancelled before data became available.
    Interrupted,
    /// The device was unregistered under an open handle.
    Removed,
}

/// A specialized [`Result`] type with [`BramError`] as the error type.
pub type BramResult<T = ()> = Result<T, BramError>;

impl fmt::Display for BramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "device table is full"),
            Self::InvalidResource => write!(f, "invalid memory resource"),
            Self::MapFailed(e) => write!(f, "failed to map region: {:?}", e),
            Self::NotFound => write!(f, "no such device"),
            Self::SizeExceedsRegion => write!(f, "mapping exceeds the region size"),
            Self::EmptyMapping => write!(f, "zero-length mapping"),
            Self::UnsupportedOffset => write!(f, "mapping offset must be 0"),
            Self::RemapFailed(e) => write!(f, "failed to remap pages: {:?}", e),
            Self::InterruptRegistrationFailed(e) => {
                write!(f, "failed to request interrupt: {:?}", e)
            }
            Self::Interrupted => write!(f, "wait interrupted"),
            Self::Removed => write!(f, "device removed"),
        }
    }
}

impl From<BramError> for AxError {
    fn from(e: BramError) -> Self {
        match e {
            BramError::TableFull => AxError::StorageFull,
            BramError::InvalidResource
            | BramError::SizeExceedsRegion
            | BramError::EmptyMapping
            | BramError::UnsupportedOffset => AxError::InvalidInput,
            BramError::MapFailed(e)
            | BramError::RemapFailed(e)
            | BramError::InterruptRegistrationFailed(e) => e,
            BramError::NotFound | BramError::Removed => AxError::NotFound,
            // AxError 没有 EINTR，按 "重试" 语义处理
            BramError::Interrupted => AxError::WouldBlock,
        }
    }
}

impl From<BramError> for LinuxError {
    fn from(e: BramError) -> Self {
        match e {
            BramError::TableFull => LinuxError::ENOSPC,
            BramError::InvalidResource
            | BramError::SizeExceedsRegion
            | BramError::EmptyMapping
            | BramError::UnsupportedOffset => LinuxError::EINVAL,
            BramError::RemapFailed(_) => LinuxError::EAGAIN,
            BramError::MapFailed(e) | BramError::InterruptRegistrationFailed(e) => e.into(),
            BramError::NotFound | BramError::Removed => LinuxError::ENODEV,
            BramError::Interrupted => LinuxError::EINTR,
        }
    }
}
