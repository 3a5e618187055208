//! CPUID instruction wrapper.
//!
//! Thin layer over the `std::arch::__cpuid` intrinsic. The unchecked queries
//! are only compiled on x86 targets; everything else goes through
//! [`checked_cpuid`], which reports [`CpuidError::Unavailable`] where the
//! instruction does not exist.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

#[cfg(target_arch = "x86")]
use std::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64 as arch;

/// Highest basic leaf and vendor identification.
pub const LEAF_VENDOR: u32 = 0x00;

/// Processor info and feature bits.
pub const LEAF_FEATURES: u32 = 0x01;

/// Highest extended leaf.
pub const LEAF_EXT_MAX: u32 = 0x8000_0000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuidError {
    #[error("CPUID is not available on this architecture")]
    Unavailable,
    #[error("CPUID leaf {leaf:#x} exceeds the maximum supported leaf {max:#x}")]
    LeafOutOfRange { leaf: u32, max: u32 },
    #[error("Unknown CPU feature: {0}")]
    UnknownFeature(String),
}

/// Register snapshot returned by a single CPUID invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl From<arch::CpuidResult> for CpuidResult {
    fn from(res: arch::CpuidResult) -> Self {
        Self {
            eax: res.eax,
            ebx: res.ebx,
            ecx: res.ecx,
            edx: res.edx,
        }
    }
}

/// Whether this build can issue CPUID at all.
pub const fn is_available() -> bool {
    cfg!(any(target_arch = "x86", target_arch = "x86_64"))
}

/// Execute CPUID with the given leaf (subleaf 0).
///
/// The leaf is not validated against the processor's maximum.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
#[allow(unused_unsafe)]
pub fn cpuid(leaf: u32) -> CpuidResult {
    let res: CpuidResult = unsafe { arch::__cpuid(leaf) }.into();
    trace!(leaf, eax = res.eax, ebx = res.ebx, ecx = res.ecx, edx = res.edx, "cpuid");
    res
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn max_basic_leaf() -> u32 {
    cpuid(LEAF_VENDOR).eax
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn max_extended_leaf() -> u32 {
    cpuid(LEAF_EXT_MAX).eax
}

/// Vendor identification string, e.g. `GenuineIntel` or `AuthenticAMD`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn vendor() -> String {
    let res = cpuid(LEAF_VENDOR);
    // EBX, EDX, ECX order
    let mut bytes = [0u8; 12];
    bytes[0..4].copy_from_slice(&res.ebx.to_le_bytes());
    bytes[4..8].copy_from_slice(&res.edx.to_le_bytes());
    bytes[8..12].copy_from_slice(&res.ecx.to_le_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Execute CPUID after checking the leaf against the basic or extended maximum.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn checked_cpuid(leaf: u32) -> Result<CpuidResult, CpuidError> {
    let max = if leaf >= LEAF_EXT_MAX {
        max_extended_leaf()
    } else {
        max_basic_leaf()
    };
    if leaf > max {
        debug!(leaf, max, "cpuid leaf out of range");
        return Err(CpuidError::LeafOutOfRange { leaf, max });
    }
    Ok(cpuid(leaf))
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn checked_cpuid(leaf: u32) -> Result<CpuidResult, CpuidError> {
    debug!(leaf, "cpuid requested on a target without the instruction");
    Err(CpuidError::Unavailable)
}

/// Vendor string and maximum basic leaf in one go, for reporting.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn identify() -> Result<(String, u32), CpuidError> {
    Ok((vendor(), max_basic_leaf()))
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn identify() -> Result<(String, u32), CpuidError> {
    Err(CpuidError::Unavailable)
}
