//! SSE2 availability, reduced to a process exit status.
//!
//! Leaf 1 is queried directly: neither CPUID availability nor the leaf 0
//! maximum is checked first. Every x86 processor this runs on in practice
//! implements leaf 1.

use std::process::ExitCode;

use tracing::debug;

use crate::cpu::features::EdxFeatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sse2Status {
    Supported,
    Unsupported,
}

impl Sse2Status {
    /// Test bit 26 of a leaf 1 EDX bitmask.
    pub fn from_edx(edx: u32) -> Self {
        if EdxFeatures::from_bits_retain(edx).contains(EdxFeatures::SSE2) {
            Sse2Status::Supported
        } else {
            Sse2Status::Unsupported
        }
    }

    pub fn is_supported(self) -> bool {
        self == Sse2Status::Supported
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Sse2Status::Supported => 0,
            Sse2Status::Unsupported => 1,
        }
    }
}

impl From<Sse2Status> for ExitCode {
    fn from(status: Sse2Status) -> Self {
        ExitCode::from(status.exit_code())
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn sse2_status() -> Sse2Status {
    use crate::cpu::cpuid::{cpuid, LEAF_FEATURES};

    let edx = cpuid(LEAF_FEATURES).edx;
    let status = Sse2Status::from_edx(edx);
    debug!(edx, ?status, "sse2 probe");
    status
}

/// No CPUID here, so SSE2 cannot be present.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn sse2_status() -> Sse2Status {
    debug!("sse2 probe on a non-x86 target");
    Sse2Status::Unsupported
}
