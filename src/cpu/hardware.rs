//! Runtime Detection Module
//! The standard library's view of the SIMD extensions, used to cross-check
//! the raw CPUID bitmask.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuFeatures {
    pub sse: bool,
    pub sse2: bool,
    pub sse3: bool,
    pub ssse3: bool,
    #[serde(rename = "sse4.1")]
    pub sse4_1: bool,
    #[serde(rename = "sse4.2")]
    pub sse4_2: bool,
    pub avx: bool,
    pub avx2: bool,
    pub fma: bool,
    pub avx512f: bool,
}

impl CpuFeatures {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn detect() -> Self {
        Self {
            sse: is_x86_feature_detected!("sse"),
            sse2: is_x86_feature_detected!("sse2"),
            sse3: is_x86_feature_detected!("sse3"),
            ssse3: is_x86_feature_detected!("ssse3"),
            sse4_1: is_x86_feature_detected!("sse4.1"),
            sse4_2: is_x86_feature_detected!("sse4.2"),
            avx: is_x86_feature_detected!("avx"),
            avx2: is_x86_feature_detected!("avx2"),
            fma: is_x86_feature_detected!("fma"),
            avx512f: is_x86_feature_detected!("avx512f"),
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn detect() -> Self {
        Self::default()
    }

    /// (feature name, detected) pairs, named the way `is_x86_feature_detected!` spells them.
    pub fn entries(&self) -> [(&'static str, bool); 10] {
        [
            ("sse", self.sse),
            ("sse2", self.sse2),
            ("sse3", self.sse3),
            ("ssse3", self.ssse3),
            ("sse4.1", self.sse4_1),
            ("sse4.2", self.sse4_2),
            ("avx", self.avx),
            ("avx2", self.avx2),
            ("fma", self.fma),
            ("avx512f", self.avx512f),
        ]
    }
}
