//! Typed views over the CPUID leaf 1 feature registers.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use super::cpuid::{CpuidError, CpuidResult};

bitflags! {
    /// Leaf 1 EDX feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EdxFeatures: u32 {
        const FPU = 1 << 0;
        const VME = 1 << 1;
        const DE = 1 << 2;
        const PSE = 1 << 3;
        const TSC = 1 << 4;
        const MSR = 1 << 5;
        const PAE = 1 << 6;
        const MCE = 1 << 7;
        const CX8 = 1 << 8;
        const APIC = 1 << 9;
        // bit 10 reserved
        const SEP = 1 << 11;
        const MTRR = 1 << 12;
        const PGE = 1 << 13;
        const MCA = 1 << 14;
        const CMOV = 1 << 15;
        const PAT = 1 << 16;
        const PSE36 = 1 << 17;
        const PSN = 1 << 18;
        const CLFSH = 1 << 19;
        // bit 20 reserved
        const DS = 1 << 21;
        const ACPI = 1 << 22;
        const MMX = 1 << 23;
        const FXSR = 1 << 24;
        const SSE = 1 << 25;
        const SSE2 = 1 << 26;
        const SS = 1 << 27;
        const HTT = 1 << 28;
        const TM = 1 << 29;
        const IA64 = 1 << 30;
        const PBE = 1 << 31;
    }
}

bitflags! {
    /// Leaf 1 ECX feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EcxFeatures: u32 {
        const SSE3 = 1 << 0;
        const PCLMULQDQ = 1 << 1;
        const DTES64 = 1 << 2;
        const MONITOR = 1 << 3;
        const DS_CPL = 1 << 4;
        const VMX = 1 << 5;
        const SMX = 1 << 6;
        const EST = 1 << 7;
        const TM2 = 1 << 8;
        const SSSE3 = 1 << 9;
        const CNXT_ID = 1 << 10;
        const SDBG = 1 << 11;
        const FMA = 1 << 12;
        const CX16 = 1 << 13;
        const XTPR = 1 << 14;
        const PDCM = 1 << 15;
        // bit 16 reserved
        const PCID = 1 << 17;
        const DCA = 1 << 18;
        const SSE4_1 = 1 << 19;
        const SSE4_2 = 1 << 20;
        const X2APIC = 1 << 21;
        const MOVBE = 1 << 22;
        const POPCNT = 1 << 23;
        const TSC_DEADLINE = 1 << 24;
        const AES = 1 << 25;
        const XSAVE = 1 << 26;
        const OSXSAVE = 1 << 27;
        const AVX = 1 << 28;
        const F16C = 1 << 29;
        const RDRAND = 1 << 30;
        const HYPERVISOR = 1 << 31;
    }
}

/// The leaf 1 feature bits, either as reported by a processor or as a
/// set of requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    pub edx: EdxFeatures,
    pub ecx: EcxFeatures,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            edx: EdxFeatures::empty(),
            ecx: EcxFeatures::empty(),
        }
    }
}

impl FeatureSet {
    pub const fn sse2() -> Self {
        Self {
            edx: EdxFeatures::SSE2,
            ecx: EcxFeatures::empty(),
        }
    }

    /// Decode a leaf 1 snapshot. Reserved and unnamed bits are kept.
    pub fn from_leaf1(res: &CpuidResult) -> Self {
        Self {
            edx: EdxFeatures::from_bits_retain(res.edx),
            ecx: EcxFeatures::from_bits_retain(res.ecx),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edx.is_empty() && self.ecx.is_empty()
    }

    pub fn contains(&self, other: &FeatureSet) -> bool {
        self.edx.contains(other.edx) && self.ecx.contains(other.ecx)
    }

    /// Features in `required` that `self` lacks.
    pub fn missing(&self, required: &FeatureSet) -> FeatureSet {
        FeatureSet {
            edx: required.edx.difference(self.edx),
            ecx: required.ecx.difference(self.ecx),
        }
    }

    pub fn union(self, other: FeatureSet) -> FeatureSet {
        FeatureSet {
            edx: self.edx | other.edx,
            ecx: self.ecx | other.ecx,
        }
    }

    /// Lowercase names of the named flags that are set, EDX first.
    pub fn names(&self) -> Vec<String> {
        self.edx
            .iter_names()
            .map(|(name, _)| name)
            .chain(self.ecx.iter_names().map(|(name, _)| name))
            .map(display_name)
            .collect()
    }
}

impl FromIterator<FeatureSet> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureSet>>(iter: I) -> Self {
        iter.into_iter().fold(FeatureSet::default(), FeatureSet::union)
    }
}

impl FromStr for FeatureSet {
    type Err = CpuidError;

    /// Parse a single feature name such as `sse2`, `SSE4.1` or `tsc-deadline`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        if key.is_empty() {
            return Err(CpuidError::UnknownFeature(s.to_string()));
        }

        if let Some(edx) = EdxFeatures::from_name(&key) {
            return Ok(FeatureSet { edx, ..Default::default() });
        }
        if let Some(ecx) = EcxFeatures::from_name(&key) {
            return Ok(FeatureSet { ecx, ..Default::default() });
        }
        Err(CpuidError::UnknownFeature(s.to_string()))
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" "))
    }
}

fn display_name(flag: &str) -> String {
    flag.to_ascii_lowercase().replace("sse4_", "sse4.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse2_is_bit_26() {
        assert_eq!(EdxFeatures::SSE2.bits(), 0x0400_0000);
        assert_eq!(FeatureSet::sse2().edx.bits(), 1 << 26);
    }

    #[test]
    fn test_from_leaf1_keeps_reserved_bits() {
        let res = CpuidResult {
            eax: 0,
            ebx: 0,
            ecx: EcxFeatures::SSE3.bits(),
            edx: EdxFeatures::SSE.bits() | EdxFeatures::SSE2.bits() | (1 << 10),
        };
        let set = FeatureSet::from_leaf1(&res);

        assert_eq!(set.edx.bits() & (1 << 10), 1 << 10);
        assert!(set.edx.contains(EdxFeatures::SSE2));
        // The reserved bit has no name and is left out.
        assert_eq!(set.names(), vec!["sse", "sse2", "sse3"]);
    }

    #[test]
    fn test_parse_names() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!("sse2".parse::<FeatureSet>()?, FeatureSet::sse2());
        assert_eq!(" SSE2 ".parse::<FeatureSet>()?, FeatureSet::sse2());

        let sse41: FeatureSet = "sse4.1".parse()?;
        assert_eq!(sse41.ecx, EcxFeatures::SSE4_1);
        assert!(sse41.edx.is_empty());

        let deadline: FeatureSet = "tsc-deadline".parse()?;
        assert_eq!(deadline.ecx, EcxFeatures::TSC_DEADLINE);
        Ok(())
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "sse9".parse::<FeatureSet>(),
            Err(CpuidError::UnknownFeature("sse9".to_string()))
        );
        assert!("".parse::<FeatureSet>().is_err());
    }

    #[test]
    fn test_contains_and_missing() {
        let host = FeatureSet {
            edx: EdxFeatures::SSE | EdxFeatures::SSE2,
            ecx: EcxFeatures::SSE3,
        };
        let required: FeatureSet = [FeatureSet::sse2(), FeatureSet { ecx: EcxFeatures::AVX, ..Default::default() }]
            .into_iter()
            .collect();

        assert!(host.contains(&FeatureSet::sse2()));
        assert!(!host.contains(&required));

        let missing = host.missing(&required);
        assert_eq!(missing.ecx, EcxFeatures::AVX);
        assert!(missing.edx.is_empty());
        assert_eq!(missing.to_string(), "avx");

        assert!(host.missing(&FeatureSet::sse2()).is_empty());
    }

    #[test]
    fn test_display_names_sse4() {
        let set = FeatureSet {
            edx: EdxFeatures::empty(),
            ecx: EcxFeatures::SSE4_1 | EcxFeatures::SSE4_2,
        };
        assert_eq!(set.to_string(), "sse4.1 sse4.2");
    }
}
