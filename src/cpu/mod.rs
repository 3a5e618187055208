pub mod cpuid;
pub mod features;
pub mod hardware;

pub use cpuid::{CpuidError, CpuidResult};
pub use features::{EcxFeatures, EdxFeatures, FeatureSet};
