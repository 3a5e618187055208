pub mod cpu;
pub mod probe;
