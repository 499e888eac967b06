/// Snooping bus arbiter tests.
pub mod interconnect;
