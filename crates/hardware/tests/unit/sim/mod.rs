
/// Randomized invariant and determinism properties.
pub mod properties;
