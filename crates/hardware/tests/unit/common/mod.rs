
/// Error display and conversions.
pub mod error;
