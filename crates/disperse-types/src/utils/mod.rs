//! Utility functions for hex and amount formatting.

pub mod formatting;

pub use formatting::{format_gwei_price, format_native, without_0x_prefix};
