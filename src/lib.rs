//! tripdeck library exports for testing

pub mod core;
pub mod transit;
pub mod tui;

#[cfg(test)]
pub mod test_support;
