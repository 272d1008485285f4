/// Test context, address helpers, and shared assertions.
pub mod harness;
