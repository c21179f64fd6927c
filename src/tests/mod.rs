//! Crate-internal tests exercising the derivation pipeline across module boundaries.

mod helpers;
