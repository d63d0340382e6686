//! forge-fee
//!
//! Pure fee engine. Maps admission metrics and a reference price to the base
//! required fee before any participant-specific adjustment:
//!
//!   Layer 1  supply growth   FLOOR × 1.1^⌊forges / 2016⌋
//!   Layer 2  demand          100–200% from forges in the last week
//!   Layer 3  protocol age    100 × 1.01^⌊days / 30⌋
//!   Layer 4  reference price target / reference, clamped to 50–200%
//!
//! The layers combine with truncating integer division after every step,
//! are clamped under a band cap keyed by admissions, and never fall below
//! the floor fee. Nothing here holds state.

pub mod engine;
pub mod layers;

pub use engine::{fee_breakdown, project_future_fee, required_fee, FeeBreakdown, FeeInputs};
pub use layers::{
    age_multiplier, band_cap, demand_multiplier, price_multiplier, supply_growth_fee,
};
