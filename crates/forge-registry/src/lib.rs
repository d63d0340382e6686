//! forge-registry
//!
//! Early-adopter registry. Grants loyalty discounts and temporary demand
//! shielding to participants whose first admission landed before the
//! registration cutoff, and tracks every participant's running admission
//! count.
//!
//! Per-participant states:
//!   Unregistered → EarlyAdopter{25%, shielded}      (first admission before cutoff)
//!                → EarlyAdopter{10%, shielded}      (count reaches 10)
//!                → EarlyAdopter{10%, unshielded}    (count reaches 100)

pub mod registry;

pub use registry::{discount_for_status, is_shielded_status, AdopterCutoff, EarlyAdopterRegistry, Registration};
