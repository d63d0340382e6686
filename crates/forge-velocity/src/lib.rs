//! forge-velocity
//!
//! Rolling admission-velocity ledger. Records admission timestamps and
//! answers windowed-count and rate queries with bounded memory growth.

pub mod ledger;

pub use ledger::{Compaction, VelocityLedger};
