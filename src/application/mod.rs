//! Application layer - Services composing domain rules with adapters.

pub mod splitter;

pub use splitter::{JobOutcome, PendingUpload, SplitService};
