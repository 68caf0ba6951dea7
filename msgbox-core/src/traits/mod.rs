//! Collaborator seams: randomness and the external ledger / read-replica.

pub mod random;
pub mod ledger;
