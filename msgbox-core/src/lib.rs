//! Core library for ledger message boxes.
//!
//! An account publishes a "message box" (a log referenced from its memo)
//! whose first entry carries an encryption key and a signed ownership proof.
//! Senders verify that proof before encrypting to the key; owners poll the
//! log and decrypt. All ledger I/O goes through the traits in [`traits`], so
//! this crate holds the codecs, the crypto and the protocol logic only.

pub mod error;
pub mod constants;
pub mod traits;
pub mod codec;
pub mod keys;
pub mod canonical;
pub mod crypto;
pub mod protocol;
