//! Test utilities: a scripted daemon and common fixtures.
//!
//! Available in unit tests and, for other crates, behind the
//! `test-support` feature.

mod fixtures;
mod mocks;

pub use fixtures::{
    TEST_ALIAS, TEST_PUBKEY_HEX, TEST_TLS_CERT, TEST_TLS_KEY, info_response, macaroon_dir,
    scripted_node, test_macaroon, version_response,
};
pub use mocks::{MockDaemon, RecordedCall};
