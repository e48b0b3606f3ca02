//! # volt-e2e
//!
//! End-to-end channel lifecycle tests for volt.
//!
//! ## Design Philosophy
//!
//! 1. **Deterministic**: the simulated chain only advances when a test
//!    says so, so appeal windows never race the test runner
//! 2. **Declarative**: scenarios read like the protocol narrative
//! 3. **Isolated**: every test gets a fresh chain and router
//!
//! ## Usage
//!
//! ```ignore
//! cargo test -p volt-e2e
//! ```

mod harness;
mod scenarios;

pub use harness::{TestHarness, TestParty, FUNDED_BALANCE, TEST_APPEAL_PERIOD};

/// Test result
pub type E2eResult<T> = Result<T, E2eError>;

/// E2E test errors
#[derive(Debug, thiserror::Error)]
pub enum E2eError {
    /// Setup failed
    #[error("setup failed: {0}")]
    Setup(String),

    /// Node operation failed
    #[error("node operation failed: {0}")]
    Node(#[from] volt_node::NodeError),

    /// Assertion failed
    #[error("assertion failed: {0}")]
    Assertion(String),
}
