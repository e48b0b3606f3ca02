//! End-to-end channel lifecycle scenarios
//!
//! Each test walks a full protocol narrative (open, pay, close, dispute,
//! withdraw) across two or three nodes wired through the in-process
//! router against the simulated chain.
