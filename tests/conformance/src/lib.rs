//! Black-box tests for the tokengate token endpoint.
//!
//! The tests live under `tests/` and boot a real server on an ephemeral
//! port:
//!
//! ```bash
//! cargo test -p tg-conformance-tests
//! ```
