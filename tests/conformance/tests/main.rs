//! Token Endpoint Conformance Test Suite
//!
//! Drives a running tokengate server over HTTP and checks the behavior of
//! `POST /connect/token` against RFC 6749.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tg-conformance-tests
//! cargo test -p tg-conformance-tests refresh_token
//! ```

mod harness;
mod refresh_token;
mod token_endpoint;
