//! Integration tests for the auth pipeline.
//!
//! - `harness.rs`      - FakeBackend and TestHarness
//! - `dispatch.rs`     - credential attachment, non-401 failures, timeouts
//! - `single_flight.rs` - one refresh shared by concurrent callers
//! - `logout.rs`       - session teardown and the navigation signal
//! - `scenarios.rs`    - login, chat and restart flows end to end

mod dispatch;
mod single_flight;
