//! Integration test modules.

mod cancellation_test;
mod failure_test;
mod support;
