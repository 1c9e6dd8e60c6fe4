//! Unit test modules.
