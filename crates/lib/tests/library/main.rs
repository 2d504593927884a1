//! Library integration tests: full apply passes against scripted managers.

mod common;

mod apply_tests;
mod lock_tests;
mod operation_tests;
