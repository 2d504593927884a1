mod common;

mod apply_tests;
mod package_tests;
mod smoke_tests;
