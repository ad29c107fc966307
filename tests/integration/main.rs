//! Integration test entry point

mod harvest_tests;
