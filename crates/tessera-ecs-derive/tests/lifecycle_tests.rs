//! Compile-time tests for the Lifecycle derive macro.
//!
//! These tests verify that:
//! 1. Valid capability lists compile and wire the right hooks
//! 2. Unknown, duplicate, or inconsistent keys, unions, and borrowed types
//!    fail with helpful errors

#[test]
fn test_compile_failures() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/ui/fail_*.rs");
    t.pass("tests/ui/pass_*.rs");
}
