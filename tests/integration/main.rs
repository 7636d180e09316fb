//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific layer against
//! the scripted mock link.  All tests run on the host with millisecond
//! timings; no radio is required.

mod controller_tests;
mod mock_link;
