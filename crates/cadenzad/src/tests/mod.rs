//! Test suites for the cadenza daemon.

mod support;
