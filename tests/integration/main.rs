//! Integration test harness.

mod helpers;

mod dispatch_test;
mod rules_test;
mod store_test;
mod sync_test;
