//! Shared helpers for this workspace's criterion benchmarks. Currently
//! empty: the fixture-file abstraction this crate used to provide was
//! specific to the teacher's HTTP request-parsing benchmarks and has no use
//! for the message-pool benchmark that replaced it.
