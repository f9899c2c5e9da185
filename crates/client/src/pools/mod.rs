//! JSON message pools: producer-fed outgoing, server-fed incoming.
//!
//! Both pools are independently mutex-guarded; see
//! [`message_pool`] for the lock discipline and the duplicate-before-send
//! / restore-on-failure contract that makes `send_msgs` safe to retry.

mod message_pool;

pub use message_pool::{IncomingPool, OutgoingPool};
