//! Integrations that feed external input into the RunLoop.

pub mod push_bridge;
pub mod push_client;
