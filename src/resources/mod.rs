//! Hosting resources: plans, servers and server actions

mod client;
mod types;

pub use client::{ResourceClient, ResourceOp, DEFAULT_PLAN_PAGE_SIZE, DEFAULT_SERVER_PAGE_SIZE};
pub use types::*;
