pub mod agent;
pub mod agent_provider;
pub mod agents;
pub mod batch;
pub mod error;
pub mod exploration;
pub mod nn_utils;
pub mod replay;
pub mod session;
