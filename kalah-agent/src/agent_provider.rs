use crate::agent::Agent;
use figment::Figment;
use std::error::Error;

pub trait AgentProvider {
    fn name(&self) -> String;
    fn create_agent(&self, options: &Figment)
        -> Result<Box<dyn Agent>, Box<dyn Error + Send + Sync>>;
}
