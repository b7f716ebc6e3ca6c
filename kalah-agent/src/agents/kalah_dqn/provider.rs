use super::{agent::KalahDqnAgent, options::KalahDqnOptions};
use crate::{agent::Agent, agent_provider::AgentProvider};
use figment::Figment;
use std::error::Error;

pub struct KalahDqnProvider;

impl AgentProvider for KalahDqnProvider {
    fn name(&self) -> String {
        "kalah-dqn".to_owned()
    }

    fn create_agent(
        &self,
        options: &Figment,
    ) -> Result<Box<dyn Agent>, Box<dyn Error + Send + Sync>> {
        let options: KalahDqnOptions = options.extract()?;
        Ok(Box::new(KalahDqnAgent::new(options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Toml};
    use kalah_core::board::{Board, Side};

    #[test]
    fn test_create_agent_from_config() {
        let options = Figment::from(Toml::string(
            r#"
            device = "cpu"
            seed = 3

            [game]
            holes = 5

            [train]
            enabled = false
            "#,
        ));
        let mut agent = KalahDqnProvider.create_agent(&options).unwrap();
        let board = Board::new(5, 4);

        agent.next_move(&board, Side::South, false).unwrap();
    }

    #[test]
    fn test_create_agent_rejects_bad_config() {
        let options = Figment::from(Toml::string(r#"train = "yes""#));
        assert!(KalahDqnProvider.create_agent(&options).is_err());
    }
}
