use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid input: field={field}, {message}")]
    InvalidInput { field: String, message: String },
    #[error("data source error: {0}")]
    Source(#[from] crate::sources::SourceError),
    #[error("user {user_id} already has an active simulation {simulation_id}")]
    ActiveSimulation { user_id: u64, simulation_id: u64 },
    #[error("simulation {simulation_id} is not in progress")]
    SimulationNotActive { simulation_id: u64 },
    #[error("simulation {simulation_id} time limit exceeded")]
    SimulationExpired { simulation_id: u64 },
}

impl ScoringError {
    pub fn invalid_input(field: &str, message: &str) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
