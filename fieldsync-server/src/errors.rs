/// Failures surfaced by the agent's service layer. Telemetry-path problems
/// never appear here: a bad payload is logged and dropped, it does not tear
/// down the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Bus request failed: {0}")]
    Bus(#[from] rumqttc::ClientError),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
