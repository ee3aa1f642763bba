use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad selector, column layout, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The report had no recognizable ECU table, or the table had no ECU rows.
    #[error("no ECU data found in report '{report}'")]
    NoEcuData { report: String },
}
