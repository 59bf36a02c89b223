use std::fmt;

/// Errors raised by the training engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainerError {
    /// Fit or summarize attempted over zero documents.
    EmptyCorpus,
    /// The corpus source returned no scripts for this bot.
    NoTrainingData { bot_id: i64 },
    /// `respond` called before a successful `train`.
    NotTrained,
    /// The corpus source itself failed.
    Source(String),
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCorpus => write!(f, "cannot build a model over an empty corpus"),
            Self::NoTrainingData { bot_id } => {
                write!(f, "no training data found for bot {}", bot_id)
            }
            Self::NotTrained => write!(f, "model not trained yet"),
            Self::Source(msg) => write!(f, "failed to load training data: {}", msg),
        }
    }
}

impl std::error::Error for TrainerError {}
