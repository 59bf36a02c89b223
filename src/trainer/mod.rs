//! Bot training - turns a bot's scripts into a TF-IDF similarity model and
//! answers messages by replaying the closest script.

pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod personality;
pub mod stopwords;

pub use engine::{
    CorpusSource, Match, ProfileSink, Trainer, TrainerConfig, TrainerState, TrainingDocument,
    DEFAULT_THRESHOLD, FALLBACK_REPLY,
};
pub use error::TrainerError;
pub use index::{SparseVector, VectorIndex, DEFAULT_MAX_FEATURES};
pub use normalize::normalize;
pub use personality::{summarize, PersonalityProfile, DEFAULT_TOP_TERMS};
