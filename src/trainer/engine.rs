//! Training engine - builds a per-bot similarity model and answers queries
//! by replaying the closest training script.

use tracing::{debug, info};

use crate::trainer::error::TrainerError;
use crate::trainer::index::{VectorIndex, DEFAULT_MAX_FEATURES};
use crate::trainer::normalize::normalize;
use crate::trainer::personality::{summarize, PersonalityProfile, DEFAULT_TOP_TERMS};

/// Reply used when nothing in the corpus is close enough.
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that. Could you rephrase?";

/// Default minimum similarity for a stored script to be replayed.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Supplies the scripts assigned to a bot, in a stable order.
pub trait CorpusSource {
    fn fetch_scripts(&self, bot_id: i64) -> Result<Vec<String>, String>;
}

/// Receives the personality profile once a bot has been trained.
pub trait ProfileSink {
    fn save_personality(&self, bot_id: i64, profile: &PersonalityProfile) -> Result<(), String>;
}

/// Tunables for a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub max_features: usize,
    pub top_terms: usize,
    pub threshold: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            top_terms: DEFAULT_TOP_TERMS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// One script as loaded for training.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingDocument {
    pub raw: String,
    pub normalized: String,
}

impl TrainingDocument {
    pub fn new(raw: String) -> Self {
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Empty,
    Loaded,
    Trained,
}

/// Best-scoring document for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub index: usize,
    pub score: f64,
}

/// Trainer for a single bot.
#[derive(Debug, Clone)]
pub struct Trainer {
    bot_id: i64,
    config: TrainerConfig,
    documents: Vec<TrainingDocument>,
    profile: Option<PersonalityProfile>,
    index: Option<VectorIndex>,
}

impl Trainer {
    pub fn new(bot_id: i64, config: TrainerConfig) -> Self {
        Self {
            bot_id,
            config,
            documents: Vec::new(),
            profile: None,
            index: None,
        }
    }

    pub fn bot_id(&self) -> i64 {
        self.bot_id
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        match (&self.profile, &self.index) {
            (_, Some(_)) => TrainerState::Trained,
            (Some(_), None) => TrainerState::Loaded,
            (None, None) => TrainerState::Empty,
        }
    }

    pub fn documents(&self) -> &[TrainingDocument] {
        &self.documents
    }

    pub fn profile(&self) -> Option<&PersonalityProfile> {
        self.profile.as_ref()
    }

    /// Fetch and normalize the bot's scripts and compute its profile.
    ///
    /// Replaces any previously fitted index, leaving the trainer `Loaded`.
    /// On error the trainer is unchanged.
    pub fn load(&mut self, source: &dyn CorpusSource) -> Result<&PersonalityProfile, TrainerError> {
        let (documents, profile) = self.prepare(source)?;
        self.documents = documents;
        self.index = None;
        Ok(self.profile.insert(profile))
    }

    /// Load the corpus and fit a fresh index over it.
    ///
    /// Either fully succeeds, leaving the trainer `Trained`, or leaves the
    /// previous state untouched.
    pub fn train(&mut self, source: &dyn CorpusSource) -> Result<PersonalityProfile, TrainerError> {
        let (documents, profile) = self.prepare(source)?;
        let normalized: Vec<&str> = documents.iter().map(|d| d.normalized.as_str()).collect();
        let index = VectorIndex::fit(&normalized, self.config.max_features)?;

        info!(
            "Bot {} trained on {} documents ({} features)",
            self.bot_id,
            documents.len(),
            index.vocabulary_len()
        );

        self.documents = documents;
        self.index = Some(index);
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    fn prepare(
        &self,
        source: &dyn CorpusSource,
    ) -> Result<(Vec<TrainingDocument>, PersonalityProfile), TrainerError> {
        let scripts = source.fetch_scripts(self.bot_id).map_err(TrainerError::Source)?;
        if scripts.is_empty() {
            return Err(TrainerError::NoTrainingData { bot_id: self.bot_id });
        }

        let documents: Vec<TrainingDocument> = scripts.into_iter().map(TrainingDocument::new).collect();
        let normalized: Vec<&str> = documents.iter().map(|d| d.normalized.as_str()).collect();
        let profile = summarize(&normalized, self.config.top_terms)?;
        debug!("Bot {}: loaded {} scripts", self.bot_id, documents.len());
        Ok((documents, profile))
    }

    /// Index and score of the closest document. Ties go to the lowest index.
    pub fn best_match(&self, query: &str) -> Result<Match, TrainerError> {
        let index = self.index.as_ref().ok_or(TrainerError::NotTrained)?;
        let vector = index.transform(&normalize(query));
        let scores = index.similarities(&vector)?;

        let mut best = Match { index: 0, score: scores[0] };
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > best.score {
                best = Match { index: i, score };
            }
        }
        Ok(best)
    }

    /// Answer with the configured threshold.
    pub fn respond(&self, query: &str) -> Result<String, TrainerError> {
        self.respond_with_threshold(query, self.config.threshold)
    }

    /// Replay the raw text of the closest script, or the fallback reply when
    /// its similarity is below `threshold`.
    pub fn respond_with_threshold(&self, query: &str, threshold: f64) -> Result<String, TrainerError> {
        let best = self.best_match(query)?;
        debug!(
            "Bot {}: best match doc {} (score {:.3}, threshold {:.3})",
            self.bot_id, best.index, best.score, threshold
        );

        if best.score < threshold {
            return Ok(FALLBACK_REPLY.to_string());
        }
        Ok(self.documents[best.index].raw.clone())
    }
}
