//! Bot service - accounts, bots, scripts, training and conversations.
//!
//! The service owns the policy the trainer deliberately lacks: who may touch
//! which bot, when to retrain, and making sure a bot never has two training
//! runs in flight at once.

use std::collections::HashMap;
use std::fmt;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::chatbot::accounts::{hash_password, verify_password};
use crate::chatbot::database::Database;
use crate::chatbot::message::{
    Bot, BotUpdate, IncomingMessage, NewBot, Role, Script, StoredMessage, User,
};
use crate::chatbot::sessions::{AccessToken, SessionStore, DEFAULT_TOKEN_TTL_MINUTES};
use crate::trainer::{PersonalityProfile, ProfileSink, Trainer, TrainerConfig, TrainerError};

/// Default page size for list operations.
pub const DEFAULT_LIMIT: usize = 100;

/// Errors surfaced by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    NotFound(String),
    Forbidden(String),
    InvalidCredentials,
    Conflict(String),
    Validation(String),
    Training(TrainerError),
    Database(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{} not found", what),
            Self::Forbidden(msg) => write!(f, "not authorized: {}", msg),
            Self::InvalidCredentials => write!(f, "incorrect username or password"),
            Self::Conflict(msg) => write!(f, "conflict: {}", msg),
            Self::Validation(msg) => write!(f, "validation error: {}", msg),
            Self::Training(e) => write!(f, "training failed: {}", e),
            Self::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Training(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TrainerError> for ServiceError {
    fn from(e: TrainerError) -> Self {
        Self::Training(e)
    }
}

impl From<String> for ServiceError {
    fn from(msg: String) -> Self {
        Self::Database(msg)
    }
}

/// Outcome of an explicit training request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingResult {
    pub bot_id: i64,
    pub status: String,
    pub personality_profile: PersonalityProfile,
    pub trained_at: String,
}

/// A reply produced for an incoming platform message.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub conversation_id: i64,
    pub text: String,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub trainer: TrainerConfig,
    /// Lifetime of bearer tokens issued by [`BotService::login`].
    pub token_ttl_minutes: i64,
    /// Answer messages without writing them to the conversation log.
    pub dry_run: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig::default(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            dry_run: false,
        }
    }
}

/// The bot management service.
pub struct BotService {
    config: ServiceConfig,
    database: Arc<Database>,
    /// Trained models by bot id, dropped whenever the bot's scripts change.
    models: Mutex<HashMap<i64, Arc<Trainer>>>,
    /// One lock per bot so training runs for the same bot never overlap.
    training_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    sessions: SessionStore,
}

impl BotService {
    pub fn new(config: ServiceConfig, database: Arc<Database>) -> Self {
        let sessions = SessionStore::new(config.token_ttl_minutes);
        Self {
            config,
            database,
            models: Mutex::new(HashMap::new()),
            training_locks: Mutex::new(HashMap::new()),
            sessions,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ==================== ACCOUNTS ====================

    /// Register a new account.
    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        let username = username.trim();
        let email = email.trim();
        validate_username(username)?;
        validate_email(email)?;
        if password.len() < 8 {
            return Err(ServiceError::Validation("password must be at least 8 characters".into()));
        }

        if self.database.find_user_by_username(username)?.is_some() {
            return Err(ServiceError::Conflict(format!("username '{username}' is already registered")));
        }
        if self.database.find_user_by_email(email)?.is_some() {
            return Err(ServiceError::Conflict(format!("email '{email}' is already registered")));
        }

        let hash = hash_password(password).map_err(ServiceError::Validation)?;
        let user = self.database.create_user(username, email, &hash, role)?;
        info!("Registered {} '{}' ({})", role.as_str(), user.username, user.id);
        Ok(user)
    }

    /// Verify a username/password pair.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let Some(user) = self.database.find_user_by_username(username.trim())? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            warn!("Failed login for '{}'", user.username);
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<AccessToken, ServiceError> {
        let user = self.authenticate(username, password)?;
        let token = self.sessions.issue(user.id)?;
        info!("User '{}' logged in", user.username);
        Ok(token)
    }

    /// The account behind a bearer token. Unknown, expired and orphaned
    /// tokens are all rejected as bad credentials.
    pub fn user_for_token(&self, token: &str) -> Result<User, ServiceError> {
        let user_id = self.sessions.resolve(token)?.ok_or(ServiceError::InvalidCredentials)?;
        self.database.get_user(user_id)?.ok_or(ServiceError::InvalidCredentials)
    }

    pub fn get_user(&self, actor: &User, user_id: i64) -> Result<User, ServiceError> {
        if !actor.is_admin() && actor.id != user_id {
            return Err(ServiceError::Forbidden("cannot view other users".into()));
        }
        self.database
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::NotFound("User".into()))
    }

    pub fn list_users(&self, actor: &User) -> Result<Vec<User>, ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden("only admins can list users".into()));
        }
        Ok(self.database.list_users()?)
    }

    /// Change a user's email and/or password. Users may update themselves;
    /// admins may update anyone.
    pub fn update_user(
        &self,
        actor: &User,
        user_id: i64,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, ServiceError> {
        if !actor.is_admin() && actor.id != user_id {
            return Err(ServiceError::Forbidden("cannot update other users".into()));
        }
        if let Some(email) = email {
            validate_email(email)?;
            if let Some(existing) = self.database.find_user_by_email(email)?
                && existing.id != user_id
            {
                return Err(ServiceError::Conflict(format!("email '{email}' is already registered")));
            }
        }
        if let Some(password) = password
            && password.len() < 8
        {
            return Err(ServiceError::Validation("password must be at least 8 characters".into()));
        }

        let hash = password
            .map(hash_password)
            .transpose()
            .map_err(ServiceError::Validation)?;
        if !self.database.update_user(user_id, email, hash.as_deref())? {
            return Err(ServiceError::NotFound("User".into()));
        }
        if hash.is_some() {
            self.sessions.revoke_user(user_id)?;
        }
        self.database
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::NotFound("User".into()))
    }

    pub fn delete_user(&self, actor: &User, user_id: i64) -> Result<(), ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden("only admins can delete users".into()));
        }
        if !self.database.list_bots(Some(user_id), 0, 1)?.is_empty() {
            return Err(ServiceError::Conflict("user still owns bots".into()));
        }
        if !self.database.delete_user(user_id)? {
            return Err(ServiceError::NotFound("User".into()));
        }
        self.sessions.revoke_user(user_id)?;
        info!("Deleted user {}", user_id);
        Ok(())
    }

    // ==================== BOTS ====================

    pub fn create_bot(&self, owner: &User, bot: NewBot) -> Result<Bot, ServiceError> {
        let name = bot.name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(ServiceError::Validation("bot name must be 1-50 characters".into()));
        }
        if self.database.find_bot_by_name(name)?.is_some() {
            return Err(ServiceError::Conflict(format!("a bot named '{name}' already exists")));
        }

        let bot = NewBot { name: name.to_string(), ..bot };
        let created = self.database.create_bot(owner.id, &bot)?;
        info!("Created bot '{}' ({}) for {}", created.name, created.id, owner.username);
        Ok(created)
    }

    /// Bots visible to `actor`: all of them for admins, their own otherwise.
    pub fn list_bots(&self, actor: &User, skip: usize, limit: usize) -> Result<Vec<Bot>, ServiceError> {
        let owner = if actor.is_admin() { None } else { Some(actor.id) };
        Ok(self.database.list_bots(owner, skip, limit)?)
    }

    pub fn get_bot(&self, actor: &User, bot_id: i64) -> Result<Bot, ServiceError> {
        self.authorized_bot(actor, bot_id, "access")
    }

    pub fn update_bot(&self, actor: &User, bot_id: i64, update: BotUpdate) -> Result<Bot, ServiceError> {
        self.authorized_bot(actor, bot_id, "update")?;
        if let Some(name) = update.name.as_deref() {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("bot name must not be empty".into()));
            }
            if let Some(existing) = self.database.find_bot_by_name(name)?
                && existing.id != bot_id
            {
                return Err(ServiceError::Conflict(format!("a bot named '{name}' already exists")));
            }
        }
        self.database
            .update_bot(bot_id, &update)?
            .ok_or_else(|| ServiceError::NotFound("Bot".into()))
    }

    fn authorized_bot(&self, actor: &User, bot_id: i64, action: &str) -> Result<Bot, ServiceError> {
        let bot = self
            .database
            .get_bot(bot_id)?
            .ok_or_else(|| ServiceError::NotFound("Bot".into()))?;
        if !actor.is_admin() && bot.owner_id != actor.id {
            return Err(ServiceError::Forbidden(format!("cannot {action} bot {bot_id}")));
        }
        Ok(bot)
    }

    // ==================== SCRIPTS ====================

    /// Store a script for a bot and retrain it.
    pub fn add_script(&self, actor: &User, bot_id: i64, content: &str) -> Result<Script, ServiceError> {
        self.authorized_bot(actor, bot_id, "upload scripts for")?;
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("script is empty".into()));
        }

        let script = self.database.add_script(bot_id, content)?;
        info!("Added script {} to bot {}", script.id, bot_id);
        self.retrain_after_change(bot_id);
        Ok(script)
    }

    /// Store several scripts and retrain once at the end.
    pub fn add_scripts(&self, actor: &User, bot_id: i64, contents: &[String]) -> Result<Vec<Script>, ServiceError> {
        self.authorized_bot(actor, bot_id, "upload scripts for")?;
        if let Some(i) = contents.iter().position(|c| c.trim().is_empty()) {
            return Err(ServiceError::Validation(format!("script {} is empty", i + 1)));
        }

        let mut scripts = Vec::with_capacity(contents.len());
        for content in contents {
            scripts.push(self.database.add_script(bot_id, content)?);
        }
        info!("Added {} scripts to bot {}", scripts.len(), bot_id);
        if !scripts.is_empty() {
            self.retrain_after_change(bot_id);
        }
        Ok(scripts)
    }

    pub fn list_scripts(
        &self,
        actor: &User,
        bot_id: i64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Script>, ServiceError> {
        self.authorized_bot(actor, bot_id, "view scripts for")?;
        Ok(self.database.list_scripts(bot_id, skip, limit)?)
    }

    /// Delete a script and retrain its bot.
    pub fn delete_script(&self, actor: &User, script_id: i64) -> Result<Script, ServiceError> {
        let script = self
            .database
            .get_script(script_id)?
            .ok_or_else(|| ServiceError::NotFound("Script".into()))?;
        self.authorized_bot(actor, script.bot_id, "delete scripts for")?;

        self.database.delete_script(script_id)?;
        info!("Deleted script {} from bot {}", script_id, script.bot_id);
        self.retrain_after_change(script.bot_id);
        Ok(script)
    }

    // ==================== TRAINING ====================

    /// Train a bot on demand.
    pub fn train_bot(&self, actor: &User, bot_id: i64) -> Result<TrainingResult, ServiceError> {
        self.authorized_bot(actor, bot_id, "train")?;
        let profile = self.train(bot_id).inspect_err(|e| {
            warn!("Training failed for bot {}: {}", bot_id, e);
        })?;

        // Report the timestamp that was stored, not a second clock reading.
        let trained_at = self
            .database
            .get_bot(bot_id)?
            .and_then(|bot| bot.trained_at)
            .ok_or_else(|| ServiceError::NotFound("Bot".into()))?;

        Ok(TrainingResult {
            bot_id,
            status: "success".to_string(),
            personality_profile: profile,
            trained_at,
        })
    }

    /// Run a full training pass for `bot_id`, persist the profile and cache
    /// the model. Serialized per bot.
    pub fn train(&self, bot_id: i64) -> Result<PersonalityProfile, ServiceError> {
        self.fit(bot_id).map(|(profile, _)| profile)
    }

    /// The cached model is dropped under the training lock before fitting, so
    /// a failed run leaves nothing cached and no run can re-insert a model
    /// fitted on scripts read before a later change.
    fn fit(&self, bot_id: i64) -> Result<(PersonalityProfile, Arc<Trainer>), ServiceError> {
        let lock = self.training_lock(bot_id)?;
        let _guard = lock.lock().map_err(|_| ServiceError::Database("training lock poisoned".into()))?;

        self.models()?.remove(&bot_id);

        let mut trainer = Trainer::new(bot_id, self.config.trainer);
        let profile = trainer.train(self.database.as_ref())?;
        self.database.save_personality(bot_id, &profile)?;

        let trainer = Arc::new(trainer);
        self.models()?.insert(bot_id, trainer.clone());
        Ok((profile, trainer))
    }

    /// Scripts changed: retrain. A failed retrain is logged, not returned, so
    /// the script change itself still succeeds.
    fn retrain_after_change(&self, bot_id: i64) {
        if let Err(e) = self.train(bot_id) {
            warn!("Retraining bot {} after script change failed: {}", bot_id, e);
        }
    }

    /// Trained model for a bot, training it first if nothing is cached.
    pub fn model(&self, bot_id: i64) -> Result<Arc<Trainer>, ServiceError> {
        if let Some(model) = self.models()?.get(&bot_id) {
            return Ok(model.clone());
        }
        debug!("No cached model for bot {}, training", bot_id);
        self.fit(bot_id).map(|(_, model)| model)
    }

    pub fn is_cached(&self, bot_id: i64) -> bool {
        self.models().map(|m| m.contains_key(&bot_id)).unwrap_or(false)
    }

    fn models(&self) -> Result<MutexGuard<'_, HashMap<i64, Arc<Trainer>>>, ServiceError> {
        self.models.lock().map_err(|_| ServiceError::Database("model cache lock poisoned".into()))
    }

    fn training_lock(&self, bot_id: i64) -> Result<Arc<Mutex<()>>, ServiceError> {
        let mut locks = self
            .training_locks
            .lock()
            .map_err(|_| ServiceError::Database("training lock registry poisoned".into()))?;
        Ok(locks.entry(bot_id).or_default().clone())
    }

    // ==================== CONVERSATIONS ====================

    /// Answer a message that arrived through a platform webhook.
    pub fn handle_incoming(&self, bot_id: i64, msg: &IncomingMessage) -> Result<Reply, ServiceError> {
        let bot = self
            .database
            .get_bot(bot_id)?
            .ok_or_else(|| ServiceError::NotFound("Bot".into()))?;

        let preview: String = msg.text.chars().take(50).collect();
        info!("📨 {} {} -> bot {}: \"{}\"", msg.platform, msg.sender_id, bot.id, preview);

        // An untrainable bot leaves no trace of the message.
        let model = self.model(bot.id)?;

        let conversation = self
            .database
            .find_or_create_conversation(msg.platform, &msg.sender_id, bot.id)?;

        if !self.config.dry_run {
            self.database.add_message(conversation.id, &msg.text, true, &now())?;
        }

        let text = model.respond(&msg.text)?;

        if self.config.dry_run {
            info!("[DRY RUN] Would record reply to {}", msg.sender_id);
        } else {
            self.database.add_message(conversation.id, &text, false, &now())?;
        }

        Ok(Reply { conversation_id: conversation.id, text })
    }

    /// Recent history of a conversation, oldest first.
    pub fn conversation_history(
        &self,
        actor: &User,
        bot_id: i64,
        conversation_id: i64,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ServiceError> {
        self.authorized_bot(actor, bot_id, "read conversations of")?;
        let belongs = self
            .database
            .list_conversations(bot_id)?
            .iter()
            .any(|c| c.id == conversation_id);
        if !belongs {
            return Err(ServiceError::NotFound("Conversation".into()));
        }
        Ok(self.database.get_messages(conversation_id, limit)?)
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn validate_username(username: &str) -> Result<(), ServiceError> {
    let len = username.chars().count();
    if len < 3 || len > 50 {
        return Err(ServiceError::Validation("username must be 3-50 characters".into()));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
        return Err(ServiceError::Validation("username may only contain letters, digits, '_', '-' and '.'".into()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid || email.len() > 100 {
        return Err(ServiceError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(())
}
