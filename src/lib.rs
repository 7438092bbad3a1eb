pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod notifications;

pub use db::DbPool;

use auth::TokenService;
use config::Config;
use notifications::EmailService;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub mailer: EmailService,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let tokens = TokenService::new(&config.auth.secret_key, config.auth.access_token_minutes);
        let mailer = EmailService::new(config.email.clone());
        Self {
            config,
            db,
            tokens,
            mailer,
        }
    }
}
