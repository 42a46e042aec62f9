use crate::cli::{Command, SettingCommand, UserCommand};
use crate::config::Config;
use crate::data::{schema, settings, users};
use anyhow::Context;
use sqlx::PgPool;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Main application struct holding the shared connection pool.
pub struct App {
    db_pool: PgPool,
}

impl App {
    /// Connect to the database and make sure the schema exists.
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let db_pool = crate::db::connect(config).await?;

        schema::initialize_schema(&db_pool).await?;

        Ok(App { db_pool })
    }

    /// Run a single command to completion and map the outcome to an exit code.
    pub async fn run(self, command: Command) -> ExitCode {
        let result = self.execute(command).await;
        self.db_pool.close().await;
        match result {
            Ok(code) => code,
            Err(e) => {
                error!(error = ?e, "command failed");
                ExitCode::FAILURE
            }
        }
    }

    async fn execute(&self, command: Command) -> anyhow::Result<ExitCode> {
        let pool = &self.db_pool;
        match command {
            // Schema is already in place after `App::new`
            Command::Init => {
                info!("schema ready");
            }
            Command::User(UserCommand::Ensure {
                identifier,
                name,
                track_activity,
            }) => match users::ensure_user(pool, &identifier, name.as_deref(), track_activity)
                .await?
            {
                Some(id) => println!("{id}"),
                None => {
                    warn!("identifier did not contain a usable user id");
                    return Ok(ExitCode::from(2));
                }
            },
            Command::User(UserCommand::Show { id }) => {
                let user = match users::UserId::new(id) {
                    Some(id) => users::get_user(pool, id).await?,
                    None => None,
                };
                match user {
                    Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
                    None => {
                        warn!(user_id = id, "user not found");
                        return Ok(ExitCode::from(2));
                    }
                }
            }
            Command::Setting(SettingCommand::Get { key }) => {
                match settings::get(pool, &key)
                    .await
                    .with_context(|| format!("Failed to read setting {key}"))?
                {
                    Some(value) => println!("{value}"),
                    None => {
                        warn!(key = %key, "setting not found");
                        return Ok(ExitCode::from(2));
                    }
                }
            }
            Command::Setting(SettingCommand::Set { key, value }) => {
                settings::set(pool, &key, &value)
                    .await
                    .with_context(|| format!("Failed to write setting {key}"))?;
                info!(key = %key, "setting stored");
            }
            Command::Setting(SettingCommand::Incr { key, by }) => {
                let value = settings::increment(pool, &key, by)
                    .await
                    .with_context(|| format!("Failed to increment setting {key}"))?;
                println!("{value}");
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
