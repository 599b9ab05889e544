mod callbacks;
mod config;
mod handlers;
mod keyboards;
mod rate_limit;
mod render;
mod state;
mod telegram_layer;

use std::sync::Arc;

use buzke_booking::ApiClient;
use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::time::{interval, Duration};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::BotState;
use crate::telegram_layer::TelegramLayer;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Perfil do estabelecimento")]
    Start,
    #[command(description = "Horários de atendimento")]
    Horarios,
    #[command(description = "Avaliações")]
    Avaliacoes,
    #[command(description = "Sair da sua conta")]
    Sair,
    #[command(description = "Ajuda")]
    Help,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .with(
            config
                .admin_tg_id
                .map(|id| TelegramLayer::new(config.bot_token.clone(), id)),
        )
        .init();

    let api = ApiClient::new(&config.api)?;
    let state = Arc::new(BotState::new(
        Arc::new(api),
        config.business_username.clone(),
        config.utc_offset,
    ));

    let bot = Bot::new(&config.bot_token);
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %err, "could not register bot commands");
    }

    tracing::info!(
        business = %config.business_username,
        api = %config.api.base_url,
        "Buzke booking bot starting..."
    );

    // Spawn cleanup task for the rate limiter and idle chats
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(300));
        loop {
            tick.tick().await;
            cleanup_state.limiter.cleanup();
            let evicted = cleanup_state.evict_idle();
            tracing::debug!(
                evicted,
                limited_chats = cleanup_state.limiter.tracked_chats(),
                chats = cleanup_state.active_chats(),
                sessions = cleanup_state.stored_sessions(),
                "idle state cleanup"
            );
        }
    });

    // Commands, inline buttons, then free text answering a prompt
    let cmd_handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint({
            let state = state.clone();
            move |bot: Bot, msg: Message, cmd: Command| {
                let state = state.clone();
                async move {
                    handlers::handle_command(bot, msg, cmd, &state).await?;
                    Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                }
            }
        });

    let callback_handler = Update::filter_callback_query().endpoint({
        let state = state.clone();
        move |bot: Bot, q: CallbackQuery| {
            let state = state.clone();
            async move {
                handlers::handle_callback(bot, q, &state).await?;
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        }
    });

    let text_handler = Update::filter_message().endpoint({
        let state = state.clone();
        move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move {
                handlers::handle_text(bot, msg, &state).await?;
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        }
    });

    let handler = dptree::entry()
        .branch(cmd_handler)
        .branch(callback_handler)
        .branch(text_handler);

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
