mod config;
mod input;
mod render;

use anyhow::bail;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use campus_chat::{ChatSession, SessionConfig, SessionDriver, SessionError};
use campus_client::{CredentialStore, GatewayConfig, GatewayTransport, RestClient, StoredCredentials};
use campus_types::ChannelRef;

use crate::config::CliConfig;
use crate::input::{HELP, Input};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus=info,campus_chat=debug".into()),
        )
        .init();

    let config = CliConfig::from_env()?;
    let store = CredentialStore::new(&config.credentials_path);
    let rest = RestClient::new(&config.api_url)?;

    let credentials = match store.load().await {
        Ok(Some(saved)) => {
            info!(user = %saved.viewer.id, "Resuming saved session");
            saved
        }
        Ok(None) => login(&rest, &config, &store).await?,
        Err(e) => {
            warn!("Ignoring saved session: {}", e);
            login(&rest, &config, &store).await?
        }
    };
    let viewer = credentials.viewer.clone();
    println!("Signed in as {}. Type /help for commands.", viewer.display_name());

    // Wiring
    let api = rest.with_token(credentials.token.clone());
    let (transport, events, gateway) = GatewayTransport::connect(GatewayConfig {
        url: config.gateway_url.clone(),
        token: credentials.token,
        reconnect_delay: config.reconnect_delay,
    });
    let session = ChatSession::new(viewer.clone(), transport, SessionConfig::default());
    let (driver, handle) = SessionDriver::new(session, api, events);
    let driver = tokio::spawn(driver.run());
    let renderer = tokio::spawn(render::run(handle.subscribe(), viewer.id.clone()));

    handle.refresh_groups()?;
    handle.open(ChannelRef::Forum)?;

    // Stdin arrives a whole line at a time, so keystrokes are never seen.
    // Peers' typing indicators are shown; this front-end sends none of its own.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Forum => handle.open(ChannelRef::Forum)?,
            Input::Group(group_id) => handle.open(ChannelRef::Group { group_id })?,
            Input::Groups => {
                let snapshot = handle.snapshot();
                if let Some(e) = &snapshot.groups_error {
                    println!("* last group request failed: {}", e);
                }
                for line in render::group_lines(&snapshot.groups) {
                    println!("{}", line);
                }
                handle.refresh_groups()?;
            }
            Input::Create { name, members } => handle.create_group(&name, members)?,
            Input::Who => {
                for line in render::roster_lines(&handle.snapshot().roster) {
                    println!("{}", line);
                }
            }
            Input::Logout => {
                store.clear().await?;
                println!("* saved session removed");
                break;
            }
            Input::Quit => break,
            Input::Say(text) if text.is_empty() => {}
            Input::Say(text) => match handle.send_message(&text) {
                Ok(()) => {}
                Err(e @ (SessionError::EmptyMessage | SessionError::MessageTooLong { .. })) => {
                    println!("* not sent: {}", e)
                }
                Err(e) => return Err(e.into()),
            },
            Input::Invalid(message) if message == HELP => println!("{}", HELP),
            Input::Invalid(message) => println!("* {}", message),
        }
    }

    handle.shutdown()?;
    driver.await?;
    renderer.abort();
    // The gateway task may be waiting out a reconnect delay
    gateway.abort();
    info!("Bye");
    Ok(())
}

async fn login(
    rest: &RestClient,
    config: &CliConfig,
    store: &CredentialStore,
) -> anyhow::Result<StoredCredentials> {
    let (Some(email), Some(password)) = (&config.email, &config.password) else {
        bail!("No saved session; set CAMPUS_EMAIL and CAMPUS_PASSWORD to log in");
    };

    let login = rest.login(email, password).await?;
    info!(user = %login.user.id, "Logged in");

    let credentials = StoredCredentials::new(login.token, login.user);
    if let Err(e) = store.save(&credentials).await {
        warn!("Could not remember session at {}: {}", store.path().display(), e);
    }
    Ok(credentials)
}
