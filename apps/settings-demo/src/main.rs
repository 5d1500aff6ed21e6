//! Single-screen demo: a launch counter, a status toggle and a theme flag,
//! all persisted through typed settings.
//!
//! Configuration is read from `settings-demo.yaml` (optional) and
//! `SETTINGS_DEMO_*` environment variables, e.g.
//! `SETTINGS_DEMO_FILE_PATH=/tmp/demo.json`.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use typed_settings::keys::{bool_key_or, int_key_or, string_key_with_or};
use typed_settings::{
    converter, global, Config, ConversionError, Converter, DefaultKey, SettingsStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Active,
    Inactive,
}

fn status_converter() -> impl Converter<Status, String> {
    converter(
        |status: &Status| match status {
            Status::Active => "A".to_string(),
            Status::Inactive => "I".to_string(),
        },
        |raw: String| match raw.as_str() {
            "A" => Ok(Status::Active),
            "I" => Ok(Status::Inactive),
            _ => Err(ConversionError::unrecognized(raw)),
        },
    )
}

struct Screen {
    launches: DefaultKey<i32>,
    status: DefaultKey<Status, String>,
    dark_mode: DefaultKey<bool>,
}

impl Screen {
    fn new() -> Self {
        Self {
            launches: int_key_or("launches", 0),
            status: string_key_with_or("status", status_converter(), Status::Inactive),
            dark_mode: bool_key_or("dark_mode", false),
        }
    }

    async fn render(&self, title: &str) -> Result<()> {
        let store = global::get()?;
        let launches = store.read(&self.launches).await?;
        let status = store.read(&self.status).await?;
        let dark_mode = store.read(&self.dark_mode).await?;

        println!("+--------------------------------+");
        println!("| {:<30} |", title);
        println!("+--------------------------------+");
        println!("| launches  : {:<18} |", launches);
        println!("| status    : {:<18} |", format!("{:?}", status));
        println!("| dark mode : {:<18} |", dark_mode);
        println!("+--------------------------------+");
        Ok(())
    }

    /// What the buttons on the screen do; returns the new launch count
    async fn press_buttons(&self, store: &SettingsStore) -> Result<i32> {
        let launches = store.read(&self.launches).await?;
        let status = store.read(&self.status).await?;
        let dark_mode = store.read(&self.dark_mode).await?;

        let toggled = match status {
            Status::Active => Status::Inactive,
            Status::Inactive => Status::Active,
        };

        store
            .edit(|batch| {
                batch
                    .set(&self.launches, launches + 1)
                    .set(&self.status, toggled)
                    .set(&self.dark_mode, !dark_mode);
            })
            .await?;
        Ok(launches + 1)
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config: Config = Figment::new()
        .merge(Yaml::file("settings-demo.yaml"))
        .merge(Env::prefixed("SETTINGS_DEMO_"))
        .extract()
        .context("invalid settings-demo configuration")?;

    let store = Arc::new(SettingsStore::open(&config).await?);
    global::init(store.clone())?;

    let screen = Screen::new();

    // The screen observes the launch counter while it is shown
    let live_launches = store.materialize(&screen.launches, config.sharing_policy(), 0);
    let mut watcher = live_launches.subscribe();

    screen.render("Before").await?;
    let launches = screen.press_buttons(&store).await?;

    while watcher.current() != launches {
        if watcher.changed().await.is_none() {
            break;
        }
    }
    tracing::info!(launches = watcher.current(), "launch counter updated");
    screen.render("After").await?;

    Ok(())
}
