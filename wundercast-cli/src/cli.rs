use anyhow::Context;
use clap::{Parser, Subcommand};
use wundercast_core::{Config, Coordinate, LocationFix};

use crate::{
    app::App,
    input::{self, Input},
    prompt, render,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wundercast", version, about = "Current weather by city or coordinate")]
pub struct Cli {
    /// API key to use for this run instead of the configured one.
    #[arg(long, global = true, env = "WUNDERCAST_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key in the config file.
    Configure,

    /// Show weather for one or more cities.
    Search {
        /// City names, searched one after another.
        #[arg(required = true)]
        cities: Vec<String>,
    },

    /// Show weather for a coordinate, as if reported by the device.
    Geo {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Horizontal accuracy of the fix in meters.
        #[arg(long, default_value_t = 5.0)]
        accuracy: f64,
    },

    /// Read searches from the terminal until `:quit`.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { cities } => {
                let mut app = App::start(load_config()?, self.api_key);
                for city in cities {
                    app.handle.submit_text(city);
                    app.print_next_weather().await?;
                }
                Ok(())
            }
            Command::Geo { lat, lon, accuracy } => {
                let mut app = App::start(load_config()?, self.api_key);
                if app.locate(LocationFix::new(Coordinate::new(lat, lon), accuracy))? {
                    app.print_next_weather().await?;
                }
                Ok(())
            }
            Command::Interactive => interactive(App::start(load_config()?, self.api_key)).await,
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().context("Failed to load configuration")
}

fn configure() -> anyhow::Result<()> {
    let mut config = load_config()?;
    let key = prompt::ask_api_key().context("No API key entered")?;

    config.set_api_key(key);
    config.save()?;

    let path = Config::config_file_path()?;
    println!("Saved API key to {}", path.display());
    Ok(())
}

async fn interactive(mut app: App) -> anyhow::Result<()> {
    println!("{}", input::HELP);

    loop {
        let line = tokio::task::spawn_blocking(|| inquire::Text::new("City:").prompt())
            .await
            .context("Input task failed")?;

        let line = match line {
            Ok(line) => line,
            Err(inquire::InquireError::OperationCanceled)
            | Err(inquire::InquireError::OperationInterrupted) => return Ok(()),
            Err(e) => return Err(e).context("Failed to read input"),
        };

        match input::parse(&line) {
            Ok(Input::Search(city)) => {
                if app.handle.submit_text(city) {
                    app.print_next_weather().await?;
                }
            }
            Ok(Input::Geo(fix)) => match app.locate(fix) {
                Ok(true) => app.print_next_weather().await?,
                Ok(false) => {}
                Err(e) => eprintln!("{}", render::error(&e)),
            },
            Ok(Input::Key) => {
                if let Ok(key) = prompt::ask_api_key() {
                    app.credentials.set_key(key);
                }
            }
            Ok(Input::Help) => println!("{}", input::HELP),
            Ok(Input::Quit) => return Ok(()),
            Ok(Input::Nothing) => {}
            Err(e) => eprintln!("{}", render::error(&e)),
        }
    }
}
