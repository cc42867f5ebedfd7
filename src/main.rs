use anyhow::Context;
use browser_components::components::{TextInput, Typeable};
use browser_components::{
    BasePage, BrowserFactory, Config, InteractionDriver, SelectorStrategy,
};
use clap::{Arg, Command};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "https://www.alphabin.co/blog/system-integration-testing-a-complete-guide";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("smoke")
        .version("0.1")
        .about("Opens a page, types into its search box and submits")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Page to open (overrides BASE_URL)"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .help("Show the browser window")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("search-label")
                .long("search-label")
                .default_value("Search")
                .help("Accessible label of the search input"),
        )
        .arg(
            Arg::new("search-text")
                .long("search-text")
                .default_value("System Integration Testing complete guide")
                .help("Text to type into the search input"),
        )
        .get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => Config::default(),
    };
    let mut config = config.apply_process_env()?;

    if matches.get_flag("headed") {
        config.browser.headless = false;
    }
    if let Some(url) = matches.get_one::<String>("url") {
        config.browser.base_url = Some(url.clone());
    }
    let base_url = config
        .browser
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let page = BrowserFactory::create_page(&config.browser).await?;
    let driver = Arc::new(InteractionDriver::with_config(page, config.interaction.clone()));

    let home = BasePage::new(Arc::clone(&driver), &base_url);
    home.goto(None).await?;

    let label = matches
        .get_one::<String>("search-label")
        .map(String::as_str)
        .unwrap_or("Search");
    let text = matches
        .get_one::<String>("search-text")
        .map(String::as_str)
        .unwrap_or_default();

    let search = TextInput::new(Arc::clone(&driver), SelectorStrategy::AccessibleLabel, label);
    search.slow_type(text).await;
    driver.press_key("Enter").await?;
    driver.delay(2000).await;

    info!("Landed on {}", home.current_url().await?);
    Ok(())
}
