//! `parley config`: print the effective configuration.

use std::path::Path;

use parley_types::config::ServerConfig;

pub fn show_config(data_dir: &Path, config: &ServerConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let on_off = |enabled: bool| {
        if enabled {
            format!("{}", console::style("on").green())
        } else {
            format!("{}", console::style("off").dim())
        }
    };

    println!();
    println!(
        "  {} {}",
        console::style("Data directory").bold(),
        data_dir.display()
    );
    println!();
    println!(
        "  {:<14} {}:{} ({})",
        "server",
        config.server.host,
        config.server.port,
        config.server.public_base_url
    );
    println!(
        "  {:<14} {} {} at {} (key from ${})",
        "llm",
        config.llm.provider,
        console::style(&config.llm.model).cyan(),
        config.llm.base_url,
        config.llm.api_key_env
    );
    println!(
        "  {:<14} {} {} -> {} [{}]",
        "speech",
        on_off(config.speech.enabled),
        config.speech.service,
        config.speech.endpoint,
        config.speech.format
    );
    println!(
        "  {:<14} {} (keep {} recent)",
        "summarization",
        on_off(config.summarization.enabled),
        config.summarization.keep_recent
    );
    println!("  {:<14} {}", "profile", config.profile.name);
    println!();
    Ok(())
}
