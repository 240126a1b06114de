//! `parley characters`: list character files in the data directory.

use std::path::Path;

use parley_core::repository::character::CharacterRepository;
use parley_infra::filesystem::character::TomlCharacterRepository;

pub async fn list_characters(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let repo = TomlCharacterRepository::new(data_dir);
    let characters = repo.list_characters().await?;

    if json {
        let list: Vec<serde_json::Value> = characters
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "description": c.description,
                    "culture": c.culture,
                    "voice": c.voice,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!();
    if characters.is_empty() {
        println!(
            "  No characters yet. Add a TOML file to {}",
            console::style(repo.dir().display()).cyan()
        );
        println!();
        return Ok(());
    }

    for character in &characters {
        let voice = character.voice.as_deref().unwrap_or("default voice");
        println!(
            "  {} {}  {}",
            console::style(&character.id).cyan().bold(),
            character.name,
            console::style(format!("({}, {voice})", character.culture)).dim()
        );
        if !character.description.is_empty() {
            println!("      {}", character.description);
        }
    }
    println!();
    Ok(())
}
