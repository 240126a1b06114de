//! TOML character definitions.
//!
//! Each character lives in `{data_dir}/characters/{id}.toml`; the file stem is
//! the character id. Format:
//! ```text
//! name = "Kate"
//! personality = "Dry humour, quick to tease."
//! first_line = "Oh. You again."
//! voice = "kate"
//!
//! [[memories]]
//! keywords = ["engine", "car"]
//! text = "Kate rebuilt the engine of her first car herself."
//! ```

use std::path::{Path, PathBuf};

use parley_core::repository::character::CharacterRepository;
use parley_types::character::Character;
use parley_types::error::CharacterError;

use super::characters_dir;

/// Reads characters from TOML files on every lookup, so edits apply to the
/// next session without a restart.
pub struct TomlCharacterRepository {
    dir: PathBuf,
}

impl TomlCharacterRepository {
    /// Repository over `{data_dir}/characters/`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: characters_dir(data_dir),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{id}.toml")))
    }
}

/// Parse a character file's content, taking the id from the file stem.
pub fn parse_character(id: &str, path: &Path, content: &str) -> Result<Character, CharacterError> {
    let mut character: Character =
        toml::from_str(content).map_err(|e| CharacterError::InvalidFile {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;

    if character.name.trim().is_empty() {
        return Err(CharacterError::InvalidFile {
            path: path.display().to_string(),
            reason: "name must not be empty".to_string(),
        });
    }

    character.id = id.to_string();
    Ok(character)
}

impl CharacterRepository for TomlCharacterRepository {
    async fn get_character(&self, id: &str) -> Result<Character, CharacterError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| CharacterError::NotFound(id.to_string()))?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CharacterError::NotFound(id.to_string()));
            }
            Err(err) => return Err(CharacterError::FileSystemError(err.to_string())),
        };

        parse_character(id, &path, &content)
    }

    async fn list_characters(&self) -> Result<Vec<Character>, CharacterError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CharacterError::FileSystemError(err.to_string())),
        };

        let mut characters = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CharacterError::FileSystemError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match self.get_character(id).await {
                Ok(character) => characters.push(character),
                Err(err) => {
                    tracing::warn!("Skipping character file {}: {err}", path.display());
                }
            }
        }

        characters.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(characters)
    }
}
