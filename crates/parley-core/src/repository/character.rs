//! Character repository trait definition.

use parley_types::character::Character;
use parley_types::error::CharacterError;

/// Read-only source of character cards.
pub trait CharacterRepository: Send + Sync {
    fn get_character(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Character, CharacterError>> + Send;

    /// All characters, ordered by id.
    fn list_characters(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, CharacterError>> + Send;
}
