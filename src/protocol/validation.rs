//! Shape and bounds checks applied before any command touches room state.

use super::error_codes::{ErrorCode, RoomError};
use super::types::{
    RoomOptionsPatch, MAX_ITEMS_PER_GAME, MAX_ITEM_TEXT_LENGTH, MAX_NICKNAME_LENGTH,
    MAX_RANKING_TIMEOUT_S, MAX_TIMER_DURATION_S, MIN_ITEMS_PER_GAME, MIN_TIMER_DURATION_S,
    ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH,
};

/// Validate a nickname and return the trimmed form used for storage.
pub fn validate_nickname(nickname: &str) -> Result<&str, RoomError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(RoomError::with_message(
            ErrorCode::InvalidNickname,
            "Nickname cannot be empty",
        ));
    }
    if trimmed.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(RoomError::with_message(
            ErrorCode::InvalidNickname,
            format!("Nickname too long (max {MAX_NICKNAME_LENGTH} characters)"),
        ));
    }
    Ok(trimmed)
}

/// Validate a room code: exactly four uppercase letters from the clean
/// alphabet (`^[A-HJ-NP-Z]{4}$`).
pub fn validate_room_code(code: &str) -> Result<(), RoomError> {
    let valid = code.len() == ROOM_CODE_LENGTH
        && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
    if valid {
        Ok(())
    } else {
        Err(RoomError::new(ErrorCode::InvalidRoomCode))
    }
}

/// Validate item text and return the trimmed form used for storage.
pub fn validate_item_text(text: &str) -> Result<&str, RoomError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RoomError::with_message(
            ErrorCode::InvalidItemText,
            "Item text cannot be empty",
        ));
    }
    if trimmed.chars().count() > MAX_ITEM_TEXT_LENGTH {
        return Err(RoomError::with_message(
            ErrorCode::InvalidItemText,
            format!("Item text too long (max {MAX_ITEM_TEXT_LENGTH} characters)"),
        ));
    }
    Ok(trimmed)
}

/// Validate a ranking value against the room's configured item count.
pub fn validate_ranking(ranking: u32, items_per_game: u32) -> Result<(), RoomError> {
    if ranking >= 1 && ranking <= items_per_game {
        Ok(())
    } else {
        Err(RoomError::with_message(
            ErrorCode::InvalidRanking,
            format!("Ranking must be between 1 and {items_per_game}"),
        ))
    }
}

/// Validate every present field of a room options patch.
pub fn validate_options_patch(patch: &RoomOptionsPatch) -> Result<(), RoomError> {
    if let Some(duration) = patch.timer_duration_s {
        if !(MIN_TIMER_DURATION_S..=MAX_TIMER_DURATION_S).contains(&duration) {
            return Err(RoomError::with_message(
                ErrorCode::InvalidConfig,
                format!(
                    "timerDurationS must be between {MIN_TIMER_DURATION_S} and {MAX_TIMER_DURATION_S}"
                ),
            ));
        }
    }
    if let Some(timeout) = patch.ranking_timeout_s {
        if timeout > MAX_RANKING_TIMEOUT_S {
            return Err(RoomError::with_message(
                ErrorCode::InvalidConfig,
                format!("rankingTimeoutS must be at most {MAX_RANKING_TIMEOUT_S}"),
            ));
        }
    }
    if let Some(items) = patch.items_per_game {
        if !(MIN_ITEMS_PER_GAME..=MAX_ITEMS_PER_GAME).contains(&items) {
            return Err(RoomError::with_message(
                ErrorCode::InvalidConfig,
                format!(
                    "itemsPerGame must be between {MIN_ITEMS_PER_GAME} and {MAX_ITEMS_PER_GAME}"
                ),
            ));
        }
    }
    Ok(())
}

/// Case-fold a nickname for uniqueness comparison.
pub fn normalize_nickname(nickname: &str) -> String {
    nickname.trim().to_lowercase()
}

/// Normalize item text for uniqueness comparison: trim, collapse internal
/// whitespace runs, case-fold.
pub fn normalize_item_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_is_trimmed_and_bounded() {
        assert_eq!(validate_nickname("  alice  ").unwrap(), "alice");
        assert!(validate_nickname("   ").is_err());
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname(&"x".repeat(20)).is_ok());
        assert!(validate_nickname(&"x".repeat(21)).is_err());
    }

    #[test]
    fn room_code_grammar() {
        assert!(validate_room_code("ABCD").is_ok());
        assert!(validate_room_code("ZZZZ").is_ok());
        // Lowercase, wrong length, digits, and the excluded letters all fail.
        assert!(validate_room_code("abcd").is_err());
        assert!(validate_room_code("ABC").is_err());
        assert!(validate_room_code("ABCDE").is_err());
        assert!(validate_room_code("AB1D").is_err());
        assert!(validate_room_code("ABCI").is_err());
        assert!(validate_room_code("ABCO").is_err());
    }

    #[test]
    fn item_text_is_trimmed_and_bounded() {
        assert_eq!(validate_item_text(" pizza ").unwrap(), "pizza");
        assert!(validate_item_text("  ").is_err());
        assert!(validate_item_text(&"x".repeat(100)).is_ok());
        assert!(validate_item_text(&"x".repeat(101)).is_err());
    }

    #[test]
    fn ranking_bounds() {
        assert!(validate_ranking(1, 10).is_ok());
        assert!(validate_ranking(10, 10).is_ok());
        assert!(validate_ranking(0, 10).is_err());
        assert!(validate_ranking(11, 10).is_err());
    }

    #[test]
    fn options_patch_bounds() {
        let ok = RoomOptionsPatch {
            timer_duration_s: Some(60),
            ranking_timeout_s: Some(0),
            items_per_game: Some(2),
            ..RoomOptionsPatch::default()
        };
        assert!(validate_options_patch(&ok).is_ok());

        let too_short = RoomOptionsPatch {
            timer_duration_s: Some(9),
            ..RoomOptionsPatch::default()
        };
        assert!(validate_options_patch(&too_short).is_err());

        let too_many = RoomOptionsPatch {
            items_per_game: Some(51),
            ..RoomOptionsPatch::default()
        };
        assert!(validate_options_patch(&too_many).is_err());

        let too_few = RoomOptionsPatch {
            items_per_game: Some(1),
            ..RoomOptionsPatch::default()
        };
        assert!(validate_options_patch(&too_few).is_err());
    }

    #[test]
    fn item_text_normalization_collapses_whitespace() {
        assert_eq!(normalize_item_text("  Deep   Dish\tPizza "), "deep dish pizza");
        assert_eq!(
            normalize_item_text("deep dish pizza"),
            normalize_item_text("DEEP  DISH  PIZZA")
        );
    }

    #[test]
    fn nickname_normalization_is_case_insensitive() {
        assert_eq!(normalize_nickname(" Alice "), normalize_nickname("ALICE"));
    }
}
