use qf_db::models::{Flashcard, FlashcardSet, NewFlashcard, Visibility};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    validation::{optional_text, required_text},
};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_CARD_TEXT_LEN: usize = 500;
pub const MAX_CARDS: usize = 500;
pub const MAX_GENERATED_QUESTIONS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CardInput {
    pub term: String,
    pub definition: String,
}

/// Body of create and full-replace requests
#[derive(Debug, Deserialize)]
pub struct FlashcardSetInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    pub cards: Vec<CardInput>,
}

fn default_visibility() -> Visibility {
    Visibility::Private
}

/// Validated and trimmed set contents
#[derive(Debug)]
pub struct ValidSet {
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub cards: Vec<NewFlashcard>,
}

impl FlashcardSetInput {
    pub fn validate(self) -> Result<ValidSet, ApiError> {
        let title = required_text("Title", &self.title, MAX_TITLE_LEN)?;
        let description =
            optional_text("Description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;

        if self.cards.is_empty() || self.cards.len() > MAX_CARDS {
            return Err(ApiError::Validation(format!(
                "A flashcard set needs between 1 and {MAX_CARDS} cards"
            )));
        }

        let cards = self
            .cards
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let n = i + 1;
                Ok(NewFlashcard {
                    term: required_text(&format!("Card {n} term"), &card.term, MAX_CARD_TEXT_LEN)?,
                    definition: required_text(
                        &format!("Card {n} definition"),
                        &card.definition,
                        MAX_CARD_TEXT_LEN,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(ValidSet {
            title,
            description,
            visibility: self.visibility,
            cards,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FlashcardSetDetail {
    #[serde(flatten)]
    pub set: FlashcardSet,
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub question_count: usize,
    pub title: Option<String>,
}

impl GenerateQuizRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.question_count == 0 || self.question_count > MAX_GENERATED_QUESTIONS {
            return Err(ApiError::Validation(format!(
                "Question count must be between 1 and {MAX_GENERATED_QUESTIONS}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: serde_json::Value) -> FlashcardSetInput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_valid_set_is_trimmed() {
        let set = input(serde_json::json!({
            "title": "  Cell biology ",
            "cards": [{"term": " Mitochondria ", "definition": "Powerhouse of the cell"}]
        }))
        .validate()
        .unwrap();

        assert_eq!(set.title, "Cell biology");
        assert_eq!(set.visibility, Visibility::Private);
        assert_eq!(set.cards[0].term, "Mitochondria");
    }

    #[test]
    fn test_set_needs_cards() {
        let result = input(serde_json::json!({"title": "Empty", "cards": []})).validate();
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_blank_card_reports_position() {
        let result = input(serde_json::json!({
            "title": "Set",
            "cards": [
                {"term": "a", "definition": "b"},
                {"term": "c", "definition": "  "}
            ]
        }))
        .validate();

        match result {
            Err(ApiError::Validation(msg)) => assert!(msg.contains("Card 2 definition"), "{msg}"),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_request_bounds() {
        let req = |n| GenerateQuizRequest {
            question_count: n,
            title: None,
        };
        assert!(req(0).validate().is_err());
        assert!(req(1).validate().is_ok());
        assert!(req(MAX_GENERATED_QUESTIONS + 1).validate().is_err());
    }
}
