use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;
use uuid::Uuid;

use crate::{Question, QuestionKind, normalize_answer};

/// Maximum number of wrong options drawn for a generated question.
const MAX_DISTRACTORS: usize = 3;

/// A flashcard used as source material for quiz generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCard {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("At least two flashcards with different definitions are needed to generate a quiz")]
    NotEnoughCards,
    #[error("Question count must be at least 1")]
    ZeroQuestions,
}

/// Generate multiple-choice questions from flashcards.
///
/// Each question asks for the definition of a card's term. The correct
/// option is the card's definition; up to three distractors are the
/// definitions of other cards whose normalized text differs from the correct
/// one and from each other. Cards are sampled without replacement, so `count`
/// is clamped to the number of cards.
pub fn generate_questions<R>(
    cards: &[SourceCard],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Question>, GenerateError>
where
    R: Rng + ?Sized,
{
    if count == 0 {
        return Err(GenerateError::ZeroQuestions);
    }

    let distinct: HashSet<String> = cards
        .iter()
        .map(|c| normalize_answer(&c.definition))
        .collect();
    if distinct.len() < 2 {
        return Err(GenerateError::NotEnoughCards);
    }

    let picked: Vec<&SourceCard> = cards
        .choose_multiple(rng, count.min(cards.len()))
        .collect();

    let questions = picked
        .into_iter()
        .map(|card| build_question(card, cards, rng))
        .collect();

    Ok(questions)
}

fn build_question<R>(card: &SourceCard, pool: &[SourceCard], rng: &mut R) -> Question
where
    R: Rng + ?Sized,
{
    let mut seen = HashSet::new();
    seen.insert(normalize_answer(&card.definition));

    let mut candidates: Vec<&str> = pool
        .iter()
        .filter(|other| seen.insert(normalize_answer(&other.definition)))
        .map(|other| other.definition.as_str())
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(MAX_DISTRACTORS);

    let mut options: Vec<String> = candidates.into_iter().map(str::to_string).collect();
    options.push(card.definition.clone());
    options.shuffle(rng);

    let correct = options
        .iter()
        .position(|o| *o == card.definition)
        .unwrap_or_default();

    Question {
        id: Uuid::new_v4(),
        prompt: card.term.clone(),
        kind: QuestionKind::MultipleChoice { options, correct },
        points: 1,
    }
}
