use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Answer, Question, QuestionKind, normalize_answer};

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
}

/// Outcome for a whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub results: Vec<QuestionResult>,
    pub score: u32,
    pub max_score: u32,
    /// Score as a percentage of `max_score`, rounded to two decimals.
    pub percentage: f64,
}

/// Grade one question against an optional answer.
///
/// A missing answer, or an answer of a different type than the question, is
/// graded as incorrect. Points are all or nothing.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let correct = match (&question.kind, answer) {
        (QuestionKind::MultipleChoice { correct, .. }, Some(Answer::MultipleChoice { choice })) => {
            choice == correct
        }
        (QuestionKind::MultiSelect { correct, .. }, Some(Answer::MultiSelect { choices })) => {
            let expected: BTreeSet<_> = correct.iter().copied().collect();
            let given: BTreeSet<_> = choices.iter().copied().collect();
            expected == given
        }
        (QuestionKind::TrueFalse { correct }, Some(Answer::TrueFalse { value })) => {
            value == correct
        }
        (QuestionKind::ShortAnswer { accepted }, Some(Answer::ShortAnswer { text })) => {
            let given = normalize_answer(text);
            !given.is_empty() && accepted.iter().any(|a| normalize_answer(a) == given)
        }
        _ => false,
    };

    QuestionResult {
        question_id: question.id,
        correct,
        points_awarded: if correct { question.points } else { 0 },
        points_possible: question.points,
    }
}

/// Grade a submission in a single pass over the quiz questions.
///
/// Answers keyed by ids that are not part of `questions` are ignored; callers
/// that want to reject them must check beforehand.
pub fn grade(questions: &[Question], answers: &HashMap<Uuid, Answer>) -> GradeReport {
    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| grade_question(q, answers.get(&q.id)))
        .collect();

    let score = results.iter().map(|r| r.points_awarded).sum();
    let max_score = results.iter().map(|r| r.points_possible).sum();

    GradeReport {
        results,
        score,
        max_score,
        percentage: percentage(score, max_score),
    }
}

fn percentage(score: u32, max_score: u32) -> f64 {
    if max_score == 0 {
        return 0.0;
    }
    let raw = f64::from(score) / f64::from(max_score) * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(correct: usize, points: u32) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "Pick one".to_string(),
            kind: QuestionKind::MultipleChoice {
                options: vec!["a".into(), "b".into(), "c".into()],
                correct,
            },
            points,
        }
    }

    #[test]
    fn test_grade_multiple_choice() {
        let q = mc(1, 3);
        let right = grade_question(&q, Some(&Answer::MultipleChoice { choice: 1 }));
        assert!(right.correct);
        assert_eq!(right.points_awarded, 3);

        let wrong = grade_question(&q, Some(&Answer::MultipleChoice { choice: 2 }));
        assert!(!wrong.correct);
        assert_eq!(wrong.points_awarded, 0);
        assert_eq!(wrong.points_possible, 3);

        // Out-of-range choice is simply wrong
        let out = grade_question(&q, Some(&Answer::MultipleChoice { choice: 99 }));
        assert!(!out.correct);
    }

    #[test]
    fn test_grade_multi_select_ignores_order_and_duplicates() {
        let q = Question {
            id: Uuid::new_v4(),
            prompt: "Primes".to_string(),
            kind: QuestionKind::MultiSelect {
                options: vec!["2".into(), "4".into(), "5".into(), "9".into()],
                correct: vec![0, 2],
            },
            points: 1,
        };

        let answer = Answer::MultiSelect {
            choices: vec![2, 0, 2],
        };
        assert!(grade_question(&q, Some(&answer)).correct);

        let partial = Answer::MultiSelect { choices: vec![0] };
        assert!(!grade_question(&q, Some(&partial)).correct);

        let extra = Answer::MultiSelect {
            choices: vec![0, 1, 2],
        };
        assert!(!grade_question(&q, Some(&extra)).correct);
    }

    #[test]
    fn test_grade_short_answer_normalizes() {
        let q = Question {
            id: Uuid::new_v4(),
            prompt: "Author of Germinal".to_string(),
            kind: QuestionKind::ShortAnswer {
                accepted: vec!["Émile Zola".to_string(), "Zola".to_string()],
            },
            points: 1,
        };

        for text in ["emile zola", "  ÉMILE   ZOLA ", "zola.", "Zola"] {
            let answer = Answer::ShortAnswer {
                text: text.to_string(),
            };
            assert!(grade_question(&q, Some(&answer)).correct, "{text} should match");
        }

        let blank = Answer::ShortAnswer {
            text: "!!!".to_string(),
        };
        assert!(!grade_question(&q, Some(&blank)).correct);
    }

    #[test]
    fn test_grade_type_mismatch_and_missing() {
        let q = Question {
            id: Uuid::new_v4(),
            prompt: "The sky is blue".to_string(),
            kind: QuestionKind::TrueFalse { correct: true },
            points: 1,
        };

        assert!(grade_question(&q, Some(&Answer::TrueFalse { value: true })).correct);
        assert!(!grade_question(&q, Some(&Answer::MultipleChoice { choice: 0 })).correct);
        assert!(!grade_question(&q, None).correct);
    }

    #[test]
    fn test_grade_report() {
        let q1 = mc(0, 2);
        let q2 = mc(1, 1);
        let q3 = mc(2, 1);

        let mut answers = HashMap::new();
        answers.insert(q1.id, Answer::MultipleChoice { choice: 0 });
        answers.insert(q2.id, Answer::MultipleChoice { choice: 0 });
        // q3 unanswered

        let report = grade(&[q1.clone(), q2, q3], &answers);
        assert_eq!(report.score, 2);
        assert_eq!(report.max_score, 4);
        assert_eq!(report.percentage, 50.0);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[0].question_id, q1.id);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }
}
