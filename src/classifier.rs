//! Keyword-weighted intent classification.
//!
//! Every intent owns a static list of `(trigger, weight)` pairs. A trigger
//! scores when it occurs at the start of a word in the lower-cased subject and
//! content; a trigger that also appears in the subject scores double. The
//! winning category's confidence is its share of the total matched weight.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReplyError;

/// Confidence below this marks a classification for manual review.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.40;

/// Category returned when no trigger matches.
pub const FALLBACK_INTENT: Intent = Intent::Support;

const SUBJECT_WEIGHT_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Billing,
    Support,
    Bug,
    Feature,
}

impl Intent {
    /// Tie-break order: earlier entries win equal scores.
    pub const PRECEDENCE: [Intent; 4] = [Intent::Billing, Intent::Bug, Intent::Support, Intent::Feature];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Billing => "billing",
            Intent::Support => "support",
            Intent::Bug => "bug",
            Intent::Feature => "feature",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = ReplyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "billing" => Ok(Intent::Billing),
            "support" => Ok(Intent::Support),
            "bug" => Ok(Intent::Bug),
            "feature" => Ok(Intent::Feature),
            other => Err(ReplyError::InvalidInput(format!(
                "intent must be one of billing, support, bug, feature (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    pub needs_review: bool,
}

impl Classification {
    fn new(intent: Intent, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            intent,
            confidence,
            needs_review: needs_review(confidence),
        }
    }
}

pub fn needs_review(confidence: f64) -> bool {
    confidence < LOW_CONFIDENCE_THRESHOLD
}

static KEYWORD_RULES: &[(Intent, &[(&str, u32)])] = &[
    (
        Intent::Billing,
        &[
            ("invoice", 3),
            ("refund", 3),
            ("charge", 3),
            ("overcharge", 3),
            ("bill", 2),
            ("pay", 2),
            ("paid", 2),
            ("subscription", 2),
            ("receipt", 2),
            ("credit card", 2),
            ("account balance", 2),
            ("price", 1),
            ("pricing", 1),
            ("cost", 1),
        ],
    ),
    (
        Intent::Bug,
        &[
            ("crash", 3),
            ("bug", 3),
            ("error", 2),
            ("broken", 2),
            ("not working", 2),
            ("doesn't work", 2),
            ("stopped working", 2),
            ("glitch", 2),
            ("exception", 2),
            ("malfunction", 2),
            ("defect", 2),
            ("fail", 2),
            ("freeze", 2),
            ("incorrect", 1),
            ("wrong", 1),
        ],
    ),
    (
        Intent::Support,
        &[
            ("how do i", 3),
            ("how to", 2),
            ("help", 2),
            ("assist", 2),
            ("don't understand", 2),
            ("question", 1),
            ("can't", 1),
            ("cannot", 1),
            ("unable", 1),
            ("confused", 1),
            ("support", 1),
            ("guide", 1),
            ("tutorial", 1),
            ("explain", 1),
            ("configure", 1),
            ("problem", 1),
            ("issue", 1),
        ],
    ),
    (
        Intent::Feature,
        &[
            ("feature", 3),
            ("suggest", 3),
            ("would be nice", 3),
            ("would like", 2),
            ("would you consider", 2),
            ("enhancement", 2),
            ("could you add", 2),
            ("add support for", 2),
            ("wish", 2),
            ("improve", 1),
            ("integration", 1),
            ("capability", 1),
        ],
    ),
];

struct Trigger {
    intent: Intent,
    pattern: Regex,
    weight: u32,
}

static TRIGGERS: Lazy<Vec<Trigger>> = Lazy::new(|| {
    KEYWORD_RULES
        .iter()
        .flat_map(|(intent, rules)| {
            rules.iter().map(move |(phrase, weight)| Trigger {
                intent: *intent,
                pattern: Regex::new(&format!(r"\b{}", regex::escape(phrase)))
                    .expect("keyword trigger must compile"),
                weight: *weight,
            })
        })
        .collect()
});

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'")
}

/// Raw score per intent, in [`Intent::PRECEDENCE`] order.
pub fn score(subject: &str, content: &str) -> [(Intent, u32); 4] {
    let subject = normalize(subject);
    let text = format!("{subject} {}", normalize(content));

    let mut scores = Intent::PRECEDENCE.map(|intent| (intent, 0u32));
    for trigger in TRIGGERS.iter() {
        if !trigger.pattern.is_match(&text) {
            continue;
        }
        let weight = if trigger.pattern.is_match(&subject) {
            trigger.weight * SUBJECT_WEIGHT_MULTIPLIER
        } else {
            trigger.weight
        };
        if let Some(slot) = scores.iter_mut().find(|(intent, _)| *intent == trigger.intent) {
            slot.1 += weight;
        }
    }
    scores
}

pub fn classify(subject: &str, content: &str) -> Classification {
    let scores = score(subject, content);
    let total: u32 = scores.iter().map(|(_, value)| value).sum();
    if total == 0 {
        return Classification::new(FALLBACK_INTENT, 0.0);
    }

    // Strict comparison keeps the earliest intent in precedence order on ties.
    let (intent, best) = scores
        .iter()
        .copied()
        .fold((FALLBACK_INTENT, 0u32), |acc, candidate| {
            if candidate.1 > acc.1 {
                candidate
            } else {
                acc
            }
        });

    Classification::new(intent, f64::from(best) / f64::from(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_email_is_confident() {
        let result = classify("", "I was charged twice for invoice #9981");
        assert_eq!(result.intent, Intent::Billing);
        assert!(result.confidence > LOW_CONFIDENCE_THRESHOLD);
        assert!(!result.needs_review);
    }

    #[test]
    fn empty_input_falls_back_to_support() {
        let result = classify("", "");
        assert_eq!(result.intent, FALLBACK_INTENT);
        assert_eq!(result.confidence, 0.0);
        assert!(result.needs_review);
    }

    #[test]
    fn unmatched_text_falls_back_with_zero_confidence() {
        let result = classify("Hello there", "Just saying hi, nothing else.");
        assert_eq!(result.intent, Intent::Support);
        assert_eq!(result.confidence, 0.0);
        assert!(result.needs_review);
    }

    #[test]
    fn broken_order_is_a_bug() {
        let result = classify("", "Hi, my name is Alice, my order #12345 is broken");
        assert_eq!(result.intent, Intent::Bug);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn ties_follow_precedence() {
        // refund (3) against crash (3)
        let result = classify("", "refund crash");
        assert_eq!(result.intent, Intent::Billing);
        assert_eq!(result.confidence, 0.5);

        // crash (3) against feature (3)
        let result = classify("", "crash feature");
        assert_eq!(result.intent, Intent::Bug);
    }

    #[test]
    fn spread_evidence_needs_review() {
        let result = classify("", "refund crash help feature");
        assert_eq!(result.intent, Intent::Billing);
        assert!((result.confidence - 3.0 / 11.0).abs() < 1e-9);
        assert!(result.needs_review);
    }

    #[test]
    fn confidence_at_threshold_does_not_need_review() {
        // bill (2) against wrong, question and improve (1 each)
        let result = classify("", "bill wrong question improve");
        assert_eq!(result.intent, Intent::Billing);
        assert_eq!(result.confidence, 0.4);
        assert!(!result.needs_review);

        assert!(!needs_review(LOW_CONFIDENCE_THRESHOLD));
        assert!(needs_review(0.399));
    }

    #[test]
    fn subject_matches_count_double() {
        let scores = score("Refund", "please refund and help");
        assert_eq!(scores[0], (Intent::Billing, 6));
        assert_eq!(scores[2], (Intent::Support, 2));
    }

    #[test]
    fn triggers_match_word_prefixes_only() {
        assert_eq!(classify("", "I keep failing").intent, Intent::Bug);
        let debug = classify("", "debugging session");
        assert_eq!(debug.confidence, 0.0);
    }

    #[test]
    fn matching_is_case_insensitive_and_folds_apostrophes() {
        let result = classify("", "It DOESN\u{2019}T WORK at all");
        assert_eq!(result.intent, Intent::Bug);
    }

    #[test]
    fn diverse_samples_cover_every_intent() {
        let samples = [
            (
                "Invoice problem",
                "I was charged twice for my subscription. Please refund the duplicate payment for order #12345.",
                Intent::Billing,
            ),
            (
                "Need help",
                "I need assistance setting up my account and don't understand how to configure it properly.",
                Intent::Support,
            ),
            (
                "App crashes",
                "The application crashes on startup with error code 500. This bug needs to be fixed.",
                Intent::Bug,
            ),
            (
                "Feature suggestion",
                "Would you consider adding dark mode support? It would be a great enhancement.",
                Intent::Feature,
            ),
        ];
        for (subject, content, expected) in samples {
            let result = classify(subject, content);
            assert_eq!(result.intent, expected, "{subject}");
            assert!(!result.needs_review, "{subject}");
        }
    }

    #[test]
    fn classification_is_deterministic_and_bounded() {
        let inputs = [
            "",
            "   ",
            "refund refund refund",
            "how do i fix this error in my invoice?",
            "\u{1F600} emoji only",
        ];
        for text in inputs {
            let first = classify(text, text);
            let second = classify(text, text);
            assert_eq!(first, second);
            assert!((0.0..=1.0).contains(&first.confidence));
            assert_eq!(first.needs_review, first.confidence < LOW_CONFIDENCE_THRESHOLD);
        }
    }

    #[test]
    fn intent_parses_case_insensitively() {
        assert_eq!("Billing".parse::<Intent>().unwrap(), Intent::Billing);
        assert_eq!(" bug ".parse::<Intent>().unwrap(), Intent::Bug);
        assert!(matches!(
            "spam".parse::<Intent>(),
            Err(ReplyError::InvalidInput(_))
        ));
    }
}
