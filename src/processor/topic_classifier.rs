use aho_corasick::AhoCorasick;

use crate::error::Result;
use crate::models::Topic;

pub const RETURN_KEYWORDS: [&str; 5] = ["return", "wrong", "sent", "returning", "refund"];

pub const DEFECT_KEYWORDS: [&str; 11] = [
    "fail",
    "broken",
    "defective",
    "leak",
    "noise",
    "cracked",
    "sagging",
    "weak",
    "faulty",
    "torn",
    "dead on arrival",
];

struct TopicRule {
    topic: Topic,
    matcher: AhoCorasick,
}

/// Keyword rules evaluated in order against the lowercased description; the first
/// rule with any substring hit decides the topic, otherwise `Question`.
///
/// Return is checked before Defect: "leaking, I want a refund" is a Return.
pub struct TopicClassifier {
    rules: Vec<TopicRule>,
}

impl TopicClassifier {
    pub fn new() -> Result<Self> {
        Self::from_keywords(&RETURN_KEYWORDS, &DEFECT_KEYWORDS)
    }

    pub fn from_keywords<S: AsRef<str>>(return_keywords: &[S], defect_keywords: &[S]) -> Result<Self> {
        let rules = vec![
            TopicRule {
                topic: Topic::Return,
                matcher: build_matcher(return_keywords)?,
            },
            TopicRule {
                topic: Topic::Defect,
                matcher: build_matcher(defect_keywords)?,
            },
        ];

        Ok(TopicClassifier { rules })
    }

    pub fn classify(&self, description: &str) -> Topic {
        let lowered = description.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(&lowered))
            .map(|rule| rule.topic)
            .unwrap_or(Topic::Question)
    }
}

fn build_matcher<S: AsRef<str>>(keywords: &[S]) -> Result<AhoCorasick> {
    let lowered: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    Ok(AhoCorasick::new(lowered)?)
}
