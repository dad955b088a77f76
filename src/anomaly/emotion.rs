//! Emotion label → sentiment score policy table.
//!
//! Fixed, not learned. Labels are matched case-insensitively; anything not
//! in the table (including the classifier's `UNKNOWN`) scores 0.0.

const EMOTION_SCORES: &[(&str, f64)] = &[
    ("joy", 1.0),
    ("happy", 1.0),
    ("love", 0.8),
    ("surprise", 0.5),
    ("neutral", 0.0),
    ("sadness", -0.6),
    ("fear", -0.8),
    ("anger", -1.0),
    ("disgust", -1.0),
];

/// Sentiment score for an emotion label, in [-1.0, 1.0].
pub fn sentiment_score(emotion: &str) -> f64 {
    let label = emotion.trim().to_lowercase();
    EMOTION_SCORES
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(0.0, |(_, score)| *score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(sentiment_score("joy"), 1.0);
        assert_eq!(sentiment_score("love"), 0.8);
        assert_eq!(sentiment_score("neutral"), 0.0);
        assert_eq!(sentiment_score("sadness"), -0.6);
        assert_eq!(sentiment_score("anger"), -1.0);
        assert_eq!(sentiment_score("fear"), -0.8);
        assert_eq!(sentiment_score("disgust"), -1.0);
        assert_eq!(sentiment_score("surprise"), 0.5);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(sentiment_score("  Anger "), -1.0);
        assert_eq!(sentiment_score("JOY"), 1.0);
    }

    #[test]
    fn test_unknown_scores_zero() {
        assert_eq!(sentiment_score("UNKNOWN"), 0.0);
        assert_eq!(sentiment_score(""), 0.0);
        assert_eq!(sentiment_score("bewildered"), 0.0);
    }
}
