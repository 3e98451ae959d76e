//! Chat safety moderation
//!
//! Scans chat messages for attempts to move payment off the platform.
//! The moderator only annotates messages; it never blocks delivery. The
//! chat transport itself lives outside the engine.

/// Keywords that indicate an off-platform payment attempt
const UNSAFE_KEYWORDS: &[&str] = &[
    "cash",
    "outside",
    "bank transfer",
    "vodafone cash",
    "orange money",
    "etisalat cash",
];

/// Word sequences matched in order with arbitrary gaps, so "off the
/// platform" or "direct bank payment" still trip the filter
const UNSAFE_SEQUENCES: &[&[&str]] = &[&["off", "platform"], &["direct", "payment"]];

/// Softer contact patterns that warrant a warning, not a flag
const WARNING_KEYWORDS: &[&str] = &["call me", "whatsapp", "telegram"];

const WARNING_SEQUENCES: &[&[&str]] = &[&["contact", "me", "directly"]];

const UNSAFE_REASON: &str = "Message contains patterns suggesting off-platform payment. \
     Keep all transactions within the app for your safety.";

const WARNING_REASON: &str = "Warning: keep all communications and payments within the \
     platform for your protection.";

/// Moderation verdict attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub reason: Option<String>,
}

impl SafetyVerdict {
    fn safe() -> Self {
        Self {
            is_safe: true,
            reason: None,
        }
    }
}

/// Keyword-based chat safety moderator
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyModerator;

impl SafetyModerator {
    pub fn new() -> Self {
        Self
    }

    /// Check a message. Unsafe content flags it with a reason; contact
    /// hints keep it safe but attach a warning.
    pub fn check(&self, message: &str) -> SafetyVerdict {
        let lowered = message.to_lowercase();

        if contains_phone_number(&lowered)
            || UNSAFE_KEYWORDS.iter().any(|k| lowered.contains(k))
            || UNSAFE_SEQUENCES.iter().any(|s| contains_in_order(&lowered, s))
        {
            return SafetyVerdict {
                is_safe: false,
                reason: Some(UNSAFE_REASON.to_string()),
            };
        }

        if WARNING_KEYWORDS.iter().any(|k| lowered.contains(k))
            || WARNING_SEQUENCES.iter().any(|s| contains_in_order(&lowered, s))
        {
            return SafetyVerdict {
                is_safe: true,
                reason: Some(WARNING_REASON.to_string()),
            };
        }

        SafetyVerdict::safe()
    }
}

/// Match each word of the sequence in order, allowing anything in between
fn contains_in_order(text: &str, words: &[&str]) -> bool {
    let mut rest = text;
    for word in words {
        match rest.find(word) {
            Some(pos) => rest = &rest[pos + word.len()..],
            None => return false,
        }
    }
    true
}

/// Detect an Egyptian mobile number: "01" followed by at least nine more
/// contiguous digits anywhere in the text.
fn contains_phone_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        if bytes[start] == b'0'
            && bytes.get(start + 1) == Some(&b'1')
            && bytes
                .get(start + 2..)
                .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
                >= 9
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_message_passes() {
        let verdict = SafetyModerator::new().check("Can you come Tuesday morning?");
        assert!(verdict.is_safe);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn off_platform_payment_is_flagged() {
        let moderator = SafetyModerator::new();
        for message in [
            "I'll pay you in cash when you arrive",
            "let's do a bank transfer instead",
            "send it to my vodafone cash",
        ] {
            let verdict = moderator.check(message);
            assert!(!verdict.is_safe, "expected flag for: {message}");
            assert!(verdict.reason.is_some());
        }
    }

    #[test]
    fn intervening_words_do_not_defeat_the_filter() {
        let moderator = SafetyModerator::new();
        for message in [
            "let's take this off the platform",
            "I prefer a direct bank payment",
        ] {
            let verdict = moderator.check(message);
            assert!(!verdict.is_safe, "expected flag for: {message}");
        }

        let verdict = moderator.check("better to contact me about this directly");
        assert!(verdict.is_safe);
        assert!(verdict.reason.is_some());
    }

    #[test]
    fn phone_numbers_are_flagged() {
        let verdict = SafetyModerator::new().check("reach me at 01012345678 anytime");
        assert!(!verdict.is_safe);
    }

    #[test]
    fn short_digit_runs_are_not_phone_numbers() {
        let verdict = SafetyModerator::new().check("apartment 0112, third floor");
        assert!(verdict.is_safe);
    }

    #[test]
    fn contact_hints_warn_but_stay_safe() {
        let verdict = SafetyModerator::new().check("you can message me on whatsapp");
        assert!(verdict.is_safe);
        assert!(verdict.reason.is_some());
    }
}
