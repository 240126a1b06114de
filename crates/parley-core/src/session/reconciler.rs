//! Interruption reconciliation.
//!
//! Decides how a new line of user text enters the conversation log given
//! what the session was doing when it arrived:
//!
//! - **Generating**, last utterance from the user: the reply to it was never
//!   produced, so the new text is merged into that utterance (`"a; b"`).
//! - **Speaking**: the reply is cut down to the words the user plausibly
//!   heard (with a trailing `...`), and the new utterance is prefixed with
//!   `[interrupts {character}]`. Past the nominal duration nothing is cut but
//!   the marker is still added; a completed playback moves the session to
//!   idle instead.
//! - Anything else: a plain append.
//!
//! Only the most recent utterance is ever rewritten.

use std::time::Duration;

use parley_types::activity::{Activity, ActivityState};
use parley_types::conversation::{Conversation, MessageRole, Utterance};

/// What reconciliation did to the log.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// A new user utterance was appended.
    Appended { utterance: Utterance },
    /// The text was merged into the pending user utterance.
    Merged { utterance: Utterance },
    /// The user spoke over the character. `truncated` is the rewritten reply,
    /// if any words were cut.
    Interrupted {
        truncated: Option<Utterance>,
        utterance: Utterance,
    },
}

impl Reconciliation {
    /// The user utterance the new text ended up in.
    pub fn utterance(&self) -> &Utterance {
        match self {
            Reconciliation::Appended { utterance }
            | Reconciliation::Merged { utterance }
            | Reconciliation::Interrupted { utterance, .. } => utterance,
        }
    }
}

/// Cut `text` to the words heard after `fraction` of its playback.
///
/// Keeps `ceil(fraction * words)` whitespace-separated words and appends
/// `...`. Returns `None` when nothing would be cut.
pub fn truncate_spoken(text: &str, fraction: f64) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let heard = (fraction.clamp(0.0, 1.0) * words.len() as f64).ceil() as usize;
    if heard >= words.len() {
        return None;
    }
    Some(format!("{}...", words[..heard].join(" ")))
}

/// Apply new user `text` to the log.
///
/// `elapsed` is how long the session has been in its current activity.
pub fn reconcile(
    conversation: &mut Conversation,
    activity: &ActivityState,
    elapsed: Duration,
    user: &str,
    character: &str,
    text: &str,
) -> Reconciliation {
    match &activity.activity {
        Activity::Generating => {
            let merged = conversation
                .last()
                .filter(|u| u.role == MessageRole::User)
                .map(|u| format!("{}; {}", u.text, text));
            if let Some(merged) = merged {
                if let Some(utterance) = conversation.rewrite_last(merged) {
                    return Reconciliation::Merged {
                        utterance: utterance.clone(),
                    };
                }
            }
            append(conversation, user, text.to_string())
        }
        Activity::Speaking(line) => {
            let fraction = spoken_fraction(elapsed, line.duration);
            let cut = conversation
                .last()
                .filter(|u| u.role == MessageRole::Assistant)
                .and_then(|u| truncate_spoken(&u.text, fraction));
            let truncated = cut.and_then(|t| conversation.rewrite_last(t).cloned());

            let marked = format!("[interrupts {character}] {text}");
            match append(conversation, user, marked) {
                Reconciliation::Appended { utterance } => Reconciliation::Interrupted {
                    truncated,
                    utterance,
                },
                other => other,
            }
        }
        _ => append(conversation, user, text.to_string()),
    }
}

/// Share of a line heard after `elapsed`, in `0.0..=1.0`. A zero duration
/// counts as fully heard.
fn spoken_fraction(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

fn append(conversation: &mut Conversation, user: &str, text: String) -> Reconciliation {
    let utterance = Utterance::new(conversation.id, MessageRole::User, user, text);
    Reconciliation::Appended {
        utterance: conversation.append(utterance).clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use parley_types::activity::SpokenLine;

    use super::*;

    fn state(activity: Activity) -> ActivityState {
        ActivityState {
            activity,
            entered_at: Instant::now(),
        }
    }

    fn speaking(text: &str, secs: f64) -> ActivityState {
        state(Activity::Speaking(SpokenLine {
            text: text.to_string(),
            duration: Duration::from_secs_f64(secs),
        }))
    }

    fn log(lines: &[(MessageRole, &str)]) -> Conversation {
        let mut conversation = Conversation::new("kate");
        let id = conversation.id;
        for (role, text) in lines {
            let sender = if *role == MessageRole::User { "Joe" } else { "Kate" };
            conversation.append(Utterance::new(id, *role, sender, *text));
        }
        conversation
    }

    fn texts(conversation: &Conversation) -> Vec<&str> {
        conversation
            .utterances()
            .iter()
            .map(|u| u.text.as_str())
            .collect()
    }

    #[test]
    fn test_truncate_spoken_keeps_ceiling_of_heard_words() {
        assert_eq!(
            truncate_spoken("This speech will be interrupted.", 0.5).as_deref(),
            Some("This speech will...")
        );
        assert_eq!(truncate_spoken("one two three", 0.1).as_deref(), Some("one..."));
        assert_eq!(truncate_spoken("one two three", 0.0).as_deref(), Some("..."));
    }

    #[test]
    fn test_truncate_spoken_nothing_to_cut() {
        assert_eq!(truncate_spoken("one two three", 1.0), None);
        assert_eq!(truncate_spoken("one two three", 0.9), None);
        assert_eq!(truncate_spoken("", 0.5), None);
    }

    #[test]
    fn test_idle_appends() {
        let mut conversation = log(&[(MessageRole::User, "Hi"), (MessageRole::Assistant, "Hello")]);
        let outcome = reconcile(
            &mut conversation,
            &state(Activity::Idle),
            Duration::ZERO,
            "Joe",
            "Kate",
            "How are you?",
        );

        assert!(matches!(outcome, Reconciliation::Appended { .. }));
        assert_eq!(outcome.utterance().sender, "Joe");
        assert_eq!(texts(&conversation), vec!["Hi", "Hello", "How are you?"]);
    }

    #[test]
    fn test_generating_merges_into_pending_user_utterance() {
        let mut conversation = log(&[(MessageRole::User, "Ping 1!")]);
        let first_id = conversation.last().unwrap().id;
        let outcome = reconcile(
            &mut conversation,
            &state(Activity::Generating),
            Duration::from_millis(200),
            "Joe",
            "Kate",
            "Ping 2!",
        );

        assert!(matches!(outcome, Reconciliation::Merged { .. }));
        assert_eq!(outcome.utterance().id, first_id);
        assert_eq!(texts(&conversation), vec!["Ping 1!; Ping 2!"]);
    }

    #[test]
    fn test_generating_after_reply_appends_without_marker() {
        let mut conversation = log(&[(MessageRole::User, "Hi"), (MessageRole::Assistant, "Hello")]);
        reconcile(
            &mut conversation,
            &state(Activity::Generating),
            Duration::ZERO,
            "Joe",
            "Kate",
            "Again",
        );
        assert_eq!(texts(&conversation), vec!["Hi", "Hello", "Again"]);
    }

    #[test]
    fn test_speaking_truncates_and_marks_interruption() {
        let reply = "This speech will be interrupted.";
        let mut conversation = log(&[(MessageRole::User, "Hello"), (MessageRole::Assistant, reply)]);
        let reply_id = conversation.last().unwrap().id;

        let outcome = reconcile(
            &mut conversation,
            &speaking(reply, 1.0),
            Duration::from_millis(500),
            "Joe",
            "Kate",
            "Wait!",
        );

        match &outcome {
            Reconciliation::Interrupted {
                truncated: Some(truncated),
                utterance,
            } => {
                assert_eq!(truncated.id, reply_id);
                assert_eq!(truncated.text, "This speech will...");
                assert_eq!(utterance.text, "[interrupts Kate] Wait!");
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert_eq!(
            texts(&conversation),
            vec!["Hello", "This speech will...", "[interrupts Kate] Wait!"]
        );
    }

    #[test]
    fn test_speaking_near_end_marks_without_truncating() {
        let reply = "one two three";
        let mut conversation = log(&[(MessageRole::Assistant, reply)]);
        let outcome = reconcile(
            &mut conversation,
            &speaking(reply, 1.0),
            Duration::from_millis(900),
            "Joe",
            "Kate",
            "Hm",
        );

        assert!(matches!(
            outcome,
            Reconciliation::Interrupted { truncated: None, .. }
        ));
        assert_eq!(texts(&conversation), vec!["one two three", "[interrupts Kate] Hm"]);
    }

    #[test]
    fn test_speaking_past_duration_marks_without_truncating() {
        let reply = "one two three";
        let mut conversation = log(&[(MessageRole::Assistant, reply)]);
        let outcome = reconcile(
            &mut conversation,
            &speaking(reply, 1.0),
            Duration::from_millis(1500),
            "Joe",
            "Kate",
            "Next",
        );

        assert!(matches!(
            outcome,
            Reconciliation::Interrupted { truncated: None, .. }
        ));
        assert_eq!(
            texts(&conversation),
            vec!["one two three", "[interrupts Kate] Next"]
        );
    }

    #[test]
    fn test_speaking_zero_duration_counts_as_heard() {
        let reply = "one two three";
        let mut conversation = log(&[(MessageRole::Assistant, reply)]);
        reconcile(
            &mut conversation,
            &speaking(reply, 0.0),
            Duration::ZERO,
            "Joe",
            "Kate",
            "Next",
        );
        assert_eq!(
            texts(&conversation),
            vec!["one two three", "[interrupts Kate] Next"]
        );
    }

    #[test]
    fn test_spoken_fraction_is_clamped() {
        let second = Duration::from_secs(1);
        assert_eq!(spoken_fraction(Duration::from_millis(500), second), 0.5);
        assert_eq!(spoken_fraction(Duration::from_secs(3), second), 1.0);
        assert_eq!(spoken_fraction(Duration::ZERO, Duration::ZERO), 1.0);
    }

    #[test]
    fn test_merge_into_empty_log_appends() {
        let mut conversation = log(&[]);
        reconcile(
            &mut conversation,
            &state(Activity::Generating),
            Duration::ZERO,
            "Joe",
            "Kate",
            "First",
        );
        assert_eq!(texts(&conversation), vec!["First"]);
    }
}
