//! Conversation state, turn phases, and seed messages.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use ctlchat::SeedMessages;
//!
//! let seed = SeedMessages::new("You are a shopping assistant.");
//! let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date");
//! let prompt = seed.render(today);
//!
//! assert_eq!(prompt.len(), SeedMessages::LEN);
//! assert_eq!(prompt[1].text_content(), "The current date is Fri Oct 16 2026");
//! ```

use chrono::NaiveDate;
use ctlprovider::Message;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant operating a set of tools on \
behalf of the user. Call tools when they help answer the request, use their results, and answer \
concisely once you have what you need.";

const DATE_FORMAT: &str = "%a %b %d %Y";

/// The fixed system messages every conversation starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedMessages {
    instructions: String,
}

impl Default for SeedMessages {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS)
    }
}

impl SeedMessages {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Number of seed messages; the first non-seed message sits at this index.
    pub const LEN: usize = 2;

    pub fn render(&self, today: NaiveDate) -> Vec<Message> {
        let seed: [Message; Self::LEN] = [
            Message::system(self.instructions.clone()),
            Message::system(format!("The current date is {}", today.format(DATE_FORMAT))),
        ];
        seed.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingGeneration,
    ExecutingTools,
    /// Cancel requested; the turn unwinds at its next checkpoint.
    Cancelled,
}

/// Client-visible conversation state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub prompt: Vec<Message>,
    pub is_processing: bool,
    pub rate_limited: bool,
    pub phase: TurnPhase,
}

impl ConversationState {
    pub fn seeded(prompt: Vec<Message>) -> Self {
        Self {
            prompt,
            is_processing: false,
            rate_limited: false,
            phase: TurnPhase::Idle,
        }
    }

    /// Removes the first message after the seed. Returns false when only the
    /// seed is left.
    pub fn compact(&mut self, seed_len: usize) -> bool {
        if self.prompt.len() <= seed_len {
            return false;
        }

        self.prompt.remove(seed_len);
        true
    }
}

#[cfg(test)]
mod tests {
    use ctlprovider::Role;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).expect("valid date")
    }

    #[test]
    fn seed_date_matches_short_weekday_format() {
        let prompt = SeedMessages::default().render(today());
        assert_eq!(prompt[0].text_content(), DEFAULT_INSTRUCTIONS);
        assert_eq!(prompt[1].text_content(), "The current date is Mon Jan 05 2026");
    }

    #[test]
    fn every_seed_renders_exactly_its_declared_length() {
        for seed in [SeedMessages::default(), SeedMessages::new("")] {
            let prompt = seed.render(today());
            assert_eq!(prompt.len(), SeedMessages::LEN);
            assert!(prompt.iter().all(|message| message.role == Role::System));
        }
    }

    #[test]
    fn compaction_removes_first_message_after_seed() {
        let seed = SeedMessages::default();
        let mut state = ConversationState::seeded(seed.render(today()));
        state.prompt.push(Message::user("first"));
        state.prompt.push(Message::assistant("reply"));

        assert!(state.compact(SeedMessages::LEN));
        assert_eq!(state.prompt.len(), 3);
        assert_eq!(state.prompt[2].text_content(), "reply");
    }

    #[test]
    fn compaction_never_touches_the_seed() {
        let seed = SeedMessages::default();
        let mut state = ConversationState::seeded(seed.render(today()));

        assert!(!state.compact(SeedMessages::LEN));
        assert_eq!(state.prompt, seed.render(today()));
    }
}
