use rand::Rng;
use std::sync::OnceLock;
use tracing::{debug, error, info};

use crate::error::{Result, ServiceError};

// Built-in rejection reasons, loaded once at startup
pub const REASONS: [&str; 100] = [
    "My pet parrot doesn't approve of you",
    "I promised my Netflix account I'd stay loyal",
    "I'm secretly training to be a ninja",
    "Aliens told me you're not the chosen one",
    "I can't date anyone taller than my Wi-Fi router",
    "I'm married to my job… literally, we had a ceremony",
    "I only date people who can juggle flaming swords",
    "My horoscope said I should avoid you",
    "I'm saving myself for pizza",
    "I'm allergic to people born in your month",
    "I'm in a committed relationship with my bed",
    "I can't risk you finding out I'm Batman",
    "My therapist said I should only date imaginary friends",
    "I'm waiting for Hogwarts to send me a letter",
    "I swore an oath to never date until I beat Dark Souls",
    "I only date people who can moonwalk",
    "I'm too busy teaching my goldfish to swim",
    "My emotions are on vacation, so I'm unavailable",
    "I'm planning to travel back in time, relationships complicate that",
    "I might accidentally turn into a werewolf",
    "I'm still not over the ending of Game of Thrones",
    "We're too different — you like tea, I like coffee",
    "I'm focusing on my dream to become a professional napper",
    "I don't see this going anywhere… except maybe the circus",
    "My cat thinks it's a dog and needs therapy",
    "I'm already married to my PlayStation",
    "I only date people who can beat me at Mario Kart",
    "I'm allergic to commitment and peanuts",
    "I'm too busy binge-watching cooking shows I'll never try",
    "My imaginary friend gets jealous easily",
    "I'm saving myself for the next Marvel movie",
    "I'm secretly a vampire, and you're too sunny",
    "I only date people who can recite the alphabet backwards",
    "My dog said you're not cool enough",
    "I'm too busy trying to break a world record in napping",
    "I'm emotionally invested in my houseplants",
    "I'm waiting for Elon Musk to take me to Mars",
    "I'm allergic to people who don't like pineapple on pizza",
    "I'm too busy writing fanfiction about myself",
    "I'm in a complicated relationship with Wi-Fi",
    "I'm saving myself for tacos",
    "I'm too busy trying to teach my cat algebra",
    "I'm emotionally unavailable because my emotions are stuck in traffic",
    "I'm still recovering from losing in Uno",
    "I'm too busy practicing my evil laugh",
    "I'm waiting for my Hogwarts owl, can't commit until then",
    "I'm allergic to people who don't laugh at dad jokes",
    "I'm too busy building a pillow fort empire",
    "I'm emotionally drained from watching sad dog movies",
    "I'm saving myself for dessert",
    "I'm too busy trying to invent a new color",
    "I'm emotionally unavailable because my heart is on airplane mode",
    "I'm still recovering from losing my favorite pen",
    "I'm too busy training for the Olympics in procrastination",
    "I'm waiting for my spirit animal to approve",
    "I'm allergic to people who don't like memes",
    "I'm too busy trying to teach my fish to dance",
    "I'm emotionally unavailable because my feelings are on strike",
    "I'm still recovering from losing at Monopoly",
    "I'm too busy practicing my karaoke skills",
    "I'm saving myself for sushi",
    "I'm too busy trying to invent teleportation",
    "I'm emotionally unavailable because my heart is buffering",
    "I'm still recovering from losing my favorite sock",
    "I'm too busy training my hamster for a marathon",
    "I'm waiting for my horoscope to say yes",
    "I'm allergic to people who don't like chocolate",
    "I'm too busy trying to teach my dog to code",
    "I'm emotionally unavailable because my heart is on vacation",
    "I'm still recovering from losing at Scrabble",
    "I'm too busy practicing my moonwalk",
    "I'm saving myself for burgers",
    "I'm too busy trying to invent a new dance move",
    "I'm emotionally unavailable because my heart is in airplane mode",
    "I'm still recovering from losing my favorite hoodie",
    "I'm too busy training my turtle for a race",
    "I'm waiting for my fortune cookie to approve",
    "I'm allergic to people who don't like pizza",
    "I'm too busy trying to teach my parrot Shakespeare",
    "I'm emotionally unavailable because my heart is rebooting",
    "I'm still recovering from losing at chess",
    "I'm too busy practicing my juggling skills",
    "I'm saving myself for donuts",
    "I'm too busy trying to invent a new holiday",
    "I'm emotionally unavailable because my heart is in safe mode",
    "I'm still recovering from losing my favorite hat",
    "I'm too busy training my guinea pig for a talent show",
    "I'm waiting for my lucky number to appear",
    "I'm allergic to people who don't like ice cream",
    "I'm too busy trying to teach my cat yoga",
    "I'm emotionally unavailable because my heart is updating",
    "I'm still recovering from losing at poker",
    "I'm too busy practicing my breakdance",
    "I'm saving myself for pancakes",
    "I'm too busy trying to invent a new emoji",
    "I'm emotionally unavailable because my heart is charging",
    "I'm still recovering from losing my favorite book",
    "I'm too busy training my rabbit for a magic trick",
    "I'm waiting for my lucky star to shine",
    "I'm allergic to people who don't like fries",
];

// Write-once message set, read without locking after load
#[derive(Debug)]
pub struct MessageStore {
    expected: usize,
    messages: OnceLock<Box<[String]>>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self::with_expected(REASONS.len())
    }

    pub fn with_expected(expected: usize) -> Self {
        Self {
            expected,
            messages: OnceLock::new(),
        }
    }

    // Load the built-in reasons
    pub fn initialize(&self) -> Result<()> {
        self.load(REASONS.iter().map(|r| r.to_string()))
    }

    // Exactly `expected` non-blank messages, and only once
    pub fn load<I>(&self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        info!("Starting rejection reasons cache initialization...");

        let messages: Vec<String> = source.into_iter().collect();
        if messages.len() != self.expected {
            error!(
                loaded = messages.len(),
                expected = self.expected,
                "Failed to initialize rejection reasons cache"
            );
            return Err(ServiceError::StoreInit(format!(
                "expected {} reasons, loaded {}",
                self.expected,
                messages.len()
            )));
        }
        if let Some(idx) = messages.iter().position(|m| m.trim().is_empty()) {
            error!(index = idx, "Blank rejection reason in source");
            return Err(ServiceError::StoreInit(format!(
                "reason at index {} is blank",
                idx
            )));
        }

        let count = messages.len();
        let bytes = estimate_memory_usage(&messages);
        self.messages
            .set(messages.into_boxed_slice())
            .map_err(|_| ServiceError::StoreInit("cache already initialized".to_string()))?;

        info!("Successfully initialized {} rejection reasons in cache", count);
        debug!(bytes, "Cache initialization completed, estimated memory usage");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.messages.get().is_some()
    }

    // Zero until initialized
    pub fn size(&self) -> usize {
        self.messages.get().map_or(0, |m| m.len())
    }

    pub fn pick<R: Rng>(&self, rng: &mut R) -> Result<&str> {
        let Some(messages) = self.messages.get() else {
            error!("Attempted to access uninitialized rejection cache");
            return Err(ServiceError::NotReady);
        };

        let idx = rng.random_range(0..messages.len());
        let reason = messages[idx].as_str();
        debug!(index = idx, reason = %truncate(reason, 50), "Retrieved rejection reason");
        Ok(reason)
    }
}

// Rough estimate: heap bytes of each string plus its header
fn estimate_memory_usage(messages: &[String]) -> usize {
    messages
        .iter()
        .map(|m| m.len().saturating_add(std::mem::size_of::<String>()))
        .fold(0usize, usize::saturating_add)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ready_store() -> MessageStore {
        let store = MessageStore::new();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn builtin_reasons_are_unique_and_not_blank() {
        let unique: HashSet<_> = REASONS.iter().collect();
        assert_eq!(unique.len(), REASONS.len());
        assert!(REASONS.iter().all(|r| !r.trim().is_empty()));
    }

    #[test]
    fn initialize_makes_store_ready() {
        let store = MessageStore::new();
        assert!(!store.is_ready());
        assert_eq!(store.size(), 0);

        store.initialize().unwrap();
        assert!(store.is_ready());
        assert_eq!(store.size(), 100);
    }

    #[test]
    fn pick_always_returns_a_known_reason() {
        let store = ready_store();
        let known: HashSet<&str> = REASONS.iter().copied().collect();
        let mut rng = rand::rng();

        for _ in 0..1_000 {
            let reason = store.pick(&mut rng).unwrap();
            assert!(known.contains(reason));
        }
    }

    #[test]
    fn pick_before_initialize_is_not_ready() {
        let store = MessageStore::new();
        assert!(matches!(
            store.pick(&mut rand::rng()),
            Err(ServiceError::NotReady)
        ));
    }

    #[test]
    fn short_source_is_rejected() {
        let store = MessageStore::new();
        let err = store
            .load(REASONS.iter().take(99).map(|r| r.to_string()))
            .unwrap_err();
        assert!(matches!(err, ServiceError::StoreInit(_)));
        assert!(!store.is_ready());
    }

    #[test]
    fn blank_reason_is_rejected() {
        let store = MessageStore::with_expected(2);
        let err = store
            .load(vec!["fine".to_string(), "   ".to_string()])
            .unwrap_err();
        assert!(matches!(err, ServiceError::StoreInit(_)));
    }

    #[test]
    fn second_initialize_fails() {
        let store = ready_store();
        assert!(store.initialize().is_err());
        assert_eq!(store.size(), 100);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("a…b…c", 2), "a…...");
    }
}
