//! Keyboard and pointer simulation
//!
//! Per-keystroke events with randomized cadence so page frameworks that
//! listen to individual keys see natural-looking input.

use rand::Rng;
use serde::Deserialize;
use std::cell::RefCell;
use std::time::Duration;
use tokio::time::sleep;

use crate::dom::{Document, Event, EventKind, NodeId};
use crate::error::Result;

// Thread-local RNG
thread_local! {
    static RNG: RefCell<rand::rngs::ThreadRng> = RefCell::new(rand::thread_rng());
}

/// Keystroke cadence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingSpeed {
    /// No delays
    Instant,
    /// Minimal delays
    Fast,
    /// Balanced
    #[default]
    Normal,
    /// Maximum realism
    Slow,
}

impl TypingSpeed {
    fn type_delay_ms(&self) -> (u64, u64) {
        match self {
            TypingSpeed::Instant => (0, 0),
            TypingSpeed::Fast => (10, 30),
            TypingSpeed::Normal => (50, 150),
            TypingSpeed::Slow => (100, 300),
        }
    }

    fn click_delay_ms(&self) -> (u64, u64) {
        match self {
            TypingSpeed::Instant => (0, 0),
            TypingSpeed::Fast => (10, 30),
            TypingSpeed::Normal | TypingSpeed::Slow => (50, 120),
        }
    }

    /// Delay after typing `ch`
    fn key_delay(&self, ch: char) -> Duration {
        let (min, max) = self.type_delay_ms();
        if max == 0 {
            return Duration::ZERO;
        }
        let base = if ch == ' ' {
            random_range(min + 30, max + 30)
        } else if ch.is_ascii_punctuation() {
            random_range(min + 50, max + 50)
        } else {
            random_range(min, max)
        };

        // Occasional thinking pause
        let delay = if matches!(self, TypingSpeed::Normal | TypingSpeed::Slow) && random_bool(0.05) {
            base + random_range(200, 500)
        } else {
            base
        };
        Duration::from_millis(delay)
    }
}

fn random_range(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    RNG.with(|rng| rng.borrow_mut().gen_range(min..max))
}

fn random_bool(probability: f64) -> bool {
    RNG.with(|rng| rng.borrow_mut().gen_bool(probability))
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

/// Key name for a character as the `key` property reports it
fn key_name(ch: char) -> String {
    match ch {
        '\n' => "Enter".to_string(),
        '\t' => "Tab".to_string(),
        _ => ch.to_string(),
    }
}

/// Dispatches keyboard and pointer sequences against a document
#[derive(Debug, Clone, Copy)]
pub struct Typist {
    speed: TypingSpeed,
}

impl Typist {
    pub fn new(speed: TypingSpeed) -> Self {
        Self { speed }
    }

    pub fn speed(&self) -> TypingSpeed {
        self.speed
    }

    /// Type `text` into `target` one character at a time
    ///
    /// Each character fires keydown, keypress, input (when text was
    /// inserted), and keyup. A cancelled keydown inserts nothing. Returns
    /// the number of characters that reached the value.
    pub async fn type_text(&self, doc: &mut Document, target: NodeId, text: &str) -> Result<usize> {
        let mut inserted = 0;
        for ch in text.chars() {
            let key = key_name(ch);
            let accepted = doc.dispatch_event(Event::with_key(EventKind::KeyDown, target, key.as_str()))
                && doc.dispatch_event(Event::with_key(EventKind::KeyPress, target, key.as_str()));
            if accepted {
                let count = doc.insert_text(target, &ch.to_string())?;
                if count > 0 {
                    inserted += count;
                    doc.dispatch(target, EventKind::Input);
                }
            }
            doc.dispatch_event(Event::with_key(EventKind::KeyUp, target, key.as_str()));

            pause(self.speed.key_delay(ch)).await;
        }
        Ok(inserted)
    }

    /// Press and release a named key
    pub async fn press_key(&self, doc: &mut Document, target: NodeId, key: &str) {
        let (min, max) = self.speed.click_delay_ms();
        doc.dispatch_event(Event::with_key(EventKind::KeyDown, target, key));
        if key == "Enter" {
            doc.dispatch_event(Event::with_key(EventKind::KeyPress, target, key));
        }
        pause(Duration::from_millis(random_range(min, max))).await;
        doc.dispatch_event(Event::with_key(EventKind::KeyUp, target, key));
    }

    /// Pointer sequence: mousedown, focus, mouseup, click
    pub async fn click(&self, doc: &mut Document, target: NodeId) {
        let (min, max) = self.speed.click_delay_ms();
        doc.dispatch(target, EventKind::MouseDown);
        if doc.active_element() != Some(target) {
            doc.focus(target);
            doc.dispatch(target, EventKind::Focus);
        }
        pause(Duration::from_millis(random_range(min, max))).await;
        doc.dispatch(target, EventKind::MouseUp);
        doc.dispatch(target, EventKind::Click);
    }
}
