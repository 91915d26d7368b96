//! Thumbs up/down feedback on answers.
//!
//! [`FeedbackController`] owns no state of its own: everything lives in a
//! [`FeedbackStore`] keyed by message id, handed in by whoever owns the view.
//! Transitions return a [`FeedbackOutcome`] telling the caller which value,
//! if any, to send to the feedback API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{FeedbackToken, RawAnswer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reasons", rename_all = "snake_case")]
pub enum FeedbackState {
    Neutral,
    Positive,
    Negative,
    Reasons(Vec<FeedbackToken>),
}

impl FeedbackState {
    /// State implied by the feedback value stored with a message.
    pub fn from_stored(value: Option<&str>) -> Option<Self> {
        let value = value?;
        let tokens: Vec<&str> = value.split(',').map(str::trim).collect();

        if tokens.len() > 1 {
            let reasons: Option<Vec<FeedbackToken>> = tokens
                .iter()
                .map(|token| FeedbackToken::from_wire(token).filter(|t| t.is_reason()))
                .collect();
            return Some(match reasons {
                Some(reasons) => FeedbackState::Reasons(reasons),
                None => FeedbackState::Negative,
            });
        }

        let state = match FeedbackToken::from_wire(value) {
            Some(FeedbackToken::Positive) => FeedbackState::Positive,
            Some(FeedbackToken::Negative) => FeedbackState::Negative,
            Some(FeedbackToken::Neutral) | None => FeedbackState::Neutral,
            Some(reason) => FeedbackState::Reasons(vec![reason]),
        };
        Some(state)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, FeedbackState::Negative | FeedbackState::Reasons(_))
    }

    pub fn wire_value(&self) -> String {
        match self {
            FeedbackState::Neutral => FeedbackToken::Neutral.as_str().to_string(),
            FeedbackState::Positive => FeedbackToken::Positive.as_str().to_string(),
            FeedbackState::Negative => FeedbackToken::Negative.as_str().to_string(),
            FeedbackState::Reasons(reasons) => join_reasons(reasons),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPhase {
    #[default]
    Collecting,
    ReportingAbuse,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("select at least one reason before submitting")]
    NoReasonSelected,
    #[error("{0:?} is not offered on this panel")]
    ReasonNotOffered(FeedbackToken),
    #[error("no feedback dialog is open for this answer")]
    NotOpen,
    #[error("answer has no message id")]
    MissingMessageId,
}

/// The reason-selection dialog opened by a thumbs down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDialog {
    pub phase: DialogPhase,
    pub selected: Vec<FeedbackToken>,
}

impl FeedbackDialog {
    pub fn offers(&self, reason: FeedbackToken) -> bool {
        match self.phase {
            DialogPhase::Collecting => reason.is_reason() && !reason.is_harmful(),
            DialogPhase::ReportingAbuse => reason.is_harmful(),
        }
    }

    pub fn toggle(&mut self, reason: FeedbackToken, checked: bool) -> Result<(), DialogError> {
        if !self.offers(reason) {
            return Err(DialogError::ReasonNotOffered(reason));
        }
        if checked {
            if !self.selected.contains(&reason) {
                self.selected.push(reason);
            }
        } else {
            self.selected.retain(|selected| *selected != reason);
        }
        Ok(())
    }

    /// Switch to the "report inappropriate content" panel. Earlier picks are kept.
    pub fn report_inappropriate(&mut self) {
        self.phase = DialogPhase::ReportingAbuse;
    }

    pub fn can_submit(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Comma-joined reason codes to persist.
    pub fn submit(&self) -> Result<String, DialogError> {
        if !self.can_submit() {
            return Err(DialogError::NoReasonSelected);
        }
        Ok(join_reasons(&self.selected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DialogEvent {
    Toggle { reason: FeedbackToken, checked: bool },
    ReportInappropriate,
    Submit,
    Dismiss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub state: Option<FeedbackState>,
    pub dialog: Option<FeedbackDialog>,
}

/// Keyed feedback state shared across a view.
pub trait FeedbackStore: Send + Sync {
    fn read(&self, message_id: &str) -> Option<FeedbackEntry>;

    /// Apply `change` to the entry for `message_id` in one atomic step. A
    /// missing entry starts out empty.
    fn update_with<R, F>(&self, message_id: &str, change: F) -> R
    where
        F: FnOnce(&mut FeedbackEntry) -> R;
}

#[derive(Clone, Default)]
pub struct InMemoryFeedbackStore {
    entries: Arc<Mutex<HashMap<String, FeedbackEntry>>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FeedbackEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FeedbackStore for InMemoryFeedbackStore {
    fn read(&self, message_id: &str) -> Option<FeedbackEntry> {
        self.lock().get(message_id).cloned()
    }

    fn update_with<R, F>(&self, message_id: &str, change: F) -> R
    where
        F: FnOnce(&mut FeedbackEntry) -> R,
    {
        let mut entries = self.lock();
        change(entries.entry(message_id.to_string()).or_default())
    }
}

/// The answer a feedback action applies to.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackTarget<'a> {
    pub message_id: Option<&'a str>,
    pub stored: Option<&'a str>,
}

impl<'a> From<&'a RawAnswer> for FeedbackTarget<'a> {
    fn from(answer: &'a RawAnswer) -> Self {
        Self {
            message_id: answer.message_id.as_deref(),
            stored: answer.feedback.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub state: FeedbackState,
    pub dialog: Option<FeedbackDialog>,
    /// Value to send to the feedback API, if this transition persists one.
    pub persist: Option<String>,
}

#[derive(Clone)]
pub struct FeedbackController<S> {
    store: S,
}

impl<S: FeedbackStore> FeedbackController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current state: the shared store first, then the value stored with the message.
    pub fn current(&self, target: FeedbackTarget<'_>) -> Option<FeedbackState> {
        let message_id = target.message_id?;
        self.store
            .read(message_id)
            .and_then(|entry| entry.state)
            .or_else(|| FeedbackState::from_stored(target.stored))
    }

    pub fn like(&self, target: FeedbackTarget<'_>) -> Option<FeedbackOutcome> {
        let message_id = target.message_id?;
        let outcome = self.store.update_with(message_id, |entry| {
            let state = match effective_state(entry, target.stored) {
                Some(FeedbackState::Positive) => FeedbackState::Neutral,
                _ => FeedbackState::Positive,
            };
            entry.state = Some(state.clone());

            FeedbackOutcome {
                persist: Some(state.wire_value()),
                state,
                dialog: entry.dialog.clone(),
            }
        });
        Some(outcome)
    }

    pub fn dislike(&self, target: FeedbackTarget<'_>) -> Option<FeedbackOutcome> {
        let message_id = target.message_id?;
        let outcome = self.store.update_with(message_id, |entry| {
            let already_negative = effective_state(entry, target.stored)
                .map(|state| state.is_negative())
                .unwrap_or(false);

            if already_negative {
                entry.state = Some(FeedbackState::Neutral);
                entry.dialog = None;
                FeedbackOutcome {
                    state: FeedbackState::Neutral,
                    dialog: None,
                    persist: Some(FeedbackState::Neutral.wire_value()),
                }
            } else {
                let dialog = FeedbackDialog::default();
                entry.state = Some(FeedbackState::Negative);
                entry.dialog = Some(dialog.clone());
                FeedbackOutcome {
                    state: FeedbackState::Negative,
                    dialog: Some(dialog),
                    persist: None,
                }
            }
        });
        Some(outcome)
    }

    /// Feed a dialog event to the open dialog. A rejected event leaves the
    /// stored entry as it was.
    pub fn dialog_event(
        &self,
        message_id: Option<&str>,
        event: DialogEvent,
    ) -> Result<FeedbackOutcome, DialogError> {
        let message_id = message_id.ok_or(DialogError::MissingMessageId)?;
        self.store.update_with(message_id, |entry| -> Result<FeedbackOutcome, DialogError> {
            let mut dialog = entry.dialog.clone().ok_or(DialogError::NotOpen)?;
            let mut persist = None;

            match event {
                DialogEvent::Toggle { reason, checked } => {
                    dialog.toggle(reason, checked)?;
                    entry.dialog = Some(dialog);
                }
                DialogEvent::ReportInappropriate => {
                    dialog.report_inappropriate();
                    entry.dialog = Some(dialog);
                }
                DialogEvent::Submit => {
                    persist = Some(dialog.submit()?);
                    entry.state = Some(FeedbackState::Reasons(dialog.selected));
                    entry.dialog = None;
                }
                DialogEvent::Dismiss => {
                    entry.state = Some(FeedbackState::Neutral);
                    entry.dialog = None;
                }
            }

            Ok(FeedbackOutcome {
                state: entry.state.clone().unwrap_or(FeedbackState::Neutral),
                dialog: entry.dialog.clone(),
                persist,
            })
        })
    }
}

fn effective_state(entry: &FeedbackEntry, stored: Option<&str>) -> Option<FeedbackState> {
    entry
        .state
        .clone()
        .or_else(|| FeedbackState::from_stored(stored))
}

fn join_reasons(reasons: &[FeedbackToken]) -> String {
    reasons
        .iter()
        .map(|reason| reason.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
