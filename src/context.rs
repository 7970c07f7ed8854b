// SessionContext: who is pitching and whether the pitches count
//
// The context is shared between the listener thread (which stamps each pitch
// with the current pitcher/team and gates on category) and external callers
// that change it mid-session. It lives in a watch channel so readers always
// get a consistent copy without holding a lock across the pipeline.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Whether incoming pitches are recorded or ignored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchCategory {
    #[default]
    Live,
    #[serde(rename = "Warm-up", alias = "Warm-Up")]
    WarmUp,
}

impl PitchCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PitchCategory::Live => "Live",
            PitchCategory::WarmUp => "Warm-up",
        }
    }
}

impl fmt::Display for PitchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("live") {
            Ok(PitchCategory::Live)
        } else if s.eq_ignore_ascii_case("warm-up") {
            Ok(PitchCategory::WarmUp)
        } else {
            Err(())
        }
    }
}

/// Snapshot of the active session attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub pitcher: String,
    pub team: String,
    pub category: PitchCategory,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            pitcher: crate::pitch::UNKNOWN_LABEL.to_string(),
            team: crate::pitch::UNKNOWN_LABEL.to_string(),
            category: PitchCategory::Live,
        }
    }
}

impl SessionContext {
    pub fn is_live(&self) -> bool {
        self.category == PitchCategory::Live
    }
}

/// Cloneable handle to the shared session context
///
/// Every clone refers to the same context. Updates are atomic per field
/// setter; a reader sees either the old or the new value, never a mix.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    tx: Arc<watch::Sender<SessionContext>>,
}

impl ContextHandle {
    pub fn new() -> Self {
        Self::with_context(SessionContext::default())
    }

    pub fn with_context(context: SessionContext) -> Self {
        let (tx, _) = watch::channel(context);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_pitcher(&self, pitcher: impl Into<String>) {
        let pitcher = pitcher.into();
        log::info!("[Context] Pitcher set to {:?}", pitcher);
        self.tx.send_modify(|context| context.pitcher = pitcher);
    }

    pub fn set_team(&self, team: impl Into<String>) {
        let team = team.into();
        log::info!("[Context] Team set to {:?}", team);
        self.tx.send_modify(|context| context.team = team);
    }

    /// Set the category from its display name.
    ///
    /// # Returns
    /// `false` (and the context unchanged) when `category` is neither
    /// "Live" nor "Warm-up".
    pub fn set_category(&self, category: &str) -> bool {
        match category.parse::<PitchCategory>() {
            Ok(parsed) => {
                self.set_category_kind(parsed);
                true
            }
            Err(()) => {
                log::debug!("[Context] Ignoring unknown category {:?}", category);
                false
            }
        }
    }

    pub fn set_category_kind(&self, category: PitchCategory) {
        log::info!("[Context] Category set to {}", category);
        self.tx.send_modify(|context| context.category = category);
    }

    pub fn get_context(&self) -> SessionContext {
        self.tx.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        self.tx.borrow().is_live()
    }

    /// Restore pitcher, team and category to their defaults
    pub fn reset(&self) {
        self.tx.send_replace(SessionContext::default());
    }

    /// Receiver notified on every context change
    pub fn subscribe(&self) -> watch::Receiver<SessionContext> {
        self.tx.subscribe()
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        Self::new()
    }
}
