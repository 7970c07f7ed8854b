// OutcomeLedger - scorer annotations keyed by PlayId
//
// Buffered pitches are immutable, so calls, exit speeds and discard flags
// entered after the fact live here and are joined at aggregation time.
// Writers copy-on-write the map; readers get a cheap `Arc` clone.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::pitch::{PitchCall, PitchOutcome};

pub type OutcomeMap = HashMap<String, PitchOutcome>;

/// Cloneable handle to the shared outcome map
#[derive(Debug, Clone)]
pub struct OutcomeLedger {
    tx: Arc<watch::Sender<Arc<OutcomeMap>>>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(OutcomeMap::new()));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the outcome for `play_id`
    pub fn record(&self, play_id: impl Into<String>, outcome: PitchOutcome) {
        let play_id = play_id.into();
        log::debug!("[Outcomes] {} -> {:?}", play_id, outcome);
        self.tx.send_modify(|map| {
            Arc::make_mut(map).insert(play_id, outcome);
        });
    }

    /// Set the call, keeping any exit speed or discard flag already recorded
    pub fn record_call(&self, play_id: impl Into<String>, call: PitchCall) {
        let play_id = play_id.into();
        self.tx.send_modify(|map| {
            Arc::make_mut(map).entry(play_id).or_default().call = Some(call);
        });
    }

    /// Set the exit speed, keeping the call and discard flag
    pub fn record_exit_speed(&self, play_id: impl Into<String>, exit_speed: f64) {
        let play_id = play_id.into();
        self.tx.send_modify(|map| {
            Arc::make_mut(map).entry(play_id).or_default().exit_speed = Some(exit_speed);
        });
    }

    /// Flag a pitch so aggregation skips it
    pub fn mark_discarded(&self, play_id: impl Into<String>, discard: bool) {
        let play_id = play_id.into();
        self.tx.send_modify(|map| {
            Arc::make_mut(map).entry(play_id).or_default().discard = discard;
        });
    }

    pub fn get(&self, play_id: &str) -> Option<PitchOutcome> {
        self.tx.borrow().get(play_id).cloned()
    }

    pub fn snapshot(&self) -> Arc<OutcomeMap> {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.tx.send_replace(Arc::new(OutcomeMap::new()));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<OutcomeMap>> {
        self.tx.subscribe()
    }
}

impl Default for OutcomeLedger {
    fn default() -> Self {
        Self::new()
    }
}
