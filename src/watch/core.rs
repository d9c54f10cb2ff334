// src/watch/core.rs

//! Pure watch state machine.
//!
//! [`WatchCore`] consumes [`WatchEvent`]s and answers with
//! [`WatchCommand`]s for the async shell (`watch::runtime`). It owns no
//! channels, timers or tasks, so debounce behaviour is tested without Tokio.

use tracing::{debug, trace};

use crate::watch::rules::WatchRule;
use crate::watch::{WatchCommand, WatchEvent, WatchStep};

/// Changes seen by one rule since its last run.
#[derive(Debug, Default, Clone)]
struct PendingChanges {
    /// Bumped by every matching event; a timer carrying an older value is
    /// stale.
    generation: u64,
    changed: Vec<String>,
}

#[derive(Debug)]
pub struct WatchCore {
    rules: Vec<WatchRule>,
    pending: Vec<PendingChanges>,
}

impl WatchCore {
    pub fn new(rules: Vec<WatchRule>) -> Self {
        let pending = vec![PendingChanges::default(); rules.len()];
        Self { rules, pending }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&WatchRule> {
        self.rules.get(index)
    }

    /// Whether any rule has changes waiting for its debounce timer.
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|p| !p.changed.is_empty())
    }

    pub fn step(&mut self, event: WatchEvent) -> WatchStep {
        match event {
            WatchEvent::FileChanged { path } => WatchStep::running(self.on_change(path)),
            WatchEvent::DebounceElapsed { rule, generation } => {
                WatchStep::running(self.on_timer(rule, generation))
            }
            WatchEvent::ShutdownRequested => WatchStep {
                commands: vec![WatchCommand::Exit],
                keep_running: false,
            },
        }
    }

    fn on_change(&mut self, path: String) -> Vec<WatchCommand> {
        let mut commands = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.matches(&path) {
                continue;
            }
            let pending = &mut self.pending[index];
            pending.generation += 1;
            if !pending.changed.contains(&path) {
                pending.changed.push(path.clone());
            }
            trace!(rule = %rule.name(), generation = pending.generation, %path, "arming debounce");
            commands.push(WatchCommand::ArmDebounce {
                rule: index,
                generation: pending.generation,
                delay: rule.debounce(),
            });
        }
        if commands.is_empty() {
            trace!(%path, "change matches no rule");
        }
        commands
    }

    fn on_timer(&mut self, rule: usize, generation: u64) -> Vec<WatchCommand> {
        let Some(pending) = self.pending.get_mut(rule) else {
            return Vec::new();
        };
        if pending.generation != generation || pending.changed.is_empty() {
            return Vec::new();
        }
        let changed = std::mem::take(&mut pending.changed);
        debug!(rule, files = changed.len(), "debounce elapsed");
        vec![WatchCommand::RunRule { rule, changed }]
    }
}

impl WatchStep {
    fn running(commands: Vec<WatchCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}
