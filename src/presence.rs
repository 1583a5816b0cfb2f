use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::all::Context as SerenityContext;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::data::PresenceStatus;

/// Round-robin over the configured statuses.
#[derive(Debug, Clone)]
pub struct PresenceCycle {
    statuses: Vec<PresenceStatus>,
    next: usize,
}

impl PresenceCycle {
    pub fn new(statuses: Vec<PresenceStatus>) -> Option<Self> {
        if statuses.is_empty() {
            None
        } else {
            Some(Self { statuses, next: 0 })
        }
    }

    /// Returns the status to show now and how long to keep it.
    pub fn advance(&mut self) -> (&PresenceStatus, Duration) {
        let status = &self.statuses[self.next];
        self.next = (self.next + 1) % self.statuses.len();
        (status, status.refresh_interval)
    }

    pub fn rotates(&self) -> bool {
        self.statuses.len() > 1
    }
}

fn apply(ctx: &SerenityContext, status: &PresenceStatus) {
    match status.activity_data() {
        Ok(activity) => {
            debug!("Presence set to {}", status.name);
            ctx.set_presence(Some(activity), status.online);
        }
        Err(why) => error!("Skipping presence {}: {}", status.name, why),
    }
}

/// Applies the first status right away. With more than one status a task keeps
/// rotating them until the client shuts down.
pub fn start(ctx: &SerenityContext, statuses: Vec<PresenceStatus>) -> Option<JoinHandle<()>> {
    let mut cycle = PresenceCycle::new(statuses)?;
    let (first, wait) = cycle.advance();
    apply(ctx, first);
    if !cycle.rotates() {
        return None;
    }

    let ctx = ctx.clone();
    Some(tokio::spawn(async move {
        let mut wait = wait;
        loop {
            tokio::time::sleep(wait).await;
            let (status, next_wait) = cycle.advance();
            apply(&ctx, status);
            wait = next_wait;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ActivityKind;

    #[test]
    fn empty_cycle_sets_nothing() {
        assert!(PresenceCycle::new(Vec::new()).is_none());
    }

    #[test]
    fn cycles_in_order_with_each_interval() {
        let statuses = vec![
            PresenceStatus::new("one", ActivityKind::Playing).refresh_every(5),
            PresenceStatus::new("two", ActivityKind::Watching).refresh_every(9),
        ];
        let mut cycle = PresenceCycle::new(statuses).unwrap();
        let seen: Vec<(String, u64)> = (0..5)
            .map(|_| {
                let (status, wait) = cycle.advance();
                (status.name.clone(), wait.as_secs())
            })
            .collect();
        assert_eq!(
            seen,
            vec![
                ("one".into(), 5),
                ("two".into(), 9),
                ("one".into(), 5),
                ("two".into(), 9),
                ("one".into(), 5),
            ]
        );
    }
}
