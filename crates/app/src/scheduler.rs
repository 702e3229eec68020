//! Scheduler: one supervised job per enabled rule.
//!
//! A job is a tokio task that waits for the rule's next fire instant and
//! spawns the fire as its own task. The job keeps the handle of the fire it
//! last spawned: a tick that arrives while that fire is still running is
//! skipped, and a fire that panicked is reported when the next tick reaps it.
//!
//! Cancelling a job aborts only the waiting loop. A fire already in flight
//! runs to completion.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use adrules_domain::error::ConfigurationError;
use adrules_domain::id::RuleId;
use adrules_domain::rule::{CronExpression, FirePlan, Rule};
use adrules_domain::time::{self, Timestamp};

/// Owns the live job table, indexed by rule id.
#[derive(Default)]
pub struct Scheduler {
    jobs: Mutex<HashMap<RuleId, JoinHandle<()>>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the job of `rule` with a fresh one calling `fire` on every tick.
    ///
    /// Any existing job is cancelled first. A disabled rule ends up with no
    /// job. Returns whether a job is now live.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the trigger cannot be scheduled;
    /// the rule is then left without a job.
    pub fn schedule<F, Fut>(&self, rule: &Rule, fire: F) -> Result<bool, ConfigurationError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut jobs = self.jobs();
        if let Some(previous) = jobs.remove(&rule.id) {
            previous.abort();
        }
        if !rule.enabled {
            return Ok(false);
        }

        let plan = rule.trigger.fire_plan()?;
        tracing::debug!(rule_id = %rule.id, trigger = %rule.trigger, "scheduling rule");
        let handle = tokio::spawn(run_job(rule.id, Ticks::new(plan), fire));
        jobs.insert(rule.id, handle);
        Ok(true)
    }

    /// Cancel the job of `rule_id`. No-op when there is none.
    pub fn unschedule(&self, rule_id: RuleId) -> bool {
        match self.jobs().remove(&rule_id) {
            Some(handle) => {
                handle.abort();
                tracing::debug!(%rule_id, "unscheduled rule");
                true
            }
            None => false,
        }
    }

    /// Cancel every job.
    pub fn unschedule_all(&self) {
        for (_, handle) in self.jobs().drain() {
            handle.abort();
        }
    }

    /// Cancel every job, then schedule each rule of `rules` with the fire
    /// callback `fire_for` builds for it.
    ///
    /// Rules whose trigger cannot be scheduled are reported in the returned
    /// vector and left without a job; the others are scheduled regardless.
    pub fn reschedule_all<'a, I, B, F, Fut>(
        &self,
        rules: I,
        fire_for: B,
    ) -> Vec<(RuleId, ConfigurationError)>
    where
        I: IntoIterator<Item = &'a Rule>,
        B: Fn(RuleId) -> F,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.unschedule_all();
        let mut failures = Vec::new();
        for rule in rules {
            if let Err(err) = self.schedule(rule, fire_for(rule.id)) {
                failures.push((rule.id, err));
            }
        }
        failures
    }

    #[must_use]
    pub fn is_scheduled(&self, rule_id: RuleId) -> bool {
        self.jobs().contains_key(&rule_id)
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs().len()
    }

    /// Ids of every rule with a live job, in no particular order.
    #[must_use]
    pub fn scheduled_ids(&self) -> Vec<RuleId> {
        self.jobs().keys().copied().collect()
    }

    // The table is only touched by short non-panicking sections, so a
    // poisoned lock still holds a consistent map.
    fn jobs(&self) -> MutexGuard<'_, HashMap<RuleId, JoinHandle<()>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.unschedule_all();
    }
}

async fn run_job<F, Fut>(rule_id: RuleId, mut ticks: Ticks, fire: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight: Option<JoinHandle<()>> = None;
    while ticks.next().await {
        if let Some(handle) = in_flight.take() {
            if !handle.is_finished() {
                tracing::warn!(%rule_id, "previous fire still running, skipping tick");
                in_flight = Some(handle);
                continue;
            }
            if let Err(err) = handle.await {
                tracing::error!(%rule_id, error = %err, "rule fire panicked");
            }
        }
        in_flight = Some(tokio::spawn(fire()));
    }
    tracing::warn!(%rule_id, "schedule has no further fire instants, job ends");
}

/// Wall clock read by calendar jobs.
type Clock = Box<dyn Fn() -> Timestamp + Send>;

/// Source of fire instants for one job.
enum Ticks {
    Every(Interval),
    Calendar {
        cron: CronExpression,
        last: Option<Timestamp>,
        clock: Clock,
    },
}

impl Ticks {
    fn new(plan: FirePlan) -> Self {
        match plan {
            FirePlan::Every(period) => Self::Every(every(period)),
            FirePlan::Calendar(cron) => Self::calendar(cron, Box::new(time::now)),
        }
    }

    fn calendar(cron: CronExpression, clock: Clock) -> Self {
        Self::Calendar {
            cron,
            last: None,
            clock,
        }
    }

    /// Wait for the next instant. `false` once the schedule is exhausted.
    async fn next(&mut self) -> bool {
        match self {
            Self::Every(interval) => {
                interval.tick().await;
                true
            }
            Self::Calendar { cron, last, clock } => {
                let now = clock();
                // Never fire the same calendar instant twice, even when the
                // wall clock lags behind the timer.
                let from = last.map_or(now, |previous| previous.max(now));
                let Some(at) = cron.next_after(&from) else {
                    return false;
                };
                tokio::time::sleep(time::between(now, at)).await;
                *last = Some(at);
                true
            }
        }
    }
}

/// First tick one full period from now; late ticks are skipped, not bunched.
fn every(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
