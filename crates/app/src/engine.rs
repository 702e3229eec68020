//! Rule engine: the facade callers use to manage and fire rules.
//!
//! The engine keeps the authoritative rule map in memory and mirrors every
//! mutation to the [`RuleStore`] before returning. Mutations and scheduler
//! updates happen under one lock, so a rule's job table entry always matches
//! the rule as last persisted.
//!
//! Fires read a snapshot of the rule, evaluate and act without holding the
//! lock, then take it again to record `last_run_at`. Fires of different rules
//! run in parallel; two fires of the same rule never overlap.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use adrules_domain::account::AccountId;
use adrules_domain::error::{RulesError, UpstreamError};
use adrules_domain::id::RuleId;
use adrules_domain::rule::{NewRule, Rule};
use adrules_domain::time::{self, Timestamp};

use crate::evaluator::Evaluator;
use crate::executor::{ActionTally, Executor};
use crate::ports::{AlertSender, CampaignClient, RuleStore};
use crate::scheduler::Scheduler;

/// Default bound on every campaign client and alert sender call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub upstream_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

/// What one fire of a rule did.
#[derive(Debug)]
pub struct FireReport {
    pub rule_id: RuleId,
    pub ran_at: Timestamp,
    pub outcome: FireOutcome,
}

#[derive(Debug)]
pub enum FireOutcome {
    /// Evaluation succeeded and actions were applied to every triggered
    /// campaign.
    Completed {
        evaluated: usize,
        matched: usize,
        triggered: usize,
        actions_applied: usize,
        actions_failed: usize,
    },
    /// The campaign list could not be fetched; no action ran.
    EvaluationFailed(UpstreamError),
    /// Another fire of the same rule is still running; nothing ran.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Scheduled,
    Manual,
}

struct State {
    rules: HashMap<RuleId, Rule>,
    lifecycle: Lifecycle,
    loaded: bool,
}

impl State {
    /// Every rule, oldest first.
    fn snapshot(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.values().cloned().collect();
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rules
    }
}

struct Inner<S, C, A> {
    store: S,
    client: C,
    alerts: A,
    config: EngineConfig,
    state: tokio::sync::Mutex<State>,
    scheduler: Scheduler,
    in_flight: Mutex<HashSet<RuleId>>,
}

/// Automation rules engine.
///
/// Cheap to clone; clones share the same rules and jobs.
pub struct RuleEngine<S, C, A> {
    inner: Arc<Inner<S, C, A>>,
}

impl<S, C, A> Clone for RuleEngine<S, C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C, A> RuleEngine<S, C, A>
where
    S: RuleStore + Send + Sync + 'static,
    C: CampaignClient + Send + Sync + 'static,
    A: AlertSender + Send + Sync + 'static,
{
    /// Create an engine with the default [`EngineConfig`].
    pub fn new(store: S, client: C, alerts: A) -> Self {
        Self::with_config(store, client, alerts, EngineConfig::default())
    }

    pub fn with_config(store: S, client: C, alerts: A, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                alerts,
                config,
                state: tokio::sync::Mutex::new(State {
                    rules: HashMap::new(),
                    lifecycle: Lifecycle::Idle,
                    loaded: false,
                }),
                scheduler: Scheduler::new(),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Schedule every enabled rule.
    ///
    /// Loads persisted rules on first use. Calling `start` on a running
    /// engine does nothing. Rules whose trigger cannot be scheduled are
    /// logged and left inert.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        if state.lifecycle == Lifecycle::Running {
            tracing::warn!("rule engine already running");
            return;
        }
        state.lifecycle = Lifecycle::Running;

        let failures = self
            .inner
            .scheduler
            .reschedule_all(state.rules.values(), |rule_id| {
                let inner = Arc::downgrade(&self.inner);
                move || fire_tick(inner.clone(), rule_id)
            });
        for (rule_id, err) in failures {
            tracing::warn!(%rule_id, error = %err, "rule left unscheduled");
        }
        tracing::info!(
            rules = state.rules.len(),
            scheduled = self.inner.scheduler.job_count(),
            "rule engine started"
        );
    }

    /// Cancel every job. Rules stay queryable and editable; fires already
    /// running complete.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.scheduler.unschedule_all();
        if state.lifecycle == Lifecycle::Running {
            tracing::info!("rule engine stopped");
        }
        state.lifecycle = Lifecycle::Stopped;
    }

    /// Create a rule, persist it and schedule it when enabled.
    ///
    /// # Errors
    ///
    /// [`RulesError::Persistence`] when the store write fails; the rule is
    /// then not created. [`RulesError::Configuration`] without a rule id when
    /// the rule holds a non-finite number; nothing is stored. With a rule id
    /// when the trigger is invalid; the rule is persisted but has no job.
    #[tracing::instrument(skip_all, fields(rule_name = %new_rule.name))]
    pub async fn add_rule(&self, new_rule: NewRule) -> Result<RuleId, RulesError> {
        new_rule.validate()?;
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;

        let rule = Rule::create(new_rule, RuleId::new(), time::now());
        let rule_id = rule.id;
        state.rules.insert(rule_id, rule);
        if let Err(err) = self.inner.persist(&state).await {
            state.rules.remove(&rule_id);
            return Err(err);
        }
        tracing::info!(%rule_id, "rule added");

        self.sync_schedule(&state, rule_id)?;
        Ok(rule_id)
    }

    /// Cancel the rule's job and delete it. Returns the removed rule, or
    /// `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// [`RulesError::Persistence`] when the store write fails; the rule is
    /// then kept.
    #[tracing::instrument(skip(self))]
    pub async fn remove_rule(&self, rule_id: RuleId) -> Result<Option<Rule>, RulesError> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        if !state.rules.contains_key(&rule_id) {
            return Ok(None);
        }

        // The job goes first so no fire can start for a rule being deleted.
        self.inner.scheduler.unschedule(rule_id);
        let Some(removed) = state.rules.remove(&rule_id) else {
            return Ok(None);
        };
        if let Err(err) = self.inner.persist(&state).await {
            state.rules.insert(rule_id, removed);
            if let Err(config) = self.sync_schedule(&state, rule_id) {
                tracing::warn!(%rule_id, error = %config, "restored rule left unscheduled");
            }
            return Err(err);
        }
        tracing::info!(%rule_id, "rule removed");
        Ok(Some(removed))
    }

    /// Flip a rule's `enabled` flag. Returns the new value, or `None` when the
    /// id is unknown.
    ///
    /// # Errors
    ///
    /// [`RulesError::Persistence`] when the store write fails; the rule is
    /// then unchanged. [`RulesError::Configuration`] when the rule was enabled
    /// but its trigger is invalid; the new flag is persisted regardless.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_rule(&self, rule_id: RuleId) -> Result<Option<bool>, RulesError> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        let Some(rule) = state.rules.get_mut(&rule_id) else {
            return Ok(None);
        };
        let enabled = rule.toggle();

        if let Err(err) = self.inner.persist(&state).await {
            if let Some(rule) = state.rules.get_mut(&rule_id) {
                rule.toggle();
            }
            return Err(err);
        }
        tracing::info!(%rule_id, enabled, "rule toggled");

        self.sync_schedule(&state, rule_id)?;
        Ok(Some(enabled))
    }

    /// Replace a rule's editable fields, keeping its id, creation time and
    /// run history. Returns the updated rule, or `None` when the id is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Same as [`toggle_rule`](Self::toggle_rule), plus
    /// [`RulesError::Configuration`] without a rule id when the edit holds a
    /// non-finite number; the rule is then unchanged.
    #[tracing::instrument(skip(self, edit))]
    pub async fn edit_rule(
        &self,
        rule_id: RuleId,
        edit: NewRule,
    ) -> Result<Option<Rule>, RulesError> {
        edit.validate()?;
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        let Some(rule) = state.rules.get_mut(&rule_id) else {
            return Ok(None);
        };
        let previous = rule.clone();
        rule.apply_edit(edit);

        if let Err(err) = self.inner.persist(&state).await {
            state.rules.insert(rule_id, previous);
            return Err(err);
        }
        tracing::info!(%rule_id, "rule edited");

        self.sync_schedule(&state, rule_id)?;
        Ok(state.rules.get(&rule_id).cloned())
    }

    /// Evaluate the rule and apply its actions now, bypassing the scheduler.
    ///
    /// Disabled rules run too. Returns `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// [`RulesError::Persistence`] when recording `last_run_at` fails. The
    /// fire itself has happened by then.
    #[tracing::instrument(skip(self))]
    pub async fn run_rule(&self, rule_id: RuleId) -> Result<Option<FireReport>, RulesError> {
        self.inner.fire(rule_id, Origin::Manual).await
    }

    pub async fn get_rule(&self, rule_id: RuleId) -> Option<Rule> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        state.rules.get(&rule_id).cloned()
    }

    /// Rules bound to `account_id`, comparing normalized ids. Oldest first.
    pub async fn get_rules_for_account(&self, account_id: &AccountId) -> Vec<Rule> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        state
            .snapshot()
            .into_iter()
            .filter(|rule| rule.account_id.matches(account_id))
            .collect()
    }

    /// Every rule, oldest first.
    pub async fn get_all_rules(&self) -> Vec<Rule> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await;
        state.snapshot()
    }

    /// Whether the rule currently has a live job.
    #[must_use]
    pub fn is_scheduled(&self, rule_id: RuleId) -> bool {
        self.inner.scheduler.is_scheduled(rule_id)
    }

    #[must_use]
    pub fn scheduled_rule_ids(&self) -> Vec<RuleId> {
        self.inner.scheduler.scheduled_ids()
    }

    /// Bring the rule's job in line with the rule and the engine lifecycle.
    ///
    /// Outside `Running` no job is created, but the trigger of an enabled
    /// rule is still validated.
    fn sync_schedule(&self, state: &State, rule_id: RuleId) -> Result<(), RulesError> {
        let Some(rule) = state.rules.get(&rule_id) else {
            self.inner.scheduler.unschedule(rule_id);
            return Ok(());
        };

        let result = if state.lifecycle == Lifecycle::Running {
            let inner = Arc::downgrade(&self.inner);
            self.inner
                .scheduler
                .schedule(rule, move || fire_tick(inner.clone(), rule_id))
                .map(|_| ())
        } else {
            self.inner.scheduler.unschedule(rule_id);
            if rule.enabled {
                rule.trigger.fire_plan().map(|_| ())
            } else {
                Ok(())
            }
        };

        result.map_err(|err| {
            tracing::warn!(%rule_id, error = %err, "rule left unscheduled");
            RulesError::from(err).for_rule(rule_id)
        })
    }
}

impl<S, C, A> Inner<S, C, A>
where
    S: RuleStore + Send + Sync + 'static,
    C: CampaignClient + Send + Sync + 'static,
    A: AlertSender + Send + Sync + 'static,
{
    /// Load the store into the map the first time the engine is used.
    /// A failed load leaves the engine with no rules.
    async fn ensure_loaded(&self, state: &mut State) {
        if state.loaded {
            return;
        }
        state.loaded = true;
        match self.store.load_all().await {
            Ok(rules) => {
                tracing::info!(count = rules.len(), "rules loaded");
                state.rules = rules.into_iter().map(|rule| (rule.id, rule)).collect();
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    source = ?std::error::Error::source(&err),
                    "failed to load rules, starting with none"
                );
            }
        }
    }

    async fn persist(&self, state: &State) -> Result<(), RulesError> {
        self.store.save_all(&state.snapshot()).await
    }

    async fn fire(&self, rule_id: RuleId, origin: Origin) -> Result<Option<FireReport>, RulesError> {
        let rule = {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await;
            match state.rules.get(&rule_id) {
                Some(rule) if rule.enabled || origin == Origin::Manual => rule.clone(),
                _ => {
                    tracing::debug!(%rule_id, ?origin, "rule removed or disabled, fire dropped");
                    return Ok(None);
                }
            }
        };

        let ran_at = time::now();
        let Some(_guard) = FireGuard::claim(&self.in_flight, rule_id) else {
            tracing::warn!(%rule_id, ?origin, "rule is already firing, skipped");
            return Ok(Some(FireReport {
                rule_id,
                ran_at,
                outcome: FireOutcome::Busy,
            }));
        };

        let outcome = self.evaluate_and_apply(&rule).await;
        self.record_run(rule_id, ran_at).await?;
        Ok(Some(FireReport {
            rule_id,
            ran_at,
            outcome,
        }))
    }

    async fn evaluate_and_apply(&self, rule: &Rule) -> FireOutcome {
        let timeout = self.config.upstream_timeout;
        let evaluation = match Evaluator::new(&self.client, timeout).evaluate(rule).await {
            Ok(evaluation) => evaluation,
            Err(err) => {
                tracing::warn!(rule_id = %rule.id, error = %err, "rule evaluation failed");
                return FireOutcome::EvaluationFailed(err);
            }
        };

        let executor = Executor::new(&self.client, &self.alerts, timeout);
        let mut tally = ActionTally::default();
        for target in &evaluation.triggered {
            tally.add(executor.apply(rule, target).await);
        }

        if evaluation.triggered.is_empty() {
            tracing::debug!(
                rule_id = %rule.id,
                evaluated = evaluation.evaluated,
                "rule fired, nothing triggered"
            );
        } else {
            tracing::info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                triggered = evaluation.triggered.len(),
                applied = tally.applied,
                failed = tally.failed,
                "rule fired"
            );
        }

        FireOutcome::Completed {
            evaluated: evaluation.evaluated,
            matched: evaluation.matched,
            triggered: evaluation.triggered.len(),
            actions_applied: tally.applied,
            actions_failed: tally.failed,
        }
    }

    /// Stamp `last_run_at` on the rule if it still exists.
    async fn record_run(&self, rule_id: RuleId, at: Timestamp) -> Result<(), RulesError> {
        let mut state = self.state.lock().await;
        let Some(rule) = state.rules.get_mut(&rule_id) else {
            return Ok(());
        };
        rule.record_run(at);
        self.persist(&state).await
    }
}

/// Body of every scheduled fire. Holds only a weak reference so jobs never
/// keep a dropped engine alive.
async fn fire_tick<S, C, A>(inner: Weak<Inner<S, C, A>>, rule_id: RuleId)
where
    S: RuleStore + Send + Sync + 'static,
    C: CampaignClient + Send + Sync + 'static,
    A: AlertSender + Send + Sync + 'static,
{
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if let Err(err) = inner.fire(rule_id, Origin::Scheduled).await {
        tracing::warn!(%rule_id, error = %err, "failed to record rule run");
    }
}

/// Marks a rule as firing for as long as the guard lives.
struct FireGuard<'a> {
    in_flight: &'a Mutex<HashSet<RuleId>>,
    rule_id: RuleId,
}

impl<'a> FireGuard<'a> {
    fn claim(in_flight: &'a Mutex<HashSet<RuleId>>, rule_id: RuleId) -> Option<Self> {
        let claimed = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule_id);
        claimed.then_some(Self { in_flight, rule_id })
    }
}

impl Drop for FireGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.rule_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::tests::{FakeCampaignClient, campaign};
    use crate::executor::tests::SpyAlertSender;
    use adrules_domain::alert::AlertKind;
    use adrules_domain::campaign::{CampaignStatus, TargetStatus};
    use adrules_domain::error::ConfigurationError;
    use adrules_domain::metric::Metric;
    use adrules_domain::rule::{Action, Operator, Trigger};
    use std::future::Future;

    // ── In-memory rule store ───────────────────────────────────────

    #[derive(Default)]
    struct InMemoryRuleStore {
        rules: Mutex<Vec<Rule>>,
        fail_load: Mutex<bool>,
        fail_save: Mutex<bool>,
        loads: Mutex<usize>,
    }

    impl InMemoryRuleStore {
        fn with(rules: Vec<Rule>) -> Self {
            Self {
                rules: Mutex::new(rules),
                ..Self::default()
            }
        }

        fn stored(&self) -> Vec<Rule> {
            self.rules.lock().unwrap().clone()
        }
    }

    #[derive(Debug)]
    struct StoreDown;

    impl std::fmt::Display for StoreDown {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("store down")
        }
    }

    impl std::error::Error for StoreDown {}

    impl RuleStore for InMemoryRuleStore {
        fn load_all(&self) -> impl Future<Output = Result<Vec<Rule>, RulesError>> + Send {
            *self.loads.lock().unwrap() += 1;
            let result = if *self.fail_load.lock().unwrap() {
                Err(RulesError::persistence(StoreDown))
            } else {
                Ok(self.stored())
            };
            async { result }
        }

        fn save_all(&self, rules: &[Rule]) -> impl Future<Output = Result<(), RulesError>> + Send {
            let result = if *self.fail_save.lock().unwrap() {
                Err(RulesError::persistence(StoreDown))
            } else {
                *self.rules.lock().unwrap() = rules.to_vec();
                Ok(())
            };
            async { result }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    type TestEngine =
        RuleEngine<Arc<InMemoryRuleStore>, Arc<FakeCampaignClient>, Arc<SpyAlertSender>>;

    struct Harness {
        engine: TestEngine,
        store: Arc<InMemoryRuleStore>,
        client: Arc<FakeCampaignClient>,
        alerts: Arc<SpyAlertSender>,
    }

    fn harness_with(store: InMemoryRuleStore, client: FakeCampaignClient) -> Harness {
        let store = Arc::new(store);
        let client = Arc::new(client);
        let alerts = Arc::new(SpyAlertSender::default());
        let engine = RuleEngine::new(Arc::clone(&store), Arc::clone(&client), Arc::clone(&alerts));
        Harness {
            engine,
            store,
            client,
            alerts,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryRuleStore::default(), FakeCampaignClient::default())
    }

    fn schedule_rule(name: &str) -> NewRule {
        NewRule::builder(
            name,
            "1234",
            Trigger::Schedule {
                cron_expression: "0 9 * * *".to_string(),
            },
        )
        .action(Action::Pause)
        .build()
    }

    fn threshold_rule(minutes: i64) -> NewRule {
        NewRule::builder(
            "High CPC",
            "act_1234",
            Trigger::Threshold {
                metric: Metric::Cpc,
                operator: Operator::Greater,
                value: 2.0,
                check_interval_minutes: minutes,
            },
        )
        .action(Action::Pause)
        .build()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[tokio::test]
    async fn should_schedule_rule_when_added_to_running_engine() {
        let h = harness();
        h.engine.start().await;

        let id = h.engine.add_rule(schedule_rule("Morning")).await.unwrap();

        assert!(h.engine.is_scheduled(id));
        assert_eq!(h.store.stored().len(), 1);
        assert_eq!(h.store.stored()[0].id, id);
    }

    #[tokio::test]
    async fn should_defer_scheduling_until_started() {
        let h = harness();
        let id = h.engine.add_rule(schedule_rule("Morning")).await.unwrap();
        assert!(!h.engine.is_scheduled(id));

        h.engine.start().await;
        assert!(h.engine.is_scheduled(id));
    }

    #[tokio::test]
    async fn should_not_duplicate_jobs_when_started_twice() {
        let h = harness();
        h.engine.add_rule(schedule_rule("A")).await.unwrap();
        h.engine.add_rule(schedule_rule("B")).await.unwrap();

        h.engine.start().await;
        h.engine.start().await;

        assert_eq!(h.engine.scheduled_rule_ids().len(), 2);
    }

    #[tokio::test]
    async fn should_schedule_persisted_rules_when_started() {
        let enabled = Rule::create(schedule_rule("Stored"), RuleId::new(), time::now());
        let mut disabled = Rule::create(schedule_rule("Off"), RuleId::new(), time::now());
        disabled.enabled = false;
        let h = harness_with(
            InMemoryRuleStore::with(vec![enabled.clone(), disabled.clone()]),
            FakeCampaignClient::default(),
        );

        h.engine.start().await;

        assert!(h.engine.is_scheduled(enabled.id));
        assert!(!h.engine.is_scheduled(disabled.id));
        assert_eq!(h.engine.get_all_rules().await.len(), 2);
    }

    #[tokio::test]
    async fn should_load_store_only_once() {
        let h = harness();
        h.engine.get_all_rules().await;
        h.engine.start().await;
        h.engine.add_rule(schedule_rule("A")).await.unwrap();

        assert_eq!(*h.store.loads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn should_start_with_no_rules_when_load_fails() {
        let store = InMemoryRuleStore::with(vec![Rule::create(
            schedule_rule("Unreachable"),
            RuleId::new(),
            time::now(),
        )]);
        *store.fail_load.lock().unwrap() = true;
        let h = harness_with(store, FakeCampaignClient::default());

        h.engine.start().await;

        assert!(h.engine.get_all_rules().await.is_empty());
        assert!(h.engine.scheduled_rule_ids().is_empty());
    }

    #[tokio::test]
    async fn should_cancel_jobs_but_keep_rules_when_stopped() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(schedule_rule("A")).await.unwrap();

        h.engine.stop().await;

        assert!(!h.engine.is_scheduled(id));
        assert!(h.engine.get_rule(id).await.is_some());
    }

    #[tokio::test]
    async fn should_reschedule_in_memory_rules_when_restarted() {
        let h = harness();
        h.engine.start().await;
        h.engine.stop().await;
        let id = h.engine.add_rule(schedule_rule("Added while stopped")).await.unwrap();
        assert!(!h.engine.is_scheduled(id));

        h.engine.start().await;

        assert!(h.engine.is_scheduled(id));
    }

    // ── Mutations ──────────────────────────────────────────────────

    #[tokio::test]
    async fn should_restore_state_when_toggled_twice() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(threshold_rule(5)).await.unwrap();

        assert_eq!(h.engine.toggle_rule(id).await.unwrap(), Some(false));
        assert!(!h.engine.is_scheduled(id));
        assert_eq!(h.engine.toggle_rule(id).await.unwrap(), Some(true));

        assert!(h.engine.is_scheduled(id));
        assert!(h.engine.get_rule(id).await.unwrap().enabled);
        assert_eq!(h.engine.scheduled_rule_ids(), vec![id]);
        assert!(h.store.stored()[0].enabled);
    }

    #[tokio::test]
    async fn should_treat_toggle_of_unknown_rule_as_noop() {
        let h = harness();
        assert_eq!(h.engine.toggle_rule(RuleId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_leave_no_job_or_record_when_removed() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(threshold_rule(5)).await.unwrap();

        let removed = h.engine.remove_rule(id).await.unwrap();

        assert_eq!(removed.map(|r| r.id), Some(id));
        assert!(!h.engine.is_scheduled(id));
        assert!(h.engine.get_all_rules().await.is_empty());
        assert!(h.store.stored().is_empty());
    }

    #[tokio::test]
    async fn should_treat_removal_of_unknown_rule_as_noop() {
        let h = harness();
        assert!(h.engine.remove_rule(RuleId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_persist_but_not_schedule_when_cron_invalid() {
        let h = harness();
        h.engine.start().await;
        let broken = NewRule::builder(
            "Broken",
            "1234",
            Trigger::Schedule {
                cron_expression: "every morning".to_string(),
            },
        )
        .build();

        let err = h.engine.add_rule(broken).await.unwrap_err();

        let id = match err {
            RulesError::Configuration {
                rule_id: Some(id), ..
            } => id,
            other => panic!("expected configuration error, got {other:?}"),
        };
        assert!(!h.engine.is_scheduled(id));
        assert!(h.engine.get_rule(id).await.is_some());
        assert_eq!(h.store.stored().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_invalid_interval_even_when_not_running() {
        let h = harness();

        let err = h.engine.add_rule(threshold_rule(0)).await.unwrap_err();

        assert!(matches!(err, RulesError::Configuration { rule_id: Some(_), .. }));
        assert_eq!(h.engine.get_all_rules().await.len(), 1);
    }

    #[tokio::test]
    async fn should_not_create_rule_when_store_write_fails() {
        let h = harness();
        *h.store.fail_save.lock().unwrap() = true;

        let err = h.engine.add_rule(schedule_rule("A")).await.unwrap_err();

        assert!(matches!(err, RulesError::Persistence(_)));
        assert!(h.engine.get_all_rules().await.is_empty());
        assert!(h.engine.scheduled_rule_ids().is_empty());
    }

    #[tokio::test]
    async fn should_keep_rule_unchanged_when_toggle_write_fails() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(schedule_rule("A")).await.unwrap();
        *h.store.fail_save.lock().unwrap() = true;

        assert!(h.engine.toggle_rule(id).await.is_err());

        assert!(h.engine.get_rule(id).await.unwrap().enabled);
        assert!(h.engine.is_scheduled(id));
    }

    #[tokio::test]
    async fn should_keep_identity_and_reschedule_when_edited() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(schedule_rule("Morning")).await.unwrap();
        let original = h.engine.get_rule(id).await.unwrap();

        let edited = h
            .engine
            .edit_rule(id, threshold_rule(10))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(edited.id, id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.name, "High CPC");
        assert!(matches!(edited.trigger, Trigger::Threshold { .. }));
        assert!(h.engine.is_scheduled(id));
        assert_eq!(h.store.stored()[0], edited);
    }

    #[tokio::test]
    async fn should_unschedule_when_edited_to_disabled() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(schedule_rule("Morning")).await.unwrap();

        let mut edit = schedule_rule("Morning");
        edit.enabled = false;
        h.engine.edit_rule(id, edit).await.unwrap();

        assert!(!h.engine.is_scheduled(id));
    }

    #[tokio::test]
    async fn should_return_none_when_editing_unknown_rule() {
        let h = harness();
        let result = h.engine.edit_rule(RuleId::new(), schedule_rule("A")).await;
        assert!(result.unwrap().is_none());
    }

    fn infinite_threshold_rule() -> NewRule {
        let mut new_rule = threshold_rule(15);
        new_rule.trigger = Trigger::Threshold {
            metric: Metric::Cpc,
            operator: Operator::Greater,
            value: f64::INFINITY,
            check_interval_minutes: 15,
        };
        new_rule
    }

    #[tokio::test]
    async fn should_reject_rule_without_storing_when_threshold_is_infinite() {
        let h = harness();
        h.engine.start().await;
        let kept = h.engine.add_rule(schedule_rule("Kept")).await.unwrap();

        let err = h.engine.add_rule(infinite_threshold_rule()).await.unwrap_err();

        assert!(matches!(
            err,
            RulesError::Configuration {
                rule_id: None,
                source: ConfigurationError::NonFiniteNumber { field: "value", .. },
            }
        ));
        assert_eq!(h.engine.get_all_rules().await.len(), 1);
        assert_eq!(h.engine.scheduled_rule_ids(), vec![kept]);
        let stored = h.store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, kept);
        assert!(stored.iter().all(|rule| rule
            .trigger
            .threshold()
            .is_none_or(|t| t.value.is_finite())));
    }

    #[tokio::test]
    async fn should_leave_rule_unchanged_when_edit_holds_non_finite_number() {
        let h = harness();
        h.engine.start().await;
        let id = h.engine.add_rule(schedule_rule("Morning")).await.unwrap();
        let before = h.engine.get_rule(id).await.unwrap();

        let err = h
            .engine
            .edit_rule(id, infinite_threshold_rule())
            .await
            .unwrap_err();

        assert!(matches!(err, RulesError::Configuration { rule_id: None, .. }));
        assert_eq!(h.engine.get_rule(id).await.unwrap(), before);
        assert_eq!(h.store.stored(), vec![before]);
        assert!(h.engine.is_scheduled(id));
    }

    #[tokio::test]
    async fn should_filter_rules_by_normalized_account() {
        let h = harness();
        let mine = h.engine.add_rule(schedule_rule("Mine")).await.unwrap();
        let other = NewRule::builder(
            "Theirs",
            "act_999",
            Trigger::Schedule {
                cron_expression: "0 9 * * *".to_string(),
            },
        )
        .build();
        h.engine.add_rule(other).await.unwrap();

        let rules = h
            .engine
            .get_rules_for_account(&AccountId::new("act_1234"))
            .await;

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, mine);
    }

    // ── Firing ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_apply_actions_once_per_matching_campaign_when_run() {
        let h = harness_with(
            InMemoryRuleStore::default(),
            FakeCampaignClient::with_campaigns(vec![
                campaign("1", "Summer promo sale", CampaignStatus::Active),
                campaign("2", "Summer Sale", CampaignStatus::Active),
                campaign("3", "Brand", CampaignStatus::Active),
                campaign("4", "Winter PROMO", CampaignStatus::Active),
                campaign("5", "Retargeting", CampaignStatus::Paused),
            ]),
        );
        let new = NewRule::builder(
            "Pause promos",
            "1234",
            Trigger::Schedule {
                cron_expression: "0 22 * * *".to_string(),
            },
        )
        .name_contains("promo")
        .action(Action::Pause)
        .action(Action::Notify {
            message: "{{campaign_name}} paused".to_string(),
        })
        .build();
        let id = h.engine.add_rule(new).await.unwrap();

        let report = h.engine.run_rule(id).await.unwrap().unwrap();

        assert!(matches!(
            report.outcome,
            FireOutcome::Completed {
                evaluated: 5,
                matched: 2,
                triggered: 2,
                actions_applied: 4,
                actions_failed: 0,
            }
        ));
        assert_eq!(
            h.client.status_calls.lock().unwrap().as_slice(),
            &[
                ("1".to_string(), TargetStatus::Paused),
                ("4".to_string(), TargetStatus::Paused)
            ]
        );
        let kinds: Vec<AlertKind> = h.alerts.sent().iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::Action,
                AlertKind::Alert,
                AlertKind::Action,
                AlertKind::Alert
            ]
        );
        assert_eq!(
            h.engine.get_rule(id).await.unwrap().last_run_at,
            Some(report.ran_at)
        );
    }

    #[tokio::test]
    async fn should_return_none_when_running_unknown_rule() {
        let h = harness();
        assert!(h.engine.run_rule(RuleId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_advance_last_run_when_metric_read_fails_for_one_campaign() {
        let client = FakeCampaignClient::with_campaigns(vec![
            campaign("1", "A", CampaignStatus::Active),
            campaign("2", "B", CampaignStatus::Active),
        ]);
        client.set_metric("2", Metric::Cpc, 3.0);
        client
            .failing_metrics
            .lock()
            .unwrap()
            .insert("1".to_string());
        let h = harness_with(InMemoryRuleStore::default(), client);
        let id = h.engine.add_rule(threshold_rule(5)).await.unwrap();

        let report = h.engine.run_rule(id).await.unwrap().unwrap();

        assert!(matches!(
            report.outcome,
            FireOutcome::Completed { triggered: 1, .. }
        ));
        assert_eq!(
            h.client.status_calls.lock().unwrap().as_slice(),
            &[("2".to_string(), TargetStatus::Paused)]
        );
        assert!(h.store.stored()[0].last_run_at.is_some());
    }

    #[tokio::test]
    async fn should_record_run_without_actions_when_listing_fails() {
        let h = harness();
        *h.client.fail_listing.lock().unwrap() = true;
        let id = h.engine.add_rule(schedule_rule("A")).await.unwrap();

        let report = h.engine.run_rule(id).await.unwrap().unwrap();

        assert!(matches!(report.outcome, FireOutcome::EvaluationFailed(_)));
        assert!(h.client.status_calls.lock().unwrap().is_empty());
        assert!(h.engine.get_rule(id).await.unwrap().last_run_at.is_some());
    }

    #[tokio::test]
    async fn should_report_busy_when_rule_already_firing() {
        let h = harness();
        let id = h.engine.add_rule(schedule_rule("A")).await.unwrap();
        h.engine.inner.in_flight.lock().unwrap().insert(id);

        let report = h.engine.run_rule(id).await.unwrap().unwrap();

        assert!(matches!(report.outcome, FireOutcome::Busy));
        assert!(h.engine.get_rule(id).await.unwrap().last_run_at.is_none());
    }

    #[tokio::test]
    async fn should_run_disabled_rule_when_invoked_manually() {
        let h = harness_with(
            InMemoryRuleStore::default(),
            FakeCampaignClient::with_campaigns(vec![campaign("1", "A", CampaignStatus::Active)]),
        );
        let mut new = schedule_rule("Off");
        new.enabled = false;
        let id = h.engine.add_rule(new).await.unwrap();

        h.engine.run_rule(id).await.unwrap();

        assert_eq!(h.client.status_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_drop_scheduled_fire_when_rule_disabled() {
        let h = harness_with(
            InMemoryRuleStore::default(),
            FakeCampaignClient::with_campaigns(vec![campaign("1", "A", CampaignStatus::Active)]),
        );
        let mut new = schedule_rule("Off");
        new.enabled = false;
        let id = h.engine.add_rule(new).await.unwrap();

        let report = h.engine.inner.fire(id, Origin::Scheduled).await.unwrap();

        assert!(report.is_none());
        assert!(h.client.status_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_threshold_rule_on_its_interval() {
        let client =
            FakeCampaignClient::with_campaigns(vec![campaign("1", "A", CampaignStatus::Active)]);
        client.set_metric("1", Metric::Cpc, 5.0);
        let h = harness_with(InMemoryRuleStore::default(), client);
        h.engine.start().await;
        let id = h.engine.add_rule(threshold_rule(1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2 * 60 + 1)).await;

        assert_eq!(h.client.status_calls.lock().unwrap().len(), 2);
        assert!(h.engine.get_rule(id).await.unwrap().last_run_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_firing_when_engine_stopped() {
        let client =
            FakeCampaignClient::with_campaigns(vec![campaign("1", "A", CampaignStatus::Active)]);
        client.set_metric("1", Metric::Cpc, 5.0);
        let h = harness_with(InMemoryRuleStore::default(), client);
        h.engine.start().await;
        h.engine.add_rule(threshold_rule(1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        h.engine.stop().await;
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;

        assert_eq!(h.client.status_calls.lock().unwrap().len(), 1);
    }
}
