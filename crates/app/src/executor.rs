//! Action executor: applies a rule's actions to one triggered campaign.
//!
//! Every (campaign, action) pair is isolated: a failing status change is
//! logged and counted, and the remaining actions still run.

use std::time::Duration;

use adrules_domain::alert::{Alert, AlertKind};
use adrules_domain::campaign::TargetStatus;
use adrules_domain::rule::{Action, Rule, TemplateContext, render_template};

use crate::evaluator::TriggeredCampaign;
use crate::ports::{AlertSender, CampaignClient};
use crate::upstream::{self, ALERT_SENDER, CAMPAIGN_CLIENT};

/// How many actions succeeded and failed for a fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionTally {
    pub applied: usize,
    pub failed: usize,
}

impl ActionTally {
    pub fn add(&mut self, other: Self) {
        self.applied += other.applied;
        self.failed += other.failed;
    }
}

/// Applies actions through the campaign client and alert sender.
pub struct Executor<'a, C, A> {
    client: &'a C,
    alerts: &'a A,
    timeout: Duration,
}

impl<'a, C, A> Executor<'a, C, A>
where
    C: CampaignClient,
    A: AlertSender,
{
    pub fn new(client: &'a C, alerts: &'a A, timeout: Duration) -> Self {
        Self {
            client,
            alerts,
            timeout,
        }
    }

    /// Apply `rule.actions` in declared order to one triggered campaign.
    #[tracing::instrument(
        skip_all,
        fields(rule_id = %rule.id, campaign_id = %target.campaign.id)
    )]
    pub async fn apply(&self, rule: &Rule, target: &TriggeredCampaign) -> ActionTally {
        let mut tally = ActionTally::default();
        for action in &rule.actions {
            let applied = match action {
                Action::Pause => self.set_status(rule, target, TargetStatus::Paused).await,
                Action::Resume => self.set_status(rule, target, TargetStatus::Active).await,
                Action::Notify { message } => {
                    self.notify(rule, target, message).await;
                    true
                }
                Action::AdjustBudget { percent_change } => {
                    tracing::info!(
                        percent_change,
                        "budget adjustment is not supported, action skipped"
                    );
                    true
                }
            };
            if applied {
                tally.applied += 1;
            } else {
                tally.failed += 1;
            }
        }
        tally
    }

    async fn set_status(
        &self,
        rule: &Rule,
        target: &TriggeredCampaign,
        status: TargetStatus,
    ) -> bool {
        let campaign = &target.campaign;
        let result = upstream::bounded(
            CAMPAIGN_CLIENT,
            self.timeout,
            self.client.set_campaign_status(&campaign.id, status),
        )
        .await;

        match result {
            Ok(()) => {
                tracing::info!(campaign_name = %campaign.name, %status, "campaign status changed");
                let title = match status {
                    TargetStatus::Paused => "Campaign paused",
                    TargetStatus::Active => "Campaign resumed",
                };
                let message = format!("Rule \"{}\" set \"{}\" to {status}", rule.name, campaign.name);
                self.send(describe(Alert::new(AlertKind::Action, title, message), rule, target))
                    .await;
                true
            }
            Err(err) => {
                tracing::warn!(%status, error = %err, "campaign status change failed");
                false
            }
        }
    }

    async fn notify(&self, rule: &Rule, target: &TriggeredCampaign, template: &str) {
        let ctx = TemplateContext {
            rule_name: &rule.name,
            campaign_name: &target.campaign.name,
            campaign_id: &target.campaign.id,
            metric: target.reading,
        };
        let message = render_template(template, &ctx);
        self.send(describe(
            Alert::new(AlertKind::Alert, rule.name.clone(), message),
            rule,
            target,
        ))
        .await;
    }

    async fn send(&self, alert: Alert) {
        let sent = upstream::bounded(ALERT_SENDER, self.timeout, async {
            self.alerts.send(alert).await;
            Ok(())
        })
        .await;
        if let Err(err) = sent {
            tracing::warn!(error = %err, "alert dropped");
        }
    }
}

/// Attach the standard rule and campaign fields to an alert.
fn describe(alert: Alert, rule: &Rule, target: &TriggeredCampaign) -> Alert {
    let alert = alert
        .field("Rule", rule.name.as_str())
        .field("Campaign", target.campaign.name.as_str())
        .field("Campaign ID", target.campaign.id.as_str())
        .field("Account", rule.account_id.normalized().to_string());
    match target.reading {
        Some((metric, value)) => alert.field(metric.to_string(), format!("{value:.2}")),
        None => alert,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::evaluator::tests::{FakeCampaignClient, campaign};
    use adrules_domain::campaign::CampaignStatus;
    use adrules_domain::id::RuleId;
    use adrules_domain::metric::Metric;
    use adrules_domain::rule::{NewRule, Trigger};
    use std::future::Future;
    use std::sync::Mutex;

    // ── Spy alert sender ───────────────────────────────────────────

    #[derive(Default)]
    pub(crate) struct SpyAlertSender {
        pub alerts: Mutex<Vec<Alert>>,
    }

    impl SpyAlertSender {
        pub fn sent(&self) -> Vec<Alert> {
            self.alerts.lock().unwrap().clone()
        }
    }

    impl AlertSender for SpyAlertSender {
        fn send(&self, alert: Alert) -> impl Future<Output = ()> + Send {
            self.alerts.lock().unwrap().push(alert);
            async {}
        }
    }

    struct StalledSender;

    impl AlertSender for StalledSender {
        async fn send(&self, _alert: Alert) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn rule(actions: Vec<Action>) -> Rule {
        let mut builder = NewRule::builder(
            "Nightly cleanup",
            "1234",
            Trigger::Schedule {
                cron_expression: "0 0 * * *".to_string(),
            },
        );
        for action in actions {
            builder = builder.action(action);
        }
        Rule::create(builder.build(), RuleId::new(), adrules_domain::time::now())
    }

    fn target(id: &str, name: &str) -> TriggeredCampaign {
        TriggeredCampaign {
            campaign: campaign(id, name, CampaignStatus::Active),
            reading: None,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(20);

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_pause_campaign_and_send_action_alert() {
        let client = FakeCampaignClient::default();
        let alerts = SpyAlertSender::default();
        let rule = rule(vec![Action::Pause]);

        let tally = Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &target("42", "Summer promo"))
            .await;

        assert_eq!(tally, ActionTally { applied: 1, failed: 0 });
        assert_eq!(
            client.status_calls.lock().unwrap().as_slice(),
            &[("42".to_string(), TargetStatus::Paused)]
        );
        let sent = alerts.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, AlertKind::Action);
        assert_eq!(sent[0].title, "Campaign paused");
        let names: Vec<&str> = sent[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Rule", "Campaign", "Campaign ID", "Account"]);
        assert_eq!(sent[0].fields[3].value, "act_1234");
    }

    #[tokio::test]
    async fn should_run_remaining_actions_when_status_change_fails() {
        let client = FakeCampaignClient::default();
        client
            .failing_status
            .lock()
            .unwrap()
            .insert("42".to_string());
        let alerts = SpyAlertSender::default();
        let rule = rule(vec![
            Action::Pause,
            Action::Notify {
                message: "{{campaign_name}} needs attention".to_string(),
            },
        ]);

        let tally = Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &target("42", "Summer promo"))
            .await;

        assert_eq!(tally, ActionTally { applied: 1, failed: 1 });
        let sent = alerts.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, AlertKind::Alert);
        assert_eq!(sent[0].message, "Summer promo needs attention");
    }

    #[tokio::test]
    async fn should_apply_actions_in_declared_order() {
        let client = FakeCampaignClient::default();
        let alerts = SpyAlertSender::default();
        let rule = rule(vec![Action::Resume, Action::Pause]);

        Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &target("7", "Brand"))
            .await;

        assert_eq!(
            client.status_calls.lock().unwrap().as_slice(),
            &[
                ("7".to_string(), TargetStatus::Active),
                ("7".to_string(), TargetStatus::Paused)
            ]
        );
        let titles: Vec<String> = alerts.sent().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["Campaign resumed", "Campaign paused"]);
    }

    #[tokio::test]
    async fn should_skip_notify_silently_when_no_sender_configured() {
        let client = FakeCampaignClient::default();
        let alerts: Option<SpyAlertSender> = None;
        let rule = rule(vec![
            Action::Notify {
                message: "hello".to_string(),
            },
            Action::Pause,
        ]);

        let tally = Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &target("1", "A"))
            .await;

        assert_eq!(tally, ActionTally { applied: 2, failed: 0 });
        assert_eq!(client.status_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_not_mutate_campaign_when_adjusting_budget() {
        let client = FakeCampaignClient::default();
        let alerts = SpyAlertSender::default();
        let rule = rule(vec![Action::AdjustBudget {
            percent_change: -20.0,
        }]);

        let tally = Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &target("1", "A"))
            .await;

        assert_eq!(tally.failed, 0);
        assert!(client.status_calls.lock().unwrap().is_empty());
        assert!(alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn should_include_metric_reading_in_notification() {
        let client = FakeCampaignClient::default();
        let alerts = SpyAlertSender::default();
        let rule = rule(vec![Action::Notify {
            message: "{{campaign_name}}: {{metric}} at {{metric_value}}".to_string(),
        }]);
        let mut triggered = target("9", "Retargeting");
        triggered.reading = Some((Metric::Cpc, 2.5));

        Executor::new(&client, &alerts, TIMEOUT)
            .apply(&rule, &triggered)
            .await;

        let sent = alerts.sent();
        assert_eq!(sent[0].message, "Retargeting: cpc at 2.50");
        assert_eq!(sent[0].fields.last().unwrap().name, "cpc");
    }

    #[tokio::test(start_paused = true)]
    async fn should_drop_alert_when_sender_stalls() {
        let client = FakeCampaignClient::default();
        let rule = rule(vec![Action::Pause, Action::Resume]);

        let tally = Executor::new(&client, &StalledSender, Duration::from_secs(5))
            .apply(&rule, &target("1", "A"))
            .await;

        assert_eq!(tally, ActionTally { applied: 2, failed: 0 });
        assert_eq!(client.status_calls.lock().unwrap().len(), 2);
    }
}
