//! Demo campaigns loaded by [`VirtualAccount::demo`](crate::VirtualAccount::demo).
//!
//! Ids are fixed so rules written against the demo account keep working
//! across restarts.

use adrules_domain::campaign::{Campaign, CampaignStatus};
use adrules_domain::metric::{Metric, MetricRecord};

pub(crate) struct Seed {
    pub campaign: Campaign,
    pub today: Option<MetricRecord>,
}

fn record(values: &[(Metric, f64)]) -> MetricRecord {
    values
        .iter()
        .fold(MetricRecord::new(), |record, (metric, value)| {
            record.with(metric.field_name(), *value)
        })
}

pub(crate) fn campaigns() -> Vec<Seed> {
    vec![
        Seed {
            campaign: Campaign::new("demo-1", "Spring sale - prospecting", CampaignStatus::Active)
                .with_spend(48.0),
            today: Some(record(&[
                (Metric::Spend, 48.0),
                (Metric::Impressions, 12_000.0),
                (Metric::Clicks, 240.0),
                (Metric::Reach, 10_000.0),
                (Metric::Ctr, 2.0),
                (Metric::Cpc, 0.2),
                (Metric::Cpm, 4.0),
                (Metric::Frequency, 1.2),
                (Metric::Conversions, 12.0),
            ])),
        },
        Seed {
            campaign: Campaign::new("demo-2", "Retargeting - cart abandoners", CampaignStatus::Active)
                .with_spend(130.0),
            today: Some(record(&[
                (Metric::Spend, 130.0),
                (Metric::Impressions, 20_000.0),
                (Metric::Clicks, 100.0),
                (Metric::Reach, 8_000.0),
                (Metric::Ctr, 0.5),
                (Metric::Cpc, 1.3),
                (Metric::Cpm, 6.5),
                (Metric::Frequency, 2.5),
                (Metric::Conversions, 4.0),
            ])),
        },
        Seed {
            campaign: Campaign::new("demo-3", "Brand awareness", CampaignStatus::Paused),
            today: None,
        },
        Seed {
            campaign: Campaign::new("demo-4", "Holiday promo", CampaignStatus::Archived),
            today: None,
        },
    ]
}
