use std::sync::Arc;
use tracing::{debug, info};

use crate::app::ports::{NotifierPort, ObjectStorePort};
use crate::domain::{parse_customer_records, CustomerRecord, Notice};
use crate::error::Result;
use crate::observability::metrics;
use crate::trigger::ObjectLocation;

/// Stable sort by name over the whole slice; records without a name come first.
pub fn sort_by_name(records: &mut [CustomerRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name));
}

/// The balance notice for one customer, or `None` when there is no address to send to.
pub fn balance_notice(record: &CustomerRecord) -> Option<Notice> {
    let to = record.email.as_deref().filter(|e| !e.trim().is_empty())?;
    let name = record.name.as_deref().unwrap_or("Customer");
    Some(Notice {
        to: to.to_string(),
        subject: "Your current balance".to_string(),
        body: format!(
            "Dear {},\n\nYour current balance is ${:.2}.\n\nBest regards,\nYour Bank",
            name, record.balance
        ),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifySummary {
    pub sent: usize,
    pub skipped: usize,
}

/// Sends balance notices for every customer in a transformed object
pub struct NotifyUseCase {
    store: Arc<dyn ObjectStorePort>,
    notifier: Arc<dyn NotifierPort>,
}

impl NotifyUseCase {
    pub fn new(store: Arc<dyn ObjectStorePort>, notifier: Arc<dyn NotifierPort>) -> Self {
        Self { store, notifier }
    }

    /// Notify customers in name order. A send failure stops the run.
    pub async fn notify_object(&self, location: &ObjectLocation) -> Result<NotifySummary> {
        let body = self.store.get(location).await?;
        let mut records = parse_customer_records(&body)?;
        sort_by_name(&mut records);

        let mut summary = NotifySummary::default();
        for record in &records {
            match balance_notice(record) {
                Some(notice) => {
                    self.notifier.send(&notice).await?;
                    summary.sent += 1;
                }
                None => {
                    debug!(user_id = record.user_id, "No email on record, skipping notice");
                    summary.skipped += 1;
                }
            }
        }

        metrics::notify::sent(summary.sent);
        metrics::notify::skipped(summary.skipped);
        info!(
            location = %location,
            sent = summary.sent,
            skipped = summary.skipped,
            "Balance notices sent"
        );
        Ok(summary)
    }
}
