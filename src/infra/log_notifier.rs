use crate::app::ports::NotifierPort;
use crate::domain::Notice;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Notifier that writes each notice to the log instead of delivering it.
pub struct LogNotifier;

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn send(&self, notice: &Notice) -> Result<()> {
        info!(to = %notice.to, subject = %notice.subject, "Sending notice:\n{}", notice.body);
        Ok(())
    }
}
