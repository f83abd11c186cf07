use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use cinebook_core::collaborators::{BookingNotice, NotificationDispatch};
use cinebook_core::payment::GatewayAdapter;
use cinebook_core::CoreResult;
use cinebook_gateway::gateway_for;
use cinebook_store::{BusinessRules, Config, MemoryStore};

use crate::intents::PaymentIntentTracker;
use crate::ledger::BookingLedger;
use crate::orchestrator::BookingOrchestrator;
use crate::sweep::HoldSweeper;

/// Default notification channel: structured log lines in place of the mail
/// template pipeline.
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatch for LogNotifier {
    async fn booking_confirmed(&self, recipient: &str, notice: &BookingNotice) -> CoreResult<()> {
        info!(
            recipient,
            booking_id = %notice.booking_id,
            seats = ?notice.seats,
            total_price = notice.total_price,
            "booking confirmation dispatched"
        );
        Ok(())
    }
}

/// Fully wired booking subsystem over the in-memory store: the ledger,
/// tracker, orchestrator and sweeper sharing one store and one configured
/// gateway.
pub struct BookingStack {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<dyn GatewayAdapter>,
    pub ledger: Arc<BookingLedger>,
    pub tracker: Arc<PaymentIntentTracker>,
    pub orchestrator: BookingOrchestrator,
    pub sweeper: Arc<HoldSweeper>,
}

impl BookingStack {
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        let gateway = gateway_for(&config.gateway)?;
        Ok(Self::assemble(
            Arc::new(MemoryStore::new()),
            gateway,
            config.business_rules.clone(),
        ))
    }

    pub fn assemble(
        store: Arc<MemoryStore>,
        gateway: Arc<dyn GatewayAdapter>,
        rules: BusinessRules,
    ) -> Self {
        let ledger = Arc::new(BookingLedger::new(
            store.clone(),
            store.clone(),
            rules.clone(),
        ));
        let tracker = Arc::new(PaymentIntentTracker::new(store.clone(), gateway.clone()));
        let orchestrator = BookingOrchestrator::new(
            ledger.clone(),
            tracker.clone(),
            gateway.clone(),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
        );
        let sweeper = Arc::new(HoldSweeper::new(
            ledger.clone(),
            tracker.clone(),
            store.clone(),
            &rules,
        ));

        Self {
            store,
            gateway,
            ledger,
            tracker,
            orchestrator,
            sweeper,
        }
    }
}
