pub mod intents;
pub mod ledger;
pub mod orchestrator;
pub mod service;
pub mod sweep;

pub use intents::{IntentHandle, PaymentIntentTracker};
pub use ledger::BookingLedger;
pub use orchestrator::{BookingOrchestrator, Confirmation, HoldRequest, VerifyRequest};
pub use service::{BookingStack, LogNotifier};
pub use sweep::HoldSweeper;
