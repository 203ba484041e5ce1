pub mod classifier;
pub mod notifier;
pub mod report_writer;
pub mod signal_probe;
pub mod state_store;
pub mod trigger;

pub use classifier::{Classification, Classifier};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use report_writer::ReportWriter;
pub use signal_probe::{SelectorProbe, SignalProbe, TextProbe};
pub use state_store::{JsonlStateStore, StateStore};
pub use trigger::TriggerStrategy;
