pub mod loaders;
pub mod outcome;
pub mod record;
pub mod run_state;
pub mod status;
pub mod summary;

pub use loaders::{load_records, parse_records};
pub use outcome::{
    DriverFailure, MarkerHit, RawOutcome, SignalVerdict, Signals, Step, SubmissionAttempt,
};
pub use record::Record;
pub use run_state::{RunState, StateEntry};
pub use status::Status;
pub use summary::{RunSummary, SummaryBuilder};
