pub mod counter;
pub mod error;
pub mod events;
pub mod name;
pub mod time;

pub use counter::{CounterRecord, IssueOrigin, ResetPeriod};
pub use error::{CoreError, ErrorCategory, Result};
pub use name::{MAX_NAME_LEN, SequenceName, validate_name};
pub use time::now_utc;
