//! Request lifecycle and group formation for final-year-project matching.
//!
//! Students send each other MESSAGE or PARTNER requests. Accepting a partner
//! request merges both students into a group of at most three, which locks
//! itself when full. All writes go through [`fyp_db::Database::transaction`].

pub mod eligibility;
pub mod error;
pub mod events;
pub mod formation;
pub mod groups;
pub mod requests;

pub use error::{ErrorKind, MatchError, Result};
pub use events::{Dispatcher, EventSink};
pub use groups::GroupService;
pub use requests::{Accepted, RequestService};
