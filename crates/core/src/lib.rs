//! Vote bookkeeping for suggestion posts.
//!
//! - `ledger` owns per-post vote state behind per-post locks
//! - `tally` turns a record into counts, percentages and mention lists
//! - `domain` holds identifiers, vote records and captured suggestions
//! - `config` loads layered runtime configuration
//! - `errors` maps failures to user-safe notices

pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod tally;

pub use domain::suggestion::{discussion_title, SuggestionDraft};
pub use domain::vote::{PostId, UserId, VoteChoice, VoteRecord};
pub use errors::{ApplicationError, InterfaceError};
pub use ledger::{PostEntry, PostHandle, VoteLedger};
pub use tally::{render, Tally};
