pub mod age;
pub mod error;
pub mod form;
pub mod grid;
pub mod model;
pub mod normalize;
pub mod query;
pub mod session;

pub use error::{Result, ViewError};
pub use form::SearchForm;
pub use grid::{Column, Grid, SortDirection, SortSpec};
pub use model::{PatientBundle, PatientRecord};
pub use normalize::{DisplayRecord, normalize_bundle};
pub use query::PatientQuery;
pub use session::{Outcome, Session, Ticket};

/// Placeholder for a value the record does not carry
pub const NOT_AVAILABLE: &str = "N/A";
