//! Client side of the grid ajax protocol.
//!
//! [`Refresher`] keeps a grid's filter form and rendered view in sync with the
//! server: each submit or pagination click sends one request through a
//! [`Transport`] and repaints the table body and pagination from the response.

pub mod error;
pub mod form;
pub mod refresher;
pub mod transport;

pub use error::ClientError;
pub use form::FilterForm;
pub use refresher::{GridView, Outcome, Refresher, RefresherConfig, Ticket, Trigger};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};
