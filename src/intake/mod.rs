//! Step-by-step intake of new orders from a conversational client.
//!
//! Each session holds an [`OrderDraft`] whose [`IntakeStep`] names the next
//! expected answer. Drafts live in an injected [`SessionStore`] and are torn
//! down on completion, cancellation or expiry.

pub mod draft;
pub mod flow;
pub mod session_store;

pub use draft::{IntakeStep, OrderDraft};
pub use flow::{Geocoder, IntakeFlow, IntakeReply};
pub use session_store::{MemorySessionStore, SessionStore};
