//! Domain types and models

pub mod listing;
pub mod request;
pub mod session;

pub use listing::{decode_list, ListEnvelope};
pub use request::{HttpMethod, RequestDescriptor, UploadDescriptor};
pub use session::{LoginRequest, LoginResponse, Session, UserProfile};
