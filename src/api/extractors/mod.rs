//! Request extractors.

mod client_ip;
mod json_payload;
mod validated_json;
mod validated_query;

pub use client_ip::{client_identifier, ClientIp};
pub use json_payload::JsonPayload;
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;
