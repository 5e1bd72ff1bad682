mod client;

pub use client::{ClientListResponse, ClientRecord, ClientResponse, ClientSummary, SaveResponse};
