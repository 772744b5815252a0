//! Session facade over the remote visualization/query service.

pub mod connect;
pub mod facade;
pub mod transport;
pub mod wire;

pub use connect::{normalize_session_url, start_session, AppSession};
pub use facade::{methods, PlayerId, Session, RESULT_PAGE_LIMIT, WORKING_SET_SIZE};
pub use transport::RpcTransport;
pub use wire::{RpcFault, RpcReply, RpcRequest};
