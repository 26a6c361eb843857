//! Jenkins Blue Ocean collaborators: transport, payload parsing, push feed and run poller.

pub mod executor;
pub mod parser;
pub mod poller;
pub mod sse;
