//! Client side of the remote tool protocol: JSON-RPC 2.0 over HTTP, answered
//! either with a plain JSON body or with a server-sent-events stream.
pub mod client;
pub mod invoker;
pub mod rpc;
pub mod sse;
