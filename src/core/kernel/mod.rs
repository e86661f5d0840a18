//! Transport plumbing: the frame codec, the HTTP transport and the WebSocket
//! connector. Nothing in here knows about chain types.

pub mod codec;
pub mod rest;
pub mod ws;

pub use codec::{decode_frame, encode_call};
pub use rest::{HttpTransport, HttpTransportBuilder};
pub use ws::{ConnectionState, FrameHandler, Liveness, WsConnector};
