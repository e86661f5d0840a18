pub mod builder;
pub mod chain;
pub mod client;
pub mod core;

pub use builder::ClientBuilder;
pub use client::{BroadcastResponse, NetworkBroadcastApi, ScorumClient};
pub use core::{
    config::{ClientConfig, HttpConfig, WsConfig},
    errors::ClientError,
    traits::{Caller, CallerExt, NoticeCallback},
    types::{RpcError, RpcErrorData},
};
