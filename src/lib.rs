//! `restprobe-http` holds the reusable parts of an HTTP API integration suite.
//!
//! - [`RequestTemplate`]: immutable request defaults (base URL, JSON content
//!   type, request/response loggers) built once and shared by every test.
//! - [`poll_until`] and [`RequestTemplate::poll_until_success`]: bounded
//!   polling of an endpoint with a fixed delay between attempts.
//! - [`ApiResponse`]: buffered response with status assertions and JSON access.

pub mod config;
mod error;
pub mod observer;
mod options;
mod probe;
mod response;
mod template;
mod types;

pub use error::ProbeError;
pub use observer::{Observer, RequestLogger, RequestRecord, ResponseLogger, ResponseRecord};
pub use options::ClientOptions;
pub use probe::{poll_until, ProbePolicy, ProbeResult, ProbeState};
pub use response::ApiResponse;
pub use template::{RequestSpec, RequestTemplate, TemplateBuilder};
pub use types::{
    Cart, CartItem, Credentials, ErrorBody, LoginToken, NewCart, NewPost, Post, User, UsersPage,
};

pub use reqwest::{Method, StatusCode, Url};

pub type Result<T> = std::result::Result<T, ProbeError>;
