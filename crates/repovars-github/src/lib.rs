//! repovars-github: GitHub REST implementation of the repovars remote
//!
//! [`GithubClient`] speaks to `api.github.com` (or a GitHub Enterprise
//! `/api/v3` host) and implements [`repovars_core::RemoteClient`].
//! A 404 on a read is `Lookup::NotFound`; every other non-2xx status is
//! classified into a [`repovars_core::RemoteError`].

pub mod client;
pub mod config;
pub mod error;
mod status;

pub use client::GithubClient;
pub use config::{GithubConfig, API_VERSION, DEFAULT_API_URL};
pub use error::{GithubError, Result};
