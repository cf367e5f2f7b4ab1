//! Client side of the cloud storage open API.
//!
//! [`Gateway`] is the seam every service talks through: [`HttpGateway`] is the
//! real implementation, tests substitute their own. Services on top of it:
//! [`Metadata`] (listing, search, file operations), [`Account`] (user info,
//! quota, block size tier) and [`Downloader`].

pub mod account;
pub mod download;
pub mod error;
pub mod gateway;
pub mod http;
pub mod metadata;
pub mod token;

pub use account::Account;
pub use download::{DirDownloadOutcome, DownloadOutcome, Downloader};
pub use error::ClientError;
pub use gateway::{ApiRequest, Body, BoxFuture, FilePart, Gateway, HttpMethod, fetch};
pub use http::{Endpoints, HttpGateway, build_http_client};
pub use metadata::{ListOptions, Metadata, SortOrder};
pub use token::{Credentials, RefreshingToken, StaticToken, TokenSource};

#[cfg(test)]
pub(crate) mod testing;
