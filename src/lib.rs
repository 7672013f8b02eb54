// Library interface for mangascrape
// One adapter per supported site, a shared discovery contract, and the
// collaborators those adapters call into.

pub mod client;
pub mod config;
pub mod helpers;
pub mod models;
pub mod outcome;
pub mod repository;
pub mod sources;

pub use client::{HttpClient, NetworkClient};
pub use models::{Chapter, Page, RepositoryInfo, Series};
pub use outcome::Fetched;
pub use repository::Repository;
