//! Listing Query Library
//!
//! Translates listing filter, sort and pagination criteria into remote API
//! parameters, predicate trees and aggregation pipelines. The
//! `listing-query` binary is a command-line front end over the same
//! builders.

pub mod config;
pub mod error;
pub mod listing;

pub use error::{QueryError, QueryResult};
