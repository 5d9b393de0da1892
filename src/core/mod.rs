//! Core client: retry engine, transport, document jobs and API facade

pub mod backoff;
pub mod client;
pub mod config;
pub mod document;
pub mod errors;
pub mod glossary;
pub mod language;
pub mod logger;
pub mod models;
pub mod multilingual;
pub mod options;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
