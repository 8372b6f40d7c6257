//! Client for a deleted-file recovery backend: starts scans and recoveries,
//! follows their jobs to completion and keeps the display regions in step.

pub mod config;
pub mod core;
pub mod gateway;
pub mod i18n;

#[cfg(test)]
mod test_helpers;
