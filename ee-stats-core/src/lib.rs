#![doc = "ee-stats-core: core pipeline library for ee-stats."]

//! This crate contains the download, combine and normalize pipeline for
//! Earth Engine publisher statistics. The CLI lives in the `ee-stats` crate.
//!
//! # Usage
//! Build a [`config::PipelineConfig`], pick an [`contract::Authenticator`] and an
//! [`contract::ObjectCopier`] (the `gcloud` module has the CLI-backed ones) and
//! call [`pipeline::run_pipeline`].

pub mod auth;
pub mod combine;
pub mod config;
pub mod contract;
pub mod download;
pub mod errors;
pub mod gcloud;
pub mod manifest;
pub mod normalize;
pub mod pipeline;
