//! Admission control for workloads and catalog services

pub mod admission;
pub mod catalog;
pub mod config;
pub mod dependency;
pub mod kubemodel;
pub mod policy;
pub mod validate;
