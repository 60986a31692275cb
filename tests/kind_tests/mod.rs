//! Integration tests for kedactl against a live cluster
//!
//! # Test Organization
//!
//! - `provisioning`: Stories about standing up a KEDA-scaled Deployment and
//!   the rollback when the autoscaling policy is rejected
//! - `status`: Stories about reading workload health
//!
//! Each test works in its own namespace and deletes it afterwards.

mod helpers;
mod provisioning;
mod status;
