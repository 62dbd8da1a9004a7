//! Shared test utilities and fixtures for the shared-storages test suite.
//!
//! This module provides:
//! - A sample VPC context with public and private subnets
//! - A counting [`VpcProvider`] implementation
//! - Helpers for seeding context files
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use shared_storages::constructs::Environment;
use shared_storages::error::Result;
use shared_storages::lookup::{
    ContextCache, SubnetGroup, SubnetInfo, SubnetType, VpcContext, VpcProvider, VpcQuery,
};
use shared_storages::stack::StackProps;

pub const TEST_ACCOUNT: &str = "123456789012";
pub const TEST_REGION: &str = "eu-west-1";

// ============================================================================
// Fixtures
// ============================================================================

fn subnet(id: &str, az: &str, cidr: &str) -> SubnetInfo {
    SubnetInfo {
        subnet_id: id.to_string(),
        cidr: cidr.to_string(),
        availability_zone: az.to_string(),
        route_table_id: format!("rtb-{}", id),
    }
}

/// A two-AZ VPC with one public and one private subnet per AZ
pub fn sample_vpc() -> VpcContext {
    VpcContext {
        vpc_id: "vpc-0123456789abcdef0".to_string(),
        vpc_cidr_block: "10.0.0.0/16".to_string(),
        owner_account_id: Some(TEST_ACCOUNT.to_string()),
        availability_zones: vec!["eu-west-1a".to_string(), "eu-west-1b".to_string()],
        subnet_groups: vec![
            SubnetGroup {
                name: "Public".to_string(),
                subnet_type: SubnetType::Public,
                subnets: vec![
                    subnet("subnet-public-a", "eu-west-1a", "10.0.0.0/24"),
                    subnet("subnet-public-b", "eu-west-1b", "10.0.1.0/24"),
                ],
            },
            SubnetGroup {
                name: "Private".to_string(),
                subnet_type: SubnetType::Private,
                subnets: vec![
                    subnet("subnet-private-a", "eu-west-1a", "10.0.2.0/24"),
                    subnet("subnet-private-b", "eu-west-1b", "10.0.3.0/24"),
                ],
            },
        ],
    }
}

/// Stack props targeting the test account and region
pub fn sample_props() -> StackProps {
    StackProps {
        env: Environment::new(Some(TEST_ACCOUNT.into()), Some(TEST_REGION.into())),
        ..StackProps::default()
    }
}

/// Write a context file holding `vpc` under the query for `props`
pub fn seed_context(path: &Path, props: &StackProps, vpc: &VpcContext) -> PathBuf {
    let query = VpcQuery::new(
        props.env.account.clone().unwrap_or_default(),
        props.env.region.clone().unwrap_or_default(),
        &props.vpc_name,
    );
    let mut cache = ContextCache::load(path).unwrap();
    cache.set(&query.context_key(), vpc).unwrap();
    cache.save().unwrap();
    path.to_path_buf()
}

// ============================================================================
// Counting Provider
// ============================================================================

/// Provider that answers with a fixed VPC (or nothing) and counts calls
#[derive(Debug, Default)]
pub struct CountingVpcProvider {
    vpc: Option<VpcContext>,
    calls: AtomicU32,
}

impl CountingVpcProvider {
    pub fn returning(vpc: VpcContext) -> Arc<Self> {
        Arc::new(Self {
            vpc: Some(vpc),
            calls: AtomicU32::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VpcProvider for CountingVpcProvider {
    async fn find_vpc(&self, _query: &VpcQuery) -> Result<Option<VpcContext>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vpc.clone())
    }
}
