//! Network lookup.
//!
//! The stack lives in a VPC it does not own. Before any resource is declared
//! the VPC is resolved by its `Name` tag into a [`VpcContext`]: its id, CIDR,
//! availability zones and subnet groups.
//!
//! Resolution goes through a [`VpcResolver`], which consults the
//! [`ContextCache`] first and only calls a live [`VpcProvider`] on a miss.
//! Successful lookups are written back to the cache so the next synthesis is
//! deterministic and works offline.
//!
//! ## Providers
//!
//! - [`Ec2VpcProvider`](aws::Ec2VpcProvider): `DescribeVpcs` / `DescribeSubnets` /
//!   `DescribeRouteTables` through the AWS SDK (feature `aws`)
//! - [`StaticVpcProvider`]: fixed in-memory answers

#[cfg(feature = "aws")]
pub mod aws;
pub mod context;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
pub use context::ContextCache;

/// Tag carrying the subnet type assigned by the network's owning stack
pub const SUBNET_TYPE_TAG: &str = "aws-cdk:subnet-type";

/// Tag carrying the subnet group name assigned by the network's owning stack
pub const SUBNET_NAME_TAG: &str = "aws-cdk:subnet-name";

/// Kind of subnet, by how it reaches the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubnetType {
    /// Routes to an internet gateway
    Public,
    /// Egress through NAT
    Private,
    /// No internet route
    Isolated,
}

impl SubnetType {
    /// Parse the value of the subnet-type tag
    pub fn from_tag(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "public" => Some(SubnetType::Public),
            "private" | "private_with_egress" | "private_with_nat" => Some(SubnetType::Private),
            "isolated" | "private_isolated" => Some(SubnetType::Isolated),
            _ => None,
        }
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetType::Public => write!(f, "Public"),
            SubnetType::Private => write!(f, "Private"),
            SubnetType::Isolated => write!(f, "Isolated"),
        }
    }
}

/// A subnet of the resolved VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetInfo {
    /// Subnet id
    pub subnet_id: String,
    /// IPv4 CIDR block; empty when the context entry omits it
    #[serde(default)]
    pub cidr: String,
    /// Availability zone name
    pub availability_zone: String,
    /// Route table associated with the subnet
    pub route_table_id: String,
}

/// Subnets sharing a name and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetGroup {
    /// Group name
    pub name: String,
    /// Group type
    #[serde(rename = "type")]
    pub subnet_type: SubnetType,
    /// Member subnets, ordered by availability zone
    pub subnets: Vec<SubnetInfo>,
}

/// Resolved attributes of an existing VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcContext {
    /// VPC id
    pub vpc_id: String,
    /// Primary IPv4 CIDR block
    pub vpc_cidr_block: String,
    /// Owning account, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_account_id: Option<String>,
    /// Availability zones spanned by the subnets
    pub availability_zones: Vec<String>,
    /// Subnet groups
    pub subnet_groups: Vec<SubnetGroup>,
}

impl VpcContext {
    /// Subnets for the file system's mount targets.
    ///
    /// Private subnets are preferred, then isolated, then public; at most one
    /// subnet per availability zone is returned.
    pub fn default_subnets(&self) -> Result<Vec<&SubnetInfo>> {
        for preferred in [SubnetType::Private, SubnetType::Isolated, SubnetType::Public] {
            let mut seen_azs = Vec::new();
            let mut selected = Vec::new();

            for group in self.subnet_groups.iter().filter(|g| g.subnet_type == preferred) {
                for subnet in &group.subnets {
                    if !seen_azs.contains(&subnet.availability_zone.as_str()) {
                        seen_azs.push(subnet.availability_zone.as_str());
                        selected.push(subnet);
                    }
                }
            }

            if !selected.is_empty() {
                debug!(
                    vpc_id = %self.vpc_id,
                    subnet_type = %preferred,
                    count = selected.len(),
                    "Selected mount target subnets"
                );
                return Ok(selected);
            }
        }

        Err(Error::SubnetSelection {
            vpc_id: self.vpc_id.clone(),
            message: "the VPC has no subnets".to_string(),
        })
    }
}

/// What to look up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VpcQuery {
    /// Target account
    pub account: String,
    /// Target region
    pub region: String,
    /// Value of the VPC's `Name` tag
    pub vpc_name: String,
}

impl VpcQuery {
    /// Create a new query
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        vpc_name: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            vpc_name: vpc_name.into(),
        }
    }

    /// Key under which the answer is stored in the context cache
    pub fn context_key(&self) -> String {
        format!(
            "vpc-provider:account={}:filter.tag:Name={}:region={}:returnAsymmetricSubnets=true",
            self.account, self.vpc_name, self.region
        )
    }

    fn not_found(&self) -> Error {
        Error::VpcNotFound {
            name: self.vpc_name.clone(),
            account: self.account.clone(),
            region: self.region.clone(),
        }
    }
}

/// Source of VPC information
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VpcProvider: Send + Sync {
    /// Look up a VPC by name.
    ///
    /// Returns `Ok(None)` when nothing matches; more than one match is an error.
    async fn find_vpc(&self, query: &VpcQuery) -> Result<Option<VpcContext>>;
}

/// Provider answering from a fixed table, keyed by VPC name
#[derive(Debug, Clone, Default)]
pub struct StaticVpcProvider {
    vpcs: HashMap<String, VpcContext>,
}

impl StaticVpcProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a VPC under a name
    pub fn with_vpc(mut self, name: impl Into<String>, vpc: VpcContext) -> Self {
        self.vpcs.insert(name.into(), vpc);
        self
    }
}

#[async_trait]
impl VpcProvider for StaticVpcProvider {
    async fn find_vpc(&self, query: &VpcQuery) -> Result<Option<VpcContext>> {
        Ok(self.vpcs.get(&query.vpc_name).cloned())
    }
}

/// Resolves VPCs through the context cache, falling back to a live provider
pub struct VpcResolver {
    cache: ContextCache,
    provider: Option<Arc<dyn VpcProvider>>,
    refresh: bool,
}

impl VpcResolver {
    /// Resolver that only answers from the cache
    pub fn cached_only(cache: ContextCache) -> Self {
        Self {
            cache,
            provider: None,
            refresh: false,
        }
    }

    /// Resolver that calls `provider` on cache misses
    pub fn with_provider(cache: ContextCache, provider: Arc<dyn VpcProvider>) -> Self {
        Self {
            cache,
            provider: Some(provider),
            refresh: false,
        }
    }

    /// Ignore cached answers and always ask the provider
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The underlying cache
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Resolve a VPC, consulting the cache first.
    ///
    /// A fresh answer is stored in the cache and the cache file is saved.
    /// Failed lookups are never cached.
    pub async fn resolve(&mut self, query: &VpcQuery) -> Result<VpcContext> {
        let key = query.context_key();

        if !self.refresh {
            if let Some(vpc) = self.cache.get::<VpcContext>(&key)? {
                debug!(key = %key, vpc_id = %vpc.vpc_id, "VPC resolved from context cache");
                return Ok(vpc);
            }
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::ContextMissing { key: key.clone() })?;

        info!(
            vpc_name = %query.vpc_name,
            account = %query.account,
            region = %query.region,
            "Looking up VPC"
        );
        let vpc = provider
            .find_vpc(query)
            .await?
            .ok_or_else(|| query.not_found())?;

        self.cache.set(&key, &vpc)?;
        self.cache.save()?;
        info!(vpc_id = %vpc.vpc_id, "VPC resolved and cached");

        Ok(vpc)
    }
}
