//! VPC lookup through the AWS EC2 API.
//!
//! Credentials come from the standard AWS credential chain:
//!
//! 1. Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! 2. AWS credentials file (`~/.aws/credentials`)
//! 3. IAM instance profile (when running on EC2)
//!
//! The region is always taken from the query, never from the ambient config,
//! so the lookup targets the same region the stack is synthesized for.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::types::{Filter, RouteTable, Subnet, Tag};
use aws_sdk_ec2::Client;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{
    SubnetGroup, SubnetInfo, SubnetType, VpcContext, VpcProvider, VpcQuery, SUBNET_NAME_TAG,
    SUBNET_TYPE_TAG,
};
use crate::error::{Error, Result};

/// Looks up VPCs with `DescribeVpcs`, `DescribeSubnets` and `DescribeRouteTables`
#[derive(Debug, Default)]
pub struct Ec2VpcProvider;

impl Ec2VpcProvider {
    /// Create a provider using the default credential chain
    pub fn new() -> Self {
        Self
    }

    /// Create AWS EC2 client for a region
    async fn create_client(region: &str) -> Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_ec2::config::Region::new(region.to_string()))
            .load()
            .await;

        Client::new(&config)
    }

    async fn describe_subnets(client: &Client, vpc_id: &str) -> Result<Vec<Subnet>> {
        let resp = client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .map_err(|e| Error::VpcLookup(format!("Failed to describe subnets: {}", e)))?;

        Ok(resp.subnets().to_vec())
    }

    async fn describe_route_tables(client: &Client, vpc_id: &str) -> Result<Vec<RouteTable>> {
        let resp = client
            .describe_route_tables()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .map_err(|e| Error::VpcLookup(format!("Failed to describe route tables: {}", e)))?;

        Ok(resp.route_tables().to_vec())
    }
}

#[async_trait]
impl VpcProvider for Ec2VpcProvider {
    async fn find_vpc(&self, query: &VpcQuery) -> Result<Option<VpcContext>> {
        let client = Self::create_client(&query.region).await;

        let resp = client
            .describe_vpcs()
            .filters(
                Filter::builder()
                    .name("tag:Name")
                    .values(&query.vpc_name)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Error::VpcLookup(format!("Failed to describe VPCs: {}", e)))?;

        let vpc = match resp.vpcs() {
            [] => return Ok(None),
            [vpc] => vpc,
            many => {
                return Err(Error::AmbiguousVpc {
                    name: query.vpc_name.clone(),
                    count: many.len(),
                })
            }
        };

        let vpc_id = vpc.vpc_id().unwrap_or_default().to_string();
        let owner_account_id = vpc.owner_id().map(str::to_string);
        if let Some(owner) = owner_account_id.as_deref() {
            if owner != query.account {
                warn!(
                    vpc_id = %vpc_id,
                    owner = %owner,
                    account = %query.account,
                    "VPC is owned by a different account than the stack targets"
                );
            }
        }

        let subnets = Self::describe_subnets(&client, &vpc_id).await?;
        let route_tables = Self::describe_route_tables(&client, &vpc_id).await?;
        debug!(
            vpc_id = %vpc_id,
            subnets = subnets.len(),
            route_tables = route_tables.len(),
            "Described VPC"
        );

        Ok(Some(VpcContext {
            vpc_cidr_block: vpc.cidr_block().unwrap_or_default().to_string(),
            owner_account_id,
            availability_zones: availability_zones(&subnets),
            subnet_groups: group_subnets(&subnets, &route_tables),
            vpc_id,
        }))
    }
}

fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key() == Some(key))
        .and_then(|t| t.value())
}

/// Route table for a subnet: its explicit association, else the main table
fn route_table_for<'a>(subnet_id: &str, route_tables: &'a [RouteTable]) -> Option<&'a RouteTable> {
    route_tables
        .iter()
        .find(|rt| {
            rt.associations()
                .iter()
                .any(|a| a.subnet_id() == Some(subnet_id))
        })
        .or_else(|| {
            route_tables
                .iter()
                .find(|rt| rt.associations().iter().any(|a| a.main() == Some(true)))
        })
}

fn routes_to_internet_gateway(route_table: &RouteTable) -> bool {
    route_table
        .routes()
        .iter()
        .any(|r| r.gateway_id().is_some_and(|g| g.starts_with("igw-")))
}

fn availability_zones(subnets: &[Subnet]) -> Vec<String> {
    let mut azs: Vec<String> = subnets
        .iter()
        .filter_map(|s| s.availability_zone().map(str::to_string))
        .collect();
    azs.sort();
    azs.dedup();
    azs
}

/// Classify subnets into named groups.
///
/// The type comes from the subnet-type tag when present; otherwise a subnet is
/// public when it maps public IPs on launch or routes to an internet gateway,
/// and private in every other case.
fn group_subnets(subnets: &[Subnet], route_tables: &[RouteTable]) -> Vec<SubnetGroup> {
    let mut groups: IndexMap<(String, SubnetType), Vec<SubnetInfo>> = IndexMap::new();

    for subnet in subnets {
        let Some(subnet_id) = subnet.subnet_id() else {
            continue;
        };
        let route_table = route_table_for(subnet_id, route_tables);

        let subnet_type = tag_value(subnet.tags(), SUBNET_TYPE_TAG)
            .and_then(SubnetType::from_tag)
            .unwrap_or_else(|| {
                let is_public = subnet.map_public_ip_on_launch().unwrap_or(false)
                    || route_table.is_some_and(routes_to_internet_gateway);
                if is_public {
                    SubnetType::Public
                } else {
                    SubnetType::Private
                }
            });
        let name = tag_value(subnet.tags(), SUBNET_NAME_TAG)
            .map(str::to_string)
            .unwrap_or_else(|| subnet_type.to_string());

        groups.entry((name, subnet_type)).or_default().push(SubnetInfo {
            subnet_id: subnet_id.to_string(),
            cidr: subnet.cidr_block().unwrap_or_default().to_string(),
            availability_zone: subnet.availability_zone().unwrap_or_default().to_string(),
            route_table_id: route_table
                .and_then(|rt| rt.route_table_id())
                .unwrap_or_default()
                .to_string(),
        });
    }

    groups
        .into_iter()
        .map(|((name, subnet_type), mut subnets)| {
            subnets.sort_by(|a, b| a.availability_zone.cmp(&b.availability_zone));
            SubnetGroup {
                name,
                subnet_type,
                subnets,
            }
        })
        .collect()
}
