//! Elastic File System constructs.
//!
//! A [`FileSystem`] always declares an encrypted `AWS::EFS::FileSystem` plus
//! one `AWS::EFS::MountTarget` per availability zone of the selected subnets.
//! There is no switch for unencrypted storage.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use super::ec2::SecurityGroup;
use super::Stack;
use crate::error::Result;
use crate::lookup::VpcContext;
use crate::template::intrinsic::{get_att, reference};
use crate::template::{CfnResource, RemovalPolicy};

/// When idle files move to the infrequent-access storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePolicy {
    /// After 7 days without access
    After7Days,
    /// After 14 days without access
    After14Days,
    /// After 30 days without access
    After30Days,
    /// After 60 days without access
    After60Days,
    /// After 90 days without access
    After90Days,
}

impl LifecyclePolicy {
    /// Value of `TransitionToIA`
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePolicy::After7Days => "AFTER_7_DAYS",
            LifecyclePolicy::After14Days => "AFTER_14_DAYS",
            LifecyclePolicy::After30Days => "AFTER_30_DAYS",
            LifecyclePolicy::After60Days => "AFTER_60_DAYS",
            LifecyclePolicy::After90Days => "AFTER_90_DAYS",
        }
    }
}

/// Latency/throughput profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PerformanceMode {
    /// Lowest latency
    #[default]
    GeneralPurpose,
    /// Higher aggregate throughput at higher latency
    MaxIo,
}

impl PerformanceMode {
    /// Value of `PerformanceMode`
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::GeneralPurpose => "generalPurpose",
            PerformanceMode::MaxIo => "maxIO",
        }
    }
}

/// How throughput scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThroughputMode {
    /// Scales with the amount of data stored
    #[default]
    Bursting,
    /// Scales with the workload
    Elastic,
}

impl ThroughputMode {
    /// Value of `ThroughputMode`
    pub fn as_str(&self) -> &'static str {
        match self {
            ThroughputMode::Bursting => "bursting",
            ThroughputMode::Elastic => "elastic",
        }
    }
}

/// Properties of a file system
#[derive(Debug, Clone)]
pub struct FileSystemProps<'a> {
    /// Network whose subnets receive mount targets
    pub vpc: &'a VpcContext,
    /// Group attached to every mount target
    pub security_group: &'a SecurityGroup,
    /// Transition to infrequent access
    pub lifecycle_policy: Option<LifecyclePolicy>,
    /// Performance profile
    pub performance_mode: PerformanceMode,
    /// Throughput scaling
    pub throughput_mode: ThroughputMode,
    /// Applied on replacement and deletion
    pub removal_policy: RemovalPolicy,
}

/// Handle to a declared file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystem {
    id: String,
    logical_id: String,
    mount_targets: Vec<String>,
}

impl FileSystem {
    /// Declare an encrypted file system at `<id>/Resource` and its mount targets
    /// at `<id>/EfsMountTarget<n>`
    pub fn new(stack: &mut Stack, id: &str, props: FileSystemProps<'_>) -> Result<Self> {
        let subnets = props.vpc.default_subnets()?;

        let mut properties = json!({
            "Encrypted": true,
            "FileSystemTags": [{ "Key": "Name", "Value": stack.node_path(&[id]) }],
        });
        if let Some(policy) = props.lifecycle_policy {
            properties["LifecyclePolicies"] = json!([{ "TransitionToIA": policy.as_str() }]);
        }
        properties["PerformanceMode"] = json!(props.performance_mode.as_str());
        properties["ThroughputMode"] = json!(props.throughput_mode.as_str());

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::EFS::FileSystem", properties)
                .with_removal_policy(props.removal_policy),
        )?;

        let mut mount_targets = Vec::with_capacity(subnets.len());
        for (index, subnet) in subnets.iter().enumerate() {
            let target_id = format!("EfsMountTarget{}", index + 1);
            let mount_target = stack.add_resource(
                &[id, &target_id],
                CfnResource::new(
                    "AWS::EFS::MountTarget",
                    json!({
                        "FileSystemId": reference(&logical_id),
                        "SecurityGroups": [props.security_group.security_group_id()],
                        "SubnetId": subnet.subnet_id,
                    }),
                ),
            )?;
            mount_targets.push(mount_target);
        }
        debug!(
            file_system = %logical_id,
            mount_targets = mount_targets.len(),
            "Declared file system"
        );

        Ok(Self {
            id: id.to_string(),
            logical_id,
            mount_targets,
        })
    }

    /// Construct id the file system was declared under
    pub fn construct_id(&self) -> &str {
        &self.id
    }

    /// Logical ID of the `AWS::EFS::FileSystem`
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Logical IDs of the mount targets
    pub fn mount_targets(&self) -> &[String] {
        &self.mount_targets
    }

    /// `Ref fs`
    pub fn file_system_id(&self) -> JsonValue {
        reference(&self.logical_id)
    }

    /// `Fn::GetAtt [fs, Arn]`
    pub fn file_system_arn(&self) -> JsonValue {
        get_att(&self.logical_id, "Arn")
    }

    /// Declare an access point at `<fs>/<id>/Resource`.
    ///
    /// The access point carries the file system's Name tag.
    pub fn add_access_point(&self, stack: &mut Stack, id: &str) -> Result<AccessPoint> {
        let logical_id = stack.add_resource(
            &[&self.id, id, "Resource"],
            CfnResource::new(
                "AWS::EFS::AccessPoint",
                json!({
                    "AccessPointTags": [{ "Key": "Name", "Value": stack.node_path(&[&self.id]) }],
                    "FileSystemId": self.file_system_id(),
                }),
            ),
        )?;
        Ok(AccessPoint {
            path: vec![self.id.clone(), id.to_string()],
            logical_id,
        })
    }
}

/// Handle to a declared access point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    path: Vec<String>,
    logical_id: String,
}

impl AccessPoint {
    /// Construct path relative to the stack
    pub fn construct_path(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).collect()
    }

    /// Logical ID of the `AWS::EFS::AccessPoint`
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Fn::GetAtt [ap, Arn]`
    pub fn access_point_arn(&self) -> JsonValue {
        get_att(&self.logical_id, "Arn")
    }
}
