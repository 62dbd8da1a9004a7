//! The shared-storages stack definition.
//!
//! Declares, inside an existing VPC:
//!
//! - a security group opening the NFS port to any IPv4 address
//! - an encrypted file system with one mount target per availability zone
//! - an access point that explicitly depends on the file system
//! - a managed policy scoped to the file system and the access point
//! - a role assumable by EC2 and Cloud9, plus an instance profile wrapping it
//!
//! and publishes `efsArn`, `efsId` and `iamRole`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constructs::ec2::{Peer, Port, SecurityGroup, SecurityGroupProps};
use crate::constructs::efs::{
    AccessPoint, FileSystem, FileSystemProps, LifecyclePolicy, PerformanceMode, ThroughputMode,
};
use crate::constructs::iam::{
    CompositePrincipal, InstanceProfile, ManagedPolicy, PolicyDocument, PolicyStatement, Role,
    RoleProps, ServicePrincipal,
};
use crate::constructs::{Environment, Stack};
use crate::error::{Error, Result};
use crate::lookup::{VpcContext, VpcQuery};
use crate::template::{RemovalPolicy, Template};

/// Stack name used when none is configured
pub const DEFAULT_STACK_NAME: &str = "SharedStoragesStack";

/// `Name` tag of the VPC the stack is deployed into, unless overridden
pub const DEFAULT_VPC_NAME: &str = "AriefhInfraStack/dev-vpc";

/// NFS port
pub const EFS_PORT: u16 = 2049;

/// Construct id of the looked-up VPC
pub const VPC_ID: &str = "dev-vpc";
/// Construct id of the security group
pub const SECURITY_GROUP_ID: &str = "efs-root-sg";
/// Construct id of the file system
pub const FILE_SYSTEM_ID: &str = "ecs-app-efs";
/// Construct id of the access point, below the file system
pub const ACCESS_POINT_ID: &str = "efs-root-access-point";
/// Construct id of the customer-managed policy
pub const POLICY_ID: &str = "efs-root-policy";
/// Construct id of the role
pub const ROLE_ID: &str = "efs-root-access-role";
/// Construct id of the instance profile
pub const INSTANCE_PROFILE_ID: &str = "efs-root-access-instance-profile";

/// Statement id of the file-system access statement
pub const POLICY_STATEMENT_SID: &str = "efsRootAccessPolicy";

/// Actions granted on the file system and access point
pub const EFS_ROOT_ACTIONS: [&str; 3] = [
    "elasticfilesystem:ClientMount",
    "elasticfilesystem:ClientWrite",
    "elasticfilesystem:ClientRootAccess",
];

/// Services allowed to assume the role
pub const TRUSTED_SERVICES: [&str; 2] = ["ec2.amazonaws.com", "cloud9.amazonaws.com"];

/// AWS-managed policies attached to the role after the custom one
pub const BASELINE_MANAGED_POLICIES: [&str; 2] =
    ["AmazonSSMManagedInstanceCore", "AWSCloud9SSMInstanceProfile"];

/// Output carrying the file-system ARN
pub const OUTPUT_EFS_ARN: &str = "efsArn";
/// Output carrying the file-system id
pub const OUTPUT_EFS_ID: &str = "efsId";
/// Output carrying the role ARN
pub const OUTPUT_IAM_ROLE: &str = "iamRole";

/// Inputs of the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackProps {
    /// Stack name
    pub stack_name: String,
    /// Deployment target
    pub env: Environment,
    /// `Name` tag of the existing VPC
    pub vpc_name: String,
    /// Template description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for StackProps {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            env: Environment::default(),
            vpc_name: DEFAULT_VPC_NAME.to_string(),
            description: None,
        }
    }
}

/// The declared shared-storages stack and handles to its resources
#[derive(Debug, Clone)]
pub struct SharedStoragesStack {
    stack: Stack,
    vpc_id: String,
    security_group: SecurityGroup,
    file_system: FileSystem,
    access_point: AccessPoint,
    policy: ManagedPolicy,
    role: Role,
    instance_profile: InstanceProfile,
}

impl SharedStoragesStack {
    /// The VPC lookup the stack needs.
    ///
    /// A lookup is environment-specific, so both account and region must be
    /// known.
    pub fn query(props: &StackProps) -> Result<VpcQuery> {
        let missing = |what| Error::EnvironmentUnresolved {
            vpc_name: props.vpc_name.clone(),
            missing: what,
        };
        let account = props.env.account.as_deref().ok_or_else(|| missing("account"))?;
        let region = props.env.region.as_deref().ok_or_else(|| missing("region"))?;
        Ok(VpcQuery::new(account, region, &props.vpc_name))
    }

    /// Declare every resource of the stack into the resolved VPC
    pub fn build(props: &StackProps, vpc: &VpcContext) -> Result<Self> {
        let mut stack = Stack::new(&props.stack_name, props.env.clone());
        if let Some(description) = &props.description {
            stack = stack.with_description(description);
        }

        let security_group = SecurityGroup::new(
            &mut stack,
            SECURITY_GROUP_ID,
            SecurityGroupProps {
                vpc_id: vpc.vpc_id.clone(),
                description: "Security group used by EFS for root path".to_string(),
                allow_all_outbound: true,
            },
        )?;
        security_group.add_ingress_rule(&mut stack, Peer::any_ipv4(), Port::tcp(EFS_PORT))?;

        let file_system = FileSystem::new(
            &mut stack,
            FILE_SYSTEM_ID,
            FileSystemProps {
                vpc,
                security_group: &security_group,
                lifecycle_policy: Some(LifecyclePolicy::After30Days),
                performance_mode: PerformanceMode::GeneralPurpose,
                throughput_mode: ThroughputMode::Bursting,
                removal_policy: RemovalPolicy::Retain,
            },
        )?;

        let access_point = file_system.add_access_point(&mut stack, ACCESS_POINT_ID)?;
        stack.add_dependency(
            &access_point.construct_path(),
            &[file_system.construct_id()],
        )?;

        let policy = ManagedPolicy::new(
            &mut stack,
            POLICY_ID,
            &PolicyDocument::new(vec![PolicyStatement::new()
                .sid(POLICY_STATEMENT_SID)
                .actions(EFS_ROOT_ACTIONS)
                .resources([
                    access_point.access_point_arn(),
                    file_system.file_system_arn(),
                ])]),
        )?;

        let mut managed_policy_arns = vec![policy.policy_arn()];
        managed_policy_arns.extend(
            BASELINE_MANAGED_POLICIES
                .iter()
                .map(|name| ManagedPolicy::aws_managed(name)),
        );
        let role = Role::new(
            &mut stack,
            ROLE_ID,
            RoleProps {
                assumed_by: CompositePrincipal::new(
                    TRUSTED_SERVICES.iter().map(|s| ServicePrincipal::new(*s)),
                ),
                managed_policy_arns,
            },
        )?;

        let instance_profile = InstanceProfile::new(&mut stack, INSTANCE_PROFILE_ID, &role)?;

        stack.add_output(OUTPUT_EFS_ARN, file_system.file_system_arn(), "EFS ARN")?;
        stack.add_output(OUTPUT_EFS_ID, file_system.file_system_id(), "EFS Id")?;
        stack.add_output(OUTPUT_IAM_ROLE, role.role_arn(), "IAM Role")?;

        info!(
            stack = %props.stack_name,
            vpc_id = %vpc.vpc_id,
            resources = stack.resource_count(),
            "Declared shared storages stack"
        );

        Ok(Self {
            stack,
            vpc_id: vpc.vpc_id.clone(),
            security_group,
            file_system,
            access_point,
            policy,
            role,
            instance_profile,
        })
    }

    /// The underlying stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Id of the VPC the stack was built into
    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    /// Security group handle
    pub fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    /// File system handle
    pub fn file_system(&self) -> &FileSystem {
        &self.file_system
    }

    /// Access point handle
    pub fn access_point(&self) -> &AccessPoint {
        &self.access_point
    }

    /// Managed policy handle
    pub fn policy(&self) -> &ManagedPolicy {
        &self.policy
    }

    /// Role handle
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Instance profile handle
    pub fn instance_profile(&self) -> &InstanceProfile {
        &self.instance_profile
    }

    /// Produce the template
    pub fn synthesize(&self) -> Result<Template> {
        self.stack.synthesize()
    }
}
