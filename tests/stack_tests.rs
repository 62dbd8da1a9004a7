//! Integration tests for the synthesized shared-storages stack
//!
//! These tests cover:
//! - Resource inventory and fixed configuration values
//! - Explicit ordering of the access point after the file system
//! - Policy scoping and role trust
//! - Outputs
//! - Logical ID stability
//! - Lookup failures and the context cache

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

use shared_storages::app::App;
use shared_storages::error::Error;
use shared_storages::lookup::{ContextCache, VpcResolver};
use shared_storages::stack::SharedStoragesStack;
use shared_storages::template::logical_id::make_unique_id;
use shared_storages::template::{CfnResource, Template};

fn synthesize() -> Template {
    SharedStoragesStack::build(&sample_props(), &sample_vpc())
        .unwrap()
        .synthesize()
        .unwrap()
}

fn single<'a>(template: &'a Template, resource_type: &'a str) -> (&'a String, &'a CfnResource) {
    let mut found: Vec<_> = template.resources_of_type(resource_type).collect();
    assert_eq!(found.len(), 1, "expected exactly one {}", resource_type);
    found.remove(0)
}

// ============================================================================
// Resource Inventory
// ============================================================================

#[test]
fn test_resource_counts() {
    let template = synthesize();
    let count = |t: &str| template.resources_of_type(t).count();

    assert_eq!(count("AWS::EC2::SecurityGroup"), 1);
    assert_eq!(count("AWS::EFS::FileSystem"), 1);
    assert_eq!(count("AWS::EFS::MountTarget"), 2);
    assert_eq!(count("AWS::EFS::AccessPoint"), 1);
    assert_eq!(count("AWS::IAM::ManagedPolicy"), 1);
    assert_eq!(count("AWS::IAM::Role"), 1);
    assert_eq!(count("AWS::IAM::InstanceProfile"), 1);
    assert_eq!(template.resources.len(), 8);
    assert_eq!(template.format_version, "2010-09-09");
}

#[test]
fn test_security_group_allows_nfs_from_anywhere() {
    let template = synthesize();
    let (_, sg) = single(&template, "AWS::EC2::SecurityGroup");

    assert_eq!(
        sg.properties["GroupDescription"],
        "Security group used by EFS for root path"
    );
    assert_eq!(sg.properties["VpcId"], "vpc-0123456789abcdef0");
    assert_eq!(
        sg.properties["SecurityGroupIngress"],
        json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "from 0.0.0.0/0:2049",
            "FromPort": 2049,
            "IpProtocol": "tcp",
            "ToPort": 2049
        }])
    );
    assert_eq!(
        sg.properties["SecurityGroupEgress"],
        json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1"
        }])
    );
}

#[test]
fn test_file_system_configuration() {
    let template = synthesize();
    let (_, fs) = single(&template, "AWS::EFS::FileSystem");

    assert_eq!(fs.properties["Encrypted"], true);
    assert_eq!(
        fs.properties["LifecyclePolicies"],
        json!([{"TransitionToIA": "AFTER_30_DAYS"}])
    );
    assert_eq!(fs.properties["PerformanceMode"], "generalPurpose");
    assert_eq!(fs.properties["ThroughputMode"], "bursting");
    assert_eq!(
        fs.properties["FileSystemTags"],
        json!([{"Key": "Name", "Value": "SharedStoragesStack/ecs-app-efs"}])
    );

    let rendered = serde_json::to_value(fs).unwrap();
    assert_eq!(rendered["DeletionPolicy"], "Retain");
    assert_eq!(rendered["UpdateReplacePolicy"], "Retain");
}

#[test]
fn test_access_point_shares_file_system_name_tag() {
    let template = synthesize();
    let (_, fs) = single(&template, "AWS::EFS::FileSystem");
    let (_, ap) = single(&template, "AWS::EFS::AccessPoint");

    assert_eq!(
        ap.properties["AccessPointTags"],
        json!([{"Key": "Name", "Value": "SharedStoragesStack/ecs-app-efs"}])
    );
    assert_eq!(ap.properties["AccessPointTags"], fs.properties["FileSystemTags"]);
}

#[test]
fn test_mount_targets_use_private_subnets() {
    let template = synthesize();
    let (fs_id, _) = single(&template, "AWS::EFS::FileSystem");
    let (sg_id, _) = single(&template, "AWS::EC2::SecurityGroup");

    let subnets: Vec<&str> = template
        .resources_of_type("AWS::EFS::MountTarget")
        .map(|(_, mt)| {
            assert_eq!(mt.properties["FileSystemId"], json!({"Ref": fs_id}));
            assert_eq!(
                mt.properties["SecurityGroups"],
                json!([{"Fn::GetAtt": [sg_id, "GroupId"]}])
            );
            mt.properties["SubnetId"].as_str().unwrap()
        })
        .collect();
    assert_eq!(subnets, vec!["subnet-private-a", "subnet-private-b"]);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_access_point_depends_on_file_system() {
    let template = synthesize();
    let (fs_id, _) = single(&template, "AWS::EFS::FileSystem");
    let (_, ap) = single(&template, "AWS::EFS::AccessPoint");

    assert!(ap.depends_on.contains(fs_id));
    for (mt_id, _) in template.resources_of_type("AWS::EFS::MountTarget") {
        assert!(ap.depends_on.contains(mt_id));
    }
    assert_eq!(ap.properties["FileSystemId"], json!({"Ref": fs_id}));

    let mut sorted = ap.depends_on.clone();
    sorted.sort();
    assert_eq!(ap.depends_on, sorted);
}

#[test]
fn test_only_access_point_has_depends_on() {
    let template = synthesize();
    let with_depends_on: Vec<&str> = template
        .resources
        .values()
        .filter(|r| !r.depends_on.is_empty())
        .map(|r| r.resource_type.as_str())
        .collect();
    assert_eq!(with_depends_on, vec!["AWS::EFS::AccessPoint"]);
}

// ============================================================================
// IAM
// ============================================================================

#[test]
fn test_policy_scoped_to_file_system_and_access_point() {
    let template = synthesize();
    let (fs_id, _) = single(&template, "AWS::EFS::FileSystem");
    let (ap_id, _) = single(&template, "AWS::EFS::AccessPoint");
    let (_, policy) = single(&template, "AWS::IAM::ManagedPolicy");

    assert_eq!(
        policy.properties,
        json!({
            "Description": "",
            "Path": "/",
            "PolicyDocument": {
                "Statement": [{
                    "Action": [
                        "elasticfilesystem:ClientMount",
                        "elasticfilesystem:ClientWrite",
                        "elasticfilesystem:ClientRootAccess"
                    ],
                    "Effect": "Allow",
                    "Resource": [
                        {"Fn::GetAtt": [ap_id, "Arn"]},
                        {"Fn::GetAtt": [fs_id, "Arn"]}
                    ],
                    "Sid": "efsRootAccessPolicy"
                }],
                "Version": "2012-10-17"
            }
        })
    );
}

#[test]
fn test_role_trust_and_managed_policies() {
    let template = synthesize();
    let (policy_id, _) = single(&template, "AWS::IAM::ManagedPolicy");
    let (role_id, role) = single(&template, "AWS::IAM::Role");
    let (_, profile) = single(&template, "AWS::IAM::InstanceProfile");

    assert_eq!(
        role.properties["AssumeRolePolicyDocument"],
        json!({
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": {"Service": ["ec2.amazonaws.com", "cloud9.amazonaws.com"]}
            }],
            "Version": "2012-10-17"
        })
    );
    assert_eq!(
        role.properties["ManagedPolicyArns"],
        json!([
            {"Ref": policy_id},
            {"Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":iam::aws:policy/AmazonSSMManagedInstanceCore"]]},
            {"Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":iam::aws:policy/AWSCloud9SSMInstanceProfile"]]}
        ])
    );
    assert_eq!(profile.properties["Roles"], json!([{"Ref": role_id}]));
}

// ============================================================================
// Outputs and IDs
// ============================================================================

#[test]
fn test_outputs_resolve_to_created_resources() {
    let template = synthesize();
    let (fs_id, _) = single(&template, "AWS::EFS::FileSystem");
    let (role_id, _) = single(&template, "AWS::IAM::Role");

    let rendered = serde_json::to_value(&template).unwrap();
    assert_eq!(
        rendered["Outputs"],
        json!({
            "efsArn": {"Value": {"Fn::GetAtt": [fs_id, "Arn"]}, "Description": "EFS ARN"},
            "efsId": {"Value": {"Ref": fs_id}, "Description": "EFS Id"},
            "iamRole": {"Value": {"Fn::GetAtt": [role_id, "Arn"]}, "Description": "IAM Role"}
        })
    );
}

#[test]
fn test_logical_ids_are_stable() {
    let template = synthesize();
    let second_mount_target = make_unique_id(&["ecs-app-efs", "EfsMountTarget2"]).unwrap();
    let ids: Vec<&str> = template.resources.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec![
            "efsrootsgDC57F358",
            "ecsappefsE2A6169C",
            "ecsappefsEfsMountTarget1CA83F622",
            second_mount_target.as_str(),
            "ecsappefsefsrootaccesspoint3D627884",
            "efsrootpolicy5F0BFEE3",
            "efsrootaccessroleEFC34358",
            "efsrootaccessinstanceprofile",
        ]
    );
    assert_eq!(synthesize(), template);
}

#[test]
fn test_path_metadata() {
    let template = synthesize();
    let (_, ap) = single(&template, "AWS::EFS::AccessPoint");
    assert_eq!(
        ap.metadata["aws:cdk:path"],
        "SharedStoragesStack/ecs-app-efs/efs-root-access-point/Resource"
    );
    let (_, profile) = single(&template, "AWS::IAM::InstanceProfile");
    assert_eq!(
        profile.metadata["aws:cdk:path"],
        "SharedStoragesStack/efs-root-access-instance-profile"
    );
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn test_missing_vpc_fails_synthesis() {
    let dir = tempdir().unwrap();
    let cache = ContextCache::load(dir.path().join("cdk.context.json")).unwrap();
    let provider = CountingVpcProvider::empty();
    let mut app = App::new(VpcResolver::with_provider(cache, provider.clone()));

    let err = app.synth(&sample_props()).await.unwrap_err();
    assert!(matches!(err, Error::VpcNotFound { .. }));
    assert_eq!(provider.calls(), 1);
    assert!(!dir.path().join("cdk.context.json").exists());
}

#[tokio::test]
async fn test_unresolved_environment_fails_before_lookup() {
    let dir = tempdir().unwrap();
    let cache = ContextCache::load(dir.path().join("cdk.context.json")).unwrap();
    let provider = CountingVpcProvider::returning(sample_vpc());
    let mut app = App::new(VpcResolver::with_provider(cache, provider.clone()));

    let mut props = sample_props();
    props.env.account = None;
    let err = app.synth(&props).await.unwrap_err();
    assert!(matches!(err, Error::EnvironmentUnresolved { .. }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_cache_hit_skips_provider() {
    let dir = tempdir().unwrap();
    let path = seed_context(&dir.path().join("cdk.context.json"), &sample_props(), &sample_vpc());
    let provider = CountingVpcProvider::returning(sample_vpc());
    let mut app = App::new(VpcResolver::with_provider(
        ContextCache::load(&path).unwrap(),
        provider.clone(),
    ));

    let synthesized = app.synth(&sample_props()).await.unwrap();
    assert_eq!(provider.calls(), 0);
    assert_eq!(synthesized.template, synthesize());
}

#[tokio::test]
async fn test_cache_miss_populates_context_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cdk.context.json");
    let provider = CountingVpcProvider::returning(sample_vpc());

    let mut app = App::new(VpcResolver::with_provider(
        ContextCache::load(&path).unwrap(),
        provider.clone(),
    ));
    app.synth(&sample_props()).await.unwrap();
    app.synth(&sample_props()).await.unwrap();
    assert_eq!(provider.calls(), 1);

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let key = "vpc-provider:account=123456789012:filter.tag:Name=AriefhInfraStack/dev-vpc:region=eu-west-1:returnAsymmetricSubnets=true";
    assert_eq!(content[key]["vpcId"], "vpc-0123456789abcdef0");
}

#[tokio::test]
async fn test_disabled_lookups_with_empty_cache_fail() {
    let dir = tempdir().unwrap();
    let cache = ContextCache::load(dir.path().join("cdk.context.json")).unwrap();
    let mut app = App::new(VpcResolver::cached_only(cache));

    let err = app.synth(&sample_props()).await.unwrap_err();
    assert!(matches!(err, Error::ContextMissing { .. }));
}
