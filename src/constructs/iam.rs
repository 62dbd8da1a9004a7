//! IAM constructs: policy documents, managed policies, roles and instance
//! profiles.

use serde::{Serialize, Serializer};
use serde_json::{json, Value as JsonValue};

use super::Stack;
use crate::error::Result;
use crate::template::intrinsic::{aws_managed_policy_arn, get_att, reference};
use crate::template::CfnResource;

/// Version string of every policy document
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Effect {
    /// Grant
    #[default]
    Allow,
    /// Refuse
    Deny,
}

/// Serialize a one-element list as a bare value
fn one_or_many<S: Serializer>(
    values: &[JsonValue],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match values {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}

/// A single policy statement
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(rename = "Action", serialize_with = "one_or_many")]
    actions: Vec<JsonValue>,
    effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<JsonValue>,
    #[serde(
        rename = "Resource",
        serialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    resources: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sid: Option<String>,
}

impl PolicyStatement {
    /// An empty `Allow` statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statement id
    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Set the effect
    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Add actions
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions
            .extend(actions.into_iter().map(|a| JsonValue::String(a.into())));
        self
    }

    /// Add resource ARNs, literal or intrinsic
    pub fn resources<I>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = JsonValue>,
    {
        self.resources.extend(resources);
        self
    }

    /// Set the principal
    pub fn principal(mut self, principal: &CompositePrincipal) -> Self {
        self.principal = Some(principal.to_json());
        self
    }
}

/// A policy document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// A document with the given statements
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    /// Template form
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(json!({
            "Statement": serde_json::to_value(&self.statements)?,
            "Version": POLICY_VERSION,
        }))
    }
}

/// An AWS service allowed to assume a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    /// e.g. `ec2.amazonaws.com`
    pub fn new(service: impl Into<String>) -> Self {
        Self(service.into())
    }

    /// Service name
    pub fn service(&self) -> &str {
        &self.0
    }
}

/// Several service principals trusted together (any of them may assume)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositePrincipal {
    principals: Vec<ServicePrincipal>,
}

impl CompositePrincipal {
    /// Combine principals, dropping duplicates
    pub fn new(principals: impl IntoIterator<Item = ServicePrincipal>) -> Self {
        let mut unique: Vec<ServicePrincipal> = Vec::new();
        for principal in principals {
            if !unique.contains(&principal) {
                unique.push(principal);
            }
        }
        Self { principals: unique }
    }

    fn to_json(&self) -> JsonValue {
        let services: Vec<&str> = self.principals.iter().map(ServicePrincipal::service).collect();
        match services.as_slice() {
            [single] => json!({ "Service": single }),
            _ => json!({ "Service": services }),
        }
    }

    /// Trust policy letting the principals call `sts:AssumeRole`
    pub fn assume_role_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![PolicyStatement::new()
            .actions(["sts:AssumeRole"])
            .principal(self)])
    }
}

/// Handle to a customer-managed policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    logical_id: String,
}

impl ManagedPolicy {
    /// Declare a managed policy at `<id>/Resource`
    pub fn new(stack: &mut Stack, id: &str, document: &PolicyDocument) -> Result<Self> {
        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new(
                "AWS::IAM::ManagedPolicy",
                json!({
                    "Description": "",
                    "Path": "/",
                    "PolicyDocument": document.to_json()?,
                }),
            ),
        )?;
        Ok(Self { logical_id })
    }

    /// ARN of an AWS-managed policy, e.g. `AmazonSSMManagedInstanceCore`
    pub fn aws_managed(name: &str) -> JsonValue {
        aws_managed_policy_arn(name)
    }

    /// Logical ID of the policy
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Ref policy` (a managed policy's `Ref` is its ARN)
    pub fn policy_arn(&self) -> JsonValue {
        reference(&self.logical_id)
    }
}

/// Properties of a role
#[derive(Debug, Clone)]
pub struct RoleProps {
    /// Who may assume the role
    pub assumed_by: CompositePrincipal,
    /// Attached managed policy ARNs, in order
    pub managed_policy_arns: Vec<JsonValue>,
}

/// Handle to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    logical_id: String,
}

impl Role {
    /// Declare a role at `<id>/Resource`
    pub fn new(stack: &mut Stack, id: &str, props: RoleProps) -> Result<Self> {
        let mut properties = json!({
            "AssumeRolePolicyDocument": props.assumed_by.assume_role_policy().to_json()?,
        });
        if !props.managed_policy_arns.is_empty() {
            properties["ManagedPolicyArns"] = JsonValue::Array(props.managed_policy_arns);
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::IAM::Role", properties),
        )?;
        Ok(Self { logical_id })
    }

    /// Logical ID of the role
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Fn::GetAtt [role, Arn]`
    pub fn role_arn(&self) -> JsonValue {
        get_att(&self.logical_id, "Arn")
    }

    /// `Ref role` (the role name)
    pub fn role_name(&self) -> JsonValue {
        reference(&self.logical_id)
    }
}

/// Handle to an instance profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfile {
    logical_id: String,
}

impl InstanceProfile {
    /// Declare an instance profile wrapping `role`.
    ///
    /// The profile is a bare resource rather than a construct, so it sits
    /// directly at `<id>`.
    pub fn new(stack: &mut Stack, id: &str, role: &Role) -> Result<Self> {
        let logical_id = stack.add_resource(
            &[id],
            CfnResource::new(
                "AWS::IAM::InstanceProfile",
                json!({ "Roles": [role.role_name()] }),
            ),
        )?;
        Ok(Self { logical_id })
    }

    /// Logical ID of the profile
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}
