//! Security review of synthesized templates.
//!
//! Each [`ReviewRule`] inspects a [`Template`] and reports [`Finding`]s. The
//! review never changes the template; callers decide whether findings are
//! warnings or fatal.
//!
//! | Rule | Severity | Reports |
//! |---|---|---|
//! | `open-ingress` | High | ingress from `0.0.0.0/0` or `::/0` |
//! | `wildcard-resource` | Critical | IAM statements with `"*"` in `Resource` |
//! | `unencrypted-file-system` | Critical | EFS file systems without `Encrypted: true` |

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::debug;

use crate::template::Template;

/// Severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Minor improvement
    Low,
    /// Should be addressed
    Medium,
    /// Significant exposure
    High,
    /// Immediate action required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl Severity {
    /// Numeric score (higher = more severe)
    pub fn score(&self) -> u32 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

/// A single review finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the rule that fired
    pub rule_id: String,
    /// Severity
    pub severity: Severity,
    /// Offending resource
    pub logical_id: String,
    /// Human-readable detail
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.rule_id, self.logical_id, self.message
        )
    }
}

/// A template check
pub trait ReviewRule: Send + Sync {
    /// Stable rule id
    fn id(&self) -> &'static str;

    /// Severity of every finding of this rule
    fn severity(&self) -> Severity;

    /// Inspect the template, returning `(logical_id, message)` pairs
    fn check(&self, template: &Template) -> Vec<(String, String)>;
}

/// Ingress open to every address
pub struct OpenIngressRule;

const OPEN_CIDRS: [(&str, &str); 2] = [("CidrIp", "0.0.0.0/0"), ("CidrIpv6", "::/0")];

impl ReviewRule for OpenIngressRule {
    fn id(&self) -> &'static str {
        "open-ingress"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn check(&self, template: &Template) -> Vec<(String, String)> {
        let mut hits = Vec::new();
        for (id, resource) in template.resources_of_type("AWS::EC2::SecurityGroup") {
            let Some(JsonValue::Array(rules)) = resource.property("SecurityGroupIngress") else {
                continue;
            };
            for rule in rules {
                for (key, cidr) in OPEN_CIDRS {
                    if rule.get(key).and_then(JsonValue::as_str) == Some(cidr) {
                        hits.push((
                            id.clone(),
                            format!("ingress on {} is open to {}", port_range(rule), cidr),
                        ));
                    }
                }
            }
        }
        hits
    }
}

fn port_range(rule: &JsonValue) -> String {
    let protocol = rule.get("IpProtocol").and_then(JsonValue::as_str).unwrap_or("-1");
    match (rule.get("FromPort"), rule.get("ToPort")) {
        (Some(from), Some(to)) if from == to => format!("{} {}", protocol, from),
        (Some(from), Some(to)) => format!("{} {}-{}", protocol, from, to),
        _ => "all traffic".to_string(),
    }
}

/// IAM statements granting on `*`
pub struct WildcardResourceRule;

const POLICY_DOCUMENT_KEYS: [&str; 2] = ["PolicyDocument", "Policies"];

impl ReviewRule for WildcardResourceRule {
    fn id(&self) -> &'static str {
        "wildcard-resource"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, template: &Template) -> Vec<(String, String)> {
        let mut hits = Vec::new();
        for (id, resource) in &template.resources {
            if !resource.resource_type.starts_with("AWS::IAM::") {
                continue;
            }
            for key in POLICY_DOCUMENT_KEYS {
                let Some(value) = resource.property(key) else {
                    continue;
                };
                for statement in statements(value) {
                    if grants_wildcard(statement) {
                        let sid = statement
                            .get("Sid")
                            .and_then(JsonValue::as_str)
                            .unwrap_or("<no sid>");
                        hits.push((
                            id.clone(),
                            format!("statement {} applies to every resource", sid),
                        ));
                    }
                }
            }
        }
        hits
    }
}

/// Statements of a policy document, or of every document in an inline policy list
fn statements(value: &JsonValue) -> Vec<&JsonValue> {
    match value {
        JsonValue::Array(policies) => policies
            .iter()
            .filter_map(|p| p.get("PolicyDocument"))
            .flat_map(statements)
            .collect(),
        JsonValue::Object(doc) => match doc.get("Statement") {
            Some(JsonValue::Array(list)) => list.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn grants_wildcard(statement: &JsonValue) -> bool {
    if statement.get("Effect").and_then(JsonValue::as_str) == Some("Deny") {
        return false;
    }
    match statement.get("Resource") {
        Some(JsonValue::String(r)) => r == "*",
        Some(JsonValue::Array(list)) => list.iter().any(|r| r.as_str() == Some("*")),
        _ => false,
    }
}

/// File systems stored without encryption at rest
pub struct UnencryptedFileSystemRule;

impl ReviewRule for UnencryptedFileSystemRule {
    fn id(&self) -> &'static str {
        "unencrypted-file-system"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, template: &Template) -> Vec<(String, String)> {
        template
            .resources_of_type("AWS::EFS::FileSystem")
            .filter(|(_, r)| r.property("Encrypted") != Some(&JsonValue::Bool(true)))
            .map(|(id, _)| (id.clone(), "file system is not encrypted at rest".to_string()))
            .collect()
    }
}

/// The built-in rules
pub fn default_rules() -> Vec<Box<dyn ReviewRule>> {
    vec![
        Box::new(OpenIngressRule),
        Box::new(WildcardResourceRule),
        Box::new(UnencryptedFileSystemRule),
    ]
}

/// Run `rules` over the template, most severe findings first
pub fn review_with(template: &Template, rules: &[Box<dyn ReviewRule>]) -> Vec<Finding> {
    let mut findings: Vec<Finding> = rules
        .iter()
        .flat_map(|rule| {
            rule.check(template)
                .into_iter()
                .map(move |(logical_id, message)| Finding {
                    rule_id: rule.id().to_string(),
                    severity: rule.severity(),
                    logical_id,
                    message,
                })
        })
        .collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    debug!(findings = findings.len(), "Reviewed template");
    findings
}

/// Run the built-in rules over the template
pub fn review(template: &Template) -> Vec<Finding> {
    review_with(template, &default_rules())
}

/// Highest severity among findings
pub fn max_severity(findings: &[Finding]) -> Option<Severity> {
    findings.iter().map(|f| f.severity).max()
}
