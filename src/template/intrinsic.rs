//! CloudFormation intrinsic functions.
//!
//! Resource properties are plain [`serde_json::Value`] trees. The helpers here
//! build the intrinsic objects that link resources together, and
//! [`collect_references`] walks a property tree to find the logical IDs it
//! points at.

use indexmap::IndexSet;
use serde_json::{json, Value as JsonValue};

/// Prefix of pseudo parameters such as `AWS::Partition`.
const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> JsonValue {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> JsonValue {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<JsonValue>) -> JsonValue {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// `{"Ref": "AWS::Partition"}`
pub fn partition() -> JsonValue {
    reference("AWS::Partition")
}

/// ARN of an AWS-managed IAM policy in the deployment partition.
pub fn aws_managed_policy_arn(policy_name: &str) -> JsonValue {
    join(
        "",
        vec![
            JsonValue::from("arn:"),
            partition(),
            JsonValue::from(format!(":iam::aws:policy/{}", policy_name)),
        ],
    )
}

/// Collect every logical ID referenced through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters (`AWS::Region`, `AWS::Partition`, ...) are skipped.
/// Results keep first-seen order.
pub fn collect_references(value: &JsonValue) -> IndexSet<String> {
    let mut refs = IndexSet::new();
    walk(value, &mut refs);
    refs
}

fn walk(value: &JsonValue, refs: &mut IndexSet<String>) {
    match value {
        JsonValue::Object(map) => {
            if map.len() == 1 {
                if let Some(JsonValue::String(target)) = map.get("Ref") {
                    if !target.starts_with(PSEUDO_PARAMETER_PREFIX) {
                        refs.insert(target.clone());
                    }
                    return;
                }
                if let Some(JsonValue::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(JsonValue::String(target)) = args.first() {
                        refs.insert(target.clone());
                    }
                    return;
                }
            }
            for child in map.values() {
                walk(child, refs);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                walk(item, refs);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_shapes() {
        assert_eq!(reference("Fs"), json!({"Ref": "Fs"}));
        assert_eq!(get_att("Fs", "Arn"), json!({"Fn::GetAtt": ["Fs", "Arn"]}));
        assert_eq!(
            aws_managed_policy_arn("AmazonSSMManagedInstanceCore"),
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::aws:policy/AmazonSSMManagedInstanceCore"
            ]]})
        );
    }

    #[test]
    fn test_collect_references() {
        let props = json!({
            "FileSystemId": {"Ref": "Fs"},
            "SecurityGroups": [{"Fn::GetAtt": ["Sg", "GroupId"]}],
            "PolicyArns": [aws_managed_policy_arn("X")],
            "Nested": {"Deep": [{"Ref": "Fs"}, {"Ref": "AWS::Region"}]}
        });
        let refs: Vec<String> = collect_references(&props).into_iter().collect();
        assert_eq!(refs, vec!["Fs", "Sg"]);
    }
}
