//! Schema-driven planning shared by every resource.
//!
//! Configurable attributes come from the proposal, computed-only attributes are
//! carried over from the prior state, and any difference in a `force_new`
//! attribute turns the update into a replacement.

use crate::schema::{AttributeType, Block, Schema};
use crate::types::{AttributeChange, PlanResult};
use serde_json::{Map, Value};

/// Plan the transition from `prior` (None when creating) to `proposed` (null when deleting).
pub fn plan_change(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    if proposed.is_null() {
        return match prior {
            Some(prior) => PlanResult::with_changes(
                Value::Null,
                vec![AttributeChange::removed(
                    "id",
                    present(prior, "id").cloned().unwrap_or(Value::Null),
                )],
                false,
            ),
            None => PlanResult::no_change(Value::Null),
        };
    }

    match prior {
        None => plan_create(schema, proposed),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let planned = planned_state(schema, None, proposed, false);
    let changes = planned
        .iter()
        .map(|(name, value)| AttributeChange::added(name.clone(), value.clone()))
        .collect();
    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut changes = Vec::new();
    let mut requires_replace = false;
    let planned = planned_state(schema, Some(prior), proposed, false);

    for (name, attr) in &schema.block.attributes {
        if !attr.flags.is_configurable() {
            continue;
        }
        let before = present(prior, name);
        let after = planned.get(name);
        if !values_equal(&attr.attr_type, before, after) {
            requires_replace |= attr.force_new;
            changes.push(AttributeChange::new(name.clone(), before.cloned(), after.cloned()));
        }
    }

    for (name, nested) in &schema.block.blocks {
        let before = present(prior, name).filter(|v| !is_empty_list(v));
        let after = planned.get(name).filter(|v| !is_empty_list(v));
        if before != after {
            requires_replace |= nested.force_new;
            changes.push(AttributeChange::new(name.clone(), before.cloned(), after.cloned()));
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(Value::Object(planned));
    }

    let planned = if requires_replace {
        // The replacement gets a fresh id and fresh computed values.
        planned_state(schema, Some(prior), proposed, true)
    } else {
        planned
    };
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn planned_state(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: &Value,
    replacing: bool,
) -> Map<String, Value> {
    let carried = if replacing { None } else { prior };
    let mut planned = Map::new();

    for (name, attr) in &schema.block.attributes {
        let value = if attr.flags.is_computed_only() {
            carried.and_then(|p| present(p, name)).cloned()
        } else {
            present(proposed, name)
                .cloned()
                .or_else(|| attr.default.clone())
                .or_else(|| {
                    if attr.flags.computed {
                        carried.and_then(|p| present(p, name)).cloned()
                    } else {
                        None
                    }
                })
        };
        if let Some(value) = value {
            planned.insert(name.clone(), value);
        }
    }

    for (name, nested) in &schema.block.blocks {
        if let Some(value) = present(proposed, name) {
            planned.insert(name.clone(), normalize_items(&nested.block, value));
        }
    }

    planned
}

/// Drop null members and fill in defaults in each nested block item.
fn normalize_items(block: &Block, value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| normalize_item(block, item)).collect()),
        item => normalize_item(block, item),
    }
}

fn normalize_item(block: &Block, item: &Value) -> Value {
    let Value::Object(members) = item else {
        return item.clone();
    };
    let mut normalized: Map<String, Value> = members
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            normalized.entry(name.clone()).or_insert_with(|| default.clone());
        }
    }
    Value::Object(normalized)
}

fn present<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|v| !v.is_null())
}

fn is_empty_list(value: &Value) -> bool {
    value.as_array().map(Vec::is_empty).unwrap_or(false)
}

/// Compare two attribute values; sets compare without regard to order.
fn values_equal(attr_type: &AttributeType, a: Option<&Value>, b: Option<&Value>) -> bool {
    match (attr_type, a, b) {
        (AttributeType::Set(_), Some(Value::Array(a)), Some(Value::Array(b))) => {
            a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
        }
        (AttributeType::Set(_) | AttributeType::List(_), None, Some(v))
        | (AttributeType::Set(_) | AttributeType::List(_), Some(v), None) => is_empty_list(v),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("data", Attribute::required_string().with_force_new())
            .with_attribute(
                "architecture",
                Attribute::optional_computed_string().with_default(json!("64")),
            )
            .with_attribute(
                "servers",
                Attribute::optional_computed_set(AttributeType::Int64),
            )
            .with_attribute("fingerprint", Attribute::computed_string())
            .with_block(
                "rule",
                NestedBlock::list(Block::new().with_attribute("action", Attribute::required_string())),
            )
    }

    fn prior() -> Value {
        json!({
            "id": "aa:bb",
            "name": "deploy",
            "data": "ssh-ed25519 AAAA",
            "architecture": "64",
            "servers": [1, 2],
            "fingerprint": "aa:bb",
        })
    }

    #[test]
    fn test_plan_create_applies_defaults() {
        let plan = plan_change(&schema(), None, &json!({"name": "deploy", "data": "ssh-ed25519 AAAA"}));

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["architecture"], "64");
        assert!(plan.planned_state.get("id").is_none());
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["architecture", "data", "name"]);
    }

    #[test]
    fn test_plan_update_no_change_carries_computed() {
        let proposed = json!({"name": "deploy", "data": "ssh-ed25519 AAAA", "servers": [2, 1]});
        let plan = plan_change(&schema(), Some(&prior()), &proposed);

        assert!(plan.is_noop());
        assert_eq!(plan.planned_state["id"], "aa:bb");
        assert_eq!(plan.planned_state["fingerprint"], "aa:bb");
    }

    #[test]
    fn test_plan_update_in_place() {
        let proposed = json!({"name": "renamed", "data": "ssh-ed25519 AAAA"});
        let plan = plan_change(&schema(), Some(&prior()), &proposed);

        assert!(!plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "name");
        assert_eq!(plan.planned_state["id"], "aa:bb");
        // unset optional+computed set keeps the prior membership
        assert_eq!(plan.planned_state["servers"], json!([1, 2]));
    }

    #[test]
    fn test_plan_force_new_replaces() {
        let proposed = json!({"name": "deploy", "data": "ssh-rsa BBBB"});
        let plan = plan_change(&schema(), Some(&prior()), &proposed);

        assert!(plan.requires_replace);
        assert!(plan.planned_state.get("id").is_none());
        assert!(plan.planned_state.get("fingerprint").is_none());
    }

    #[test]
    fn test_plan_block_change() {
        let mut with_rule = prior();
        with_rule["rule"] = json!([{"action": "accept"}]);
        let proposed = json!({
            "name": "deploy",
            "data": "ssh-ed25519 AAAA",
            "rule": [{"action": "discard"}],
        });
        let plan = plan_change(&schema(), Some(&with_rule), &proposed);

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "rule");
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_normalizes_block_items() {
        let schema = Schema::v0().with_block(
            "rule",
            NestedBlock::list(
                Block::new()
                    .with_attribute("action", Attribute::required_string())
                    .with_attribute("ip_version", Attribute::optional_string().with_default(json!("ipv4")))
                    .with_attribute("dst_port", Attribute::optional_string()),
            ),
        );
        let plan = plan_change(
            &schema,
            None,
            &json!({"rule": [{"action": "accept", "dst_port": null}]}),
        );

        assert_eq!(
            plan.planned_state["rule"],
            json!([{"action": "accept", "ip_version": "ipv4"}])
        );
    }

    #[test]
    fn test_plan_delete() {
        let plan = plan_change(&schema(), Some(&prior()), &Value::Null);
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes, vec![AttributeChange::removed("id", json!("aa:bb"))]);
    }

    #[test]
    fn test_set_comparison_ignores_order() {
        let set = AttributeType::set(AttributeType::Int64);
        assert!(values_equal(&set, Some(&json!([1, 2])), Some(&json!([2, 1]))));
        assert!(!values_equal(&set, Some(&json!([1, 2])), Some(&json!([1]))));
        assert!(values_equal(&set, None, Some(&json!([]))));
        assert!(!values_equal(&AttributeType::list(AttributeType::Int64), Some(&json!([1, 2])), Some(&json!([2, 1]))));
    }
}
