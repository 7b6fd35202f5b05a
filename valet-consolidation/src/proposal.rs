//! The fixed schema for collaborator proposals.
//!
//! The collaborator's output is duck-typed JSON; every entry is
//! validated against these tagged variants. Unknown or malformed
//! entries are dropped with a warning, never guessed at.

use serde::Deserialize;
use tracing::warn;

/// One proposed action. The JSON tag is `action`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposalAction {
    /// Distill a new fact from the batch's episodes.
    NewFact {
        subject: String,
        predicate: String,
        content: String,
        permanence: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        source_episode_id: Option<String>,
    },
    /// Replace the live fact for an existing (subject, predicate) key.
    /// Permanence defaults to the superseded fact's class.
    SupersedeFact {
        subject: String,
        predicate: String,
        content: String,
        #[serde(default)]
        permanence: Option<String>,
    },
    /// Learn a new candidate rule.
    NewRule {
        content: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    /// Re-affirm an existing fact or rule (resets its decay clock).
    Confirm { kind: String, id: String },
    /// Add a provenance link.
    Link {
        source_kind: String,
        source_id: String,
        target_kind: String,
        target_id: String,
        relation: String,
    },
}

/// Pull the action array out of the collaborator result. Accepts
/// either a bare array or an object with an `actions` key.
fn action_entries(raw: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    match raw {
        serde_json::Value::Array(entries) => Some(entries),
        serde_json::Value::Object(map) => map.get("actions").and_then(|v| v.as_array()),
        _ => None,
    }
}

/// Validate every entry, dropping what does not fit the schema.
/// Returns the parsed actions and the number of entries dropped.
pub fn parse_actions(raw: &serde_json::Value) -> (Vec<ProposalAction>, usize) {
    let Some(entries) = action_entries(raw) else {
        warn!("proposal result is not an action list, dropping it entirely");
        return (Vec::new(), 1);
    };

    let mut actions = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match serde_json::from_value::<ProposalAction>(entry.clone()) {
            Ok(action) => actions.push(action),
            Err(e) => {
                warn!(error = %e, entry = %entry, "dropping malformed proposal entry");
                skipped += 1;
            }
        }
    }
    (actions, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_variants() {
        let raw = json!({ "actions": [
            { "action": "new_fact", "subject": "user", "predicate": "prefers_tea",
              "content": "prefers oolong", "permanence": "standard" },
            { "action": "new_rule", "content": "steep three minutes" },
            { "action": "confirm", "kind": "fact", "id": "abc" },
        ]});
        let (actions, skipped) = parse_actions(&raw);
        assert_eq!(actions.len(), 3);
        assert_eq!(skipped, 0);
        assert!(matches!(actions[0], ProposalAction::NewFact { .. }));
    }

    #[test]
    fn malformed_entries_are_dropped_not_fatal() {
        let raw = json!([
            { "action": "new_rule", "content": "valid" },
            { "action": "teleport", "to": "mars" },
            { "action": "new_fact", "subject": "missing fields" },
            42,
        ]);
        let (actions, skipped) = parse_actions(&raw);
        assert_eq!(actions.len(), 1);
        assert_eq!(skipped, 3);
    }

    #[test]
    fn non_list_payload_is_dropped_wholesale() {
        let (actions, skipped) = parse_actions(&serde_json::json!("oops"));
        assert!(actions.is_empty());
        assert_eq!(skipped, 1);
    }
}
