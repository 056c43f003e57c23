use serde_json::Value;

/// Deepest nesting level (root = 0) still inspected by [`find_state_field`].
pub const MAX_STATE_SEARCH_DEPTH: usize = 6;

/// Keys whose subtrees are never searched: interrupt payloads and message history.
pub const SKIPPED_KEYS: &[&str] = &["__interrupt__", "messages"];

/// Finds the first occurrence of `field_name` anywhere in `payload` that
/// `validate` accepts.
///
/// The search is depth-first in document order. A direct key on an object wins
/// over its children, but a direct value rejected by `validate` does not stop
/// the search: the object's other keys are still walked, so a malformed
/// top-level field cannot mask a well-formed nested one. Arrays short-circuit
/// on the first element that yields a result.
pub fn find_state_field<T, F>(payload: &Value, field_name: &str, validate: F) -> Option<T>
where
    F: Fn(&Value) -> Option<T>,
{
    find_at_depth(payload, field_name, &validate, 0)
}

fn find_at_depth<T, F>(payload: &Value, field_name: &str, validate: &F, depth: usize) -> Option<T>
where
    F: Fn(&Value) -> Option<T>,
{
    if depth > MAX_STATE_SEARCH_DEPTH {
        return None;
    }

    match payload {
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_at_depth(item, field_name, validate, depth + 1)),
        Value::Object(object) => {
            if let Some(parsed) = object.get(field_name).and_then(validate) {
                return Some(parsed);
            }

            object
                .iter()
                .filter(|(key, _)| !SKIPPED_KEYS.contains(&key.as_str()))
                .find_map(|(_, nested)| find_at_depth(nested, field_name, validate, depth + 1))
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::{Map, Value, json};

    use crate::extract::{MAX_STATE_SEARCH_DEPTH, find_state_field};
    use crate::validate::{parse_files, parse_todos};

    fn as_string(value: &Value) -> Option<String> {
        value.as_str().map(ToString::to_string)
    }

    fn nest(depth: usize, leaf: Value) -> Value {
        (0..depth).fold(leaf, |inner, level| {
            let mut object = Map::new();
            object.insert(format!("wrap{level}"), inner);
            Value::Object(object)
        })
    }

    #[test]
    fn primitives_and_null_are_not_found() {
        for payload in [json!(null), json!(3), json!("todos"), json!(true)] {
            assert_eq!(find_state_field(&payload, "todos", as_string), None);
        }
    }

    #[test]
    fn missing_field_is_not_found() {
        let payload = json!({"agent": {"plan": [{"x": 1}], "notes": "todos"}});
        assert_eq!(find_state_field(&payload, "todos", parse_todos), None);
    }

    #[test]
    fn finds_top_level_field() {
        let payload = json!({"todos": [{"content": "a", "status": "pending"}]});
        let todos = find_state_field(&payload, "todos", parse_todos).expect("todos");
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].content, "a");
    }

    #[test]
    fn depth_bound_is_inclusive() {
        let leaf = json!({"marker": "hit"});
        let at_bound = nest(MAX_STATE_SEARCH_DEPTH, leaf.clone());
        let past_bound = nest(MAX_STATE_SEARCH_DEPTH + 1, leaf);

        assert_eq!(
            find_state_field(&at_bound, "marker", as_string).as_deref(),
            Some("hit")
        );
        assert_eq!(find_state_field(&past_bound, "marker", as_string), None);
    }

    #[test]
    fn array_elements_count_as_a_level() {
        let payload = nest(MAX_STATE_SEARCH_DEPTH, json!([{"marker": "hit"}]));
        assert_eq!(find_state_field(&payload, "marker", as_string), None);

        let payload = nest(MAX_STATE_SEARCH_DEPTH - 1, json!([{"marker": "hit"}]));
        assert_eq!(
            find_state_field(&payload, "marker", as_string).as_deref(),
            Some("hit")
        );
    }

    #[test]
    fn array_search_stops_at_first_hit() {
        let visited = Cell::new(0);
        let payload = json!([
            {"marker": "first"},
            {"marker": "second"},
        ]);
        let found = find_state_field(&payload, "marker", |value| {
            visited.set(visited.get() + 1);
            as_string(value)
        });
        assert_eq!(found.as_deref(), Some("first"));
        assert_eq!(visited.get(), 1);
    }

    #[test]
    fn direct_hit_wins_over_nested_siblings() {
        let payload = json!({
            "nested": {"files": {"deep.md": "deep"}},
            "files": {"top.md": "top"},
        });
        let files = find_state_field(&payload, "files", parse_files).expect("files");
        assert_eq!(files.get("top.md").map(String::as_str), Some("top"));
        assert!(!files.contains_key("deep.md"));
    }

    #[test]
    fn rejected_direct_hit_falls_through_to_nested_search() {
        let payload = json!({
            "todos": "not a list",
            "node": {"todos": [{"content": "nested", "status": "in_progress"}]},
        });
        let todos = find_state_field(&payload, "todos", parse_todos).expect("todos");
        assert_eq!(todos[0].content, "nested");
    }

    #[test]
    fn sibling_keys_are_searched_in_document_order() {
        let payload = json!({
            "zeta": {"marker": "zeta"},
            "alpha": {"marker": "alpha"},
        });
        assert_eq!(
            find_state_field(&payload, "marker", as_string).as_deref(),
            Some("zeta")
        );
    }

    #[test]
    fn skipped_subtrees_are_never_searched() {
        let payload = json!({
            "__interrupt__": {"todos": [{"content": "hidden", "status": "pending"}]},
            "other": {"todos": [{"content": "x", "status": "completed"}]},
        });
        let todos = find_state_field(&payload, "todos", parse_todos).expect("todos");
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].content, "x");

        let payload = json!({
            "messages": [{"files": {"a.md": "inside history"}}],
            "__interrupt__": [{"value": {"files": {"b.md": "inside interrupt"}}}],
        });
        assert_eq!(find_state_field(&payload, "files", parse_files), None);
    }

    #[test]
    fn explicit_null_field_reads_as_empty() {
        let payload = json!({"agent": {"todos": null}});
        let todos = find_state_field(&payload, "todos", parse_todos).expect("todos");
        assert!(todos.is_empty());
    }
}
