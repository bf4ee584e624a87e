use crate::k8s::Connection;
use crate::model::CustomResourceEntry;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Discovers cluster-defined custom resource kinds and indexes every name
/// they answer to. A cluster with no (or unreadable) definitions is a
/// normal case: the index degrades to empty instead of failing.
pub async fn discover<C>(conn: &C) -> HashMap<String, CustomResourceEntry>
where
    C: Connection + ?Sized,
{
    match conn.raw_custom_resource_definitions().await {
        Ok(definitions) => index_definitions(&definitions),
        Err(err) => {
            warn!("custom resource discovery failed, continuing without: {err:#}");
            HashMap::new()
        }
    }
}

/// Builds the name index from raw definition documents. Every non-empty
/// name among plural, singular and the aliases becomes a key pointing at
/// the same entry. A name declared by two definitions resolves to the one
/// processed later (last write wins).
pub fn index_definitions(definitions: &[Value]) -> HashMap<String, CustomResourceEntry> {
    let mut index = HashMap::new();

    for definition in definitions {
        let entry = entry_from_definition(definition);
        let mut names = Vec::with_capacity(2 + entry.aliases.len());
        if !entry.plural.is_empty() {
            names.push(entry.plural.clone());
        }
        if !entry.singular.is_empty() {
            names.push(entry.singular.clone());
        }
        names.extend(entry.aliases.iter().cloned());

        for name in names {
            index.insert(name, entry.clone());
        }
    }

    index
}

/// Extracts one entry from a definition document. Every field read is
/// fallible: a missing or mistyped scalar leaves the corresponding field
/// empty, and a non-string alias element is skipped. Neither fails the
/// discovery pass.
fn entry_from_definition(definition: &Value) -> CustomResourceEntry {
    let spec = &definition["spec"];
    let names = &spec["names"];

    CustomResourceEntry {
        group: string_field(spec, "group"),
        kind: string_field(names, "kind"),
        version: definition_version(spec),
        plural: string_field(names, "plural"),
        singular: string_field(names, "singular"),
        aliases: alias_list(names),
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_string()
}

/// The served version: a scalar `version` field when present, otherwise
/// the storage-flagged entry of the `versions` array, otherwise the first
/// array entry.
fn definition_version(spec: &Value) -> String {
    if let Some(version) = spec["version"].as_str()
        && !version.is_empty()
    {
        return version.to_string();
    }

    let Some(versions) = spec["versions"].as_array() else {
        return String::new();
    };

    versions
        .iter()
        .find(|version| version["storage"].as_bool() == Some(true))
        .or_else(|| versions.first())
        .map(|version| string_field(version, "name"))
        .unwrap_or_default()
}

fn alias_list(names: &Value) -> Vec<String> {
    let Some(aliases) = names["shortNames"].as_array() else {
        return Vec::new();
    };

    aliases
        .iter()
        .filter_map(|alias| match alias.as_str() {
            Some(alias) if !alias.is_empty() => Some(alias.to_string()),
            _ => {
                warn!("skipping non-string short name in custom resource definition");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::index_definitions;
    use serde_json::json;

    #[test]
    fn registers_plural_singular_and_aliases() {
        let definitions = vec![json!({
            "spec": {
                "group": "stable.example.com",
                "names": {
                    "kind": "CronTab",
                    "plural": "crontabs",
                    "singular": "crontab",
                    "shortNames": ["ct", "cts"],
                },
                "versions": [
                    {"name": "v1alpha1", "storage": false},
                    {"name": "v1", "storage": true},
                ],
            },
        })];

        let index = index_definitions(&definitions);
        assert_eq!(index.len(), 4);
        for name in ["crontabs", "crontab", "ct", "cts"] {
            let entry = index.get(name).unwrap();
            assert_eq!(entry.group, "stable.example.com");
            assert_eq!(entry.kind, "CronTab");
            assert_eq!(entry.version, "v1");
            assert_eq!(entry.preferred_name(), "crontabs");
        }
    }

    #[test]
    fn scalar_version_wins_over_versions_array() {
        let definitions = vec![json!({
            "spec": {
                "group": "legacy.example.com",
                "version": "v1beta1",
                "names": {"kind": "Widget", "plural": "widgets"},
            },
        })];

        let index = index_definitions(&definitions);
        assert_eq!(index["widgets"].version, "v1beta1");
    }

    #[test]
    fn missing_or_mistyped_fields_leave_blanks() {
        let definitions = vec![json!({
            "spec": {
                "group": 42,
                "names": {"plural": "gadgets"},
            },
        })];

        let index = index_definitions(&definitions);
        let entry = index.get("gadgets").unwrap();
        assert_eq!(entry.group, "");
        assert_eq!(entry.kind, "");
        assert_eq!(entry.version, "");
        assert_eq!(entry.singular, "");
    }

    #[test]
    fn non_string_aliases_are_skipped() {
        let definitions = vec![json!({
            "spec": {
                "group": "stable.example.com",
                "names": {
                    "kind": "Widget",
                    "plural": "widgets",
                    "shortNames": ["wd", 7, null, "wdg"],
                },
            },
        })];

        let index = index_definitions(&definitions);
        assert!(index.contains_key("wd"));
        assert!(index.contains_key("wdg"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn duplicate_names_are_last_write_wins() {
        let definitions = vec![
            json!({
                "spec": {
                    "group": "first.example.com",
                    "names": {"kind": "Alpha", "plural": "alphas", "shortNames": ["foo"]},
                },
            }),
            json!({
                "spec": {
                    "group": "second.example.com",
                    "names": {"kind": "Beta", "plural": "betas", "shortNames": ["foo"]},
                },
            }),
        ];

        let index = index_definitions(&definitions);
        assert_eq!(index["foo"].kind, "Beta");
        assert_eq!(index["foo"].group, "second.example.com");
    }
}
