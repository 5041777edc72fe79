//! Implementation of the `lockstore set` command.

use super::{parse_json, print_document};
use crate::cli::SetArgs;
use anyhow::{Result, bail};
use lockstore::{StoreConfig, TransactionalStore};
use serde_json::Value;

/// Set one top-level key in a single transaction.
pub async fn cmd_set(args: SetArgs, config: &StoreConfig) -> Result<()> {
    let value = parse_json("value", &args.value)?;
    let store = TransactionalStore::new(&args.path, config.clone())?;

    let doc = store
        .modify(|doc| set_key(doc, &args.key, value))
        .await?;

    print_document(&doc)
}

fn set_key(mut doc: Value, key: &str, value: Value) -> Result<Value> {
    let Some(map) = doc.as_object_mut() else {
        bail!("document is not a JSON object; cannot set '{}'", key);
    };
    map.insert(key.to_string(), value);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_key_inserts_and_overwrites() {
        let doc = set_key(json!({"a": 1}), "b", json!([true])).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": [true]}));

        let doc = set_key(doc, "a", json!(null)).unwrap();
        assert_eq!(doc, json!({"a": null, "b": [true]}));
    }

    #[test]
    fn test_set_key_rejects_non_object() {
        assert!(set_key(json!([1, 2]), "a", json!(1)).is_err());
    }
}
