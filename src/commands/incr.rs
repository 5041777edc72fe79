//! Implementation of the `lockstore incr` command.

use crate::cli::IncrArgs;
use anyhow::{Result, bail};
use lockstore::{StoreConfig, TransactionalStore};
use serde_json::{Number, Value};

/// Add to a numeric top-level key in a single transaction and print the result.
pub async fn cmd_incr(args: IncrArgs, config: &StoreConfig) -> Result<()> {
    let store = TransactionalStore::new(&args.path, config.clone())?;

    let doc = store
        .modify(|doc| increment(doc, &args.key, args.by))
        .await?;

    println!("{}", doc[args.key.as_str()]);
    Ok(())
}

fn increment(mut doc: Value, key: &str, by: i64) -> Result<Value> {
    let Some(map) = doc.as_object_mut() else {
        bail!("document is not a JSON object; cannot increment '{}'", key);
    };

    let next = match map.get(key) {
        None | Some(Value::Null) => Value::from(by),
        Some(Value::Number(n)) => add(n, by, key)?,
        Some(other) => bail!("'{}' is not a number (found {})", key, other),
    };
    map.insert(key.to_string(), next);
    Ok(doc)
}

fn add(n: &Number, by: i64, key: &str) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return match i.checked_add(by) {
            Some(sum) => Ok(Value::from(sum)),
            None => bail!("'{}' would overflow", key),
        };
    }
    match n.as_f64().and_then(|f| Number::from_f64(f + by as f64)) {
        Some(sum) => Ok(Value::Number(sum)),
        None => bail!("'{}' cannot be incremented", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_counts_as_zero() {
        assert_eq!(increment(json!({}), "n", 1).unwrap(), json!({"n": 1}));
        assert_eq!(increment(json!({"n": null}), "n", 2).unwrap(), json!({"n": 2}));
    }

    #[test]
    fn test_integer_and_float_values() {
        assert_eq!(increment(json!({"n": 41}), "n", 1).unwrap(), json!({"n": 42}));
        assert_eq!(increment(json!({"n": 5}), "n", -7).unwrap(), json!({"n": -2}));
        assert_eq!(increment(json!({"n": 1.5}), "n", 1).unwrap(), json!({"n": 2.5}));
    }

    #[test]
    fn test_other_keys_untouched() {
        let doc = increment(json!({"n": 1, "name": "x"}), "n", 1).unwrap();
        assert_eq!(doc, json!({"n": 2, "name": "x"}));
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        assert!(increment(json!({"n": "one"}), "n", 1).is_err());
        assert!(increment(json!([]), "n", 1).is_err());
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(increment(json!({"n": i64::MAX}), "n", 1).is_err());
    }
}
