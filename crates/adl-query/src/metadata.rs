//! `MetaData` block extraction.
//!
//! `MetaData(source, {...})` and `source.MetaData({...})` attach directive
//! blocks to a query without changing what it computes. They are stripped
//! before any other pass and returned in evaluation order, innermost first.

use crate::ast::{Call, Constant, Expr};
use crate::error::TransformError;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// One directive block, as plain JSON
pub type MetadataBlock = Map<String, Value>;

/// Name of the metadata pseudo-operator
pub const METADATA: &str = "MetaData";

/// Strip every `MetaData` call, returning the bare tree and the blocks
pub fn extract_metadata(expr: Expr) -> Result<(Expr, Vec<MetadataBlock>), TransformError> {
    let mut blocks = Vec::new();
    let stripped = strip(expr, &mut blocks)?;
    debug!(count = blocks.len(), "extracted metadata blocks");
    Ok((stripped, blocks))
}

fn strip(expr: Expr, blocks: &mut Vec<MetadataBlock>) -> Result<Expr, TransformError> {
    match expr {
        Expr::Call(Call { func, args }) if is_metadata_callee(&func) => {
            let (source, dict) = split_metadata(*func, args)?;
            let source = strip(source, blocks)?;
            blocks.push(dict_to_block(&dict)?);
            Ok(source)
        }
        other => other.try_map_children(|child| strip(child, blocks)),
    }
}

fn is_metadata_callee(func: &Expr) -> bool {
    match func {
        Expr::Name(name) => name == METADATA,
        Expr::Attribute { attr, .. } => attr == METADATA,
        _ => false,
    }
}

/// Split a metadata call into `(source, dict)`
fn split_metadata(func: Expr, mut args: Vec<Expr>) -> Result<(Expr, Expr), TransformError> {
    match (func, args.len()) {
        (Expr::Name(_), 2) => {
            let dict = args.remove(1);
            let source = args.remove(0);
            Ok((source, dict))
        }
        (Expr::Attribute { value, .. }, 1) => Ok((*value, args.remove(0))),
        (_, found) => Err(TransformError::invalid_call(
            METADATA,
            format!("expected a source and one dictionary, found {} arguments", found),
        )),
    }
}

fn dict_to_block(dict: &Expr) -> Result<MetadataBlock, TransformError> {
    match to_json(dict)? {
        Value::Object(map) => Ok(map),
        other => Err(TransformError::invalid_metadata(format!(
            "expected a dictionary, found {}",
            other
        ))),
    }
}

fn to_json(expr: &Expr) -> Result<Value, TransformError> {
    Ok(match expr {
        Expr::Constant(Constant::Int(i)) => Value::from(*i),
        Expr::Constant(Constant::Float(x)) => Number::from_f64(*x)
            .map(Value::Number)
            .ok_or_else(|| TransformError::invalid_metadata(format!("{} is not a finite number", x)))?,
        Expr::Constant(Constant::Str(s)) => Value::String(s.clone()),
        Expr::Constant(Constant::Bool(b)) => Value::Bool(*b),
        Expr::Constant(Constant::None) => Value::Null,
        Expr::List(items) | Expr::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        Expr::Dict(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = key.as_str().ok_or_else(|| {
                    TransformError::invalid_metadata(format!("dictionary key {} is not a string", key))
                })?;
                map.insert(key.to_string(), to_json(value)?);
            }
            Value::Object(map)
        }
        other => {
            return Err(TransformError::invalid_metadata(format!(
                "{} is not a literal",
                other
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use serde_json::json;

    #[test]
    fn test_method_form_innermost_first() {
        let query = parse_query(
            "EventDataset().MetaData({'metadata_type': 'a'}).MetaData({'metadata_type': 'b', 'n': [1, 2.5]}).Select(e => e.x())",
        )
        .unwrap();
        let (stripped, blocks) = extract_metadata(query).unwrap();

        assert_eq!(stripped.to_string(), "EventDataset().Select(e => e.x())");
        assert_eq!(blocks.len(), 2);
        assert_eq!(Value::Object(blocks[0].clone()), json!({"metadata_type": "a"}));
        assert_eq!(
            Value::Object(blocks[1].clone()),
            json!({"metadata_type": "b", "n": [1, 2.5]})
        );
    }

    #[test]
    fn test_call_form() {
        let query =
            parse_query("Select(MetaData(EventDataset(), {'x': True, 'y': None}), e => e)").unwrap();
        let (stripped, blocks) = extract_metadata(query).unwrap();
        assert_eq!(stripped.to_string(), "Select(EventDataset(), e => e)");
        assert_eq!(Value::Object(blocks[0].clone()), json!({"x": true, "y": null}));
    }

    #[test]
    fn test_no_metadata_is_untouched() {
        let query = parse_query("EventDataset().Select(e => e.x())").unwrap();
        let (stripped, blocks) = extract_metadata(query.clone()).unwrap();
        assert_eq!(stripped, query);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_non_literal_rejected() {
        let query = parse_query("EventDataset().MetaData({'x': e.pt()})").unwrap();
        let err = extract_metadata(query).unwrap_err();
        assert!(matches!(err, TransformError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let query = parse_query("EventDataset().MetaData()").unwrap();
        let err = extract_metadata(query).unwrap_err();
        assert!(matches!(err, TransformError::InvalidCall { .. }));
    }

    #[test]
    fn test_non_string_key_rejected() {
        let query = parse_query("EventDataset().MetaData({1: 'x'})").unwrap();
        assert!(extract_metadata(query).is_err());
    }
}
