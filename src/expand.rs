use lazy_static::lazy_static;
use regex::Regex;

use crate::error::SqlOpsError;
use crate::translation::{PlanKind, Slot, TranslationPlan};
use crate::types::{ParamSource, ParamValue, RowValues};

lazy_static! {
    static ref INLINE_IDENT: Regex = Regex::new(r"^[A-Za-z0-9_ ]*$").expect("static regex");
}

/// SQL and flat values ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub sql: String,
    pub values: Vec<RowValues>,
}

impl ExpandedQuery {
    /// Placeholders written into `sql`; always equals `values.len()`.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.values.len()
    }
}

/// Bind a parameter source to a plan, widening list bindings into one placeholder per
/// element.
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let plan = translate("select * from t where name in (:name) and cnt > :cnt", PlaceholderStyle::Sqlite)?;
/// let expanded = expand(&plan, &named_params! { "name" => vec!["a", "b"], "cnt" => 1 })?;
/// assert_eq!(expanded.sql, "select * from t where name in (?1, ?2) and cnt > ?3");
/// assert_eq!(expanded.values.len(), 3);
/// # Ok::<(), SqlOpsError>(())
/// ```
///
/// # Errors
/// - `ParameterCountError` when a positional source has the wrong length.
/// - `MissingParameterError` when a named source lacks a referenced key.
/// - `ParameterError` when the source kind does not match the template.
/// - `EmptyCollectionError` for empty list or inline bindings.
/// - `UnsafeIdentifier` for inline text outside `[A-Za-z0-9_ ]`.
pub fn expand(plan: &TranslationPlan, source: &ParamSource) -> Result<ExpandedQuery, SqlOpsError> {
    check_source(plan, source)?;

    let style = plan.style();
    let segments = plan.segments();
    let mut sql = String::with_capacity(plan.template().len() + plan.placeholder_count() * 4);
    let mut values = Vec::with_capacity(plan.placeholder_count());

    for (slot, segment) in plan.slots().iter().zip(segments) {
        sql.push_str(segment);
        match lookup(slot, source)? {
            ParamValue::Scalar(value) => {
                values.push(value.clone());
                style.write_placeholder(&mut sql, values.len());
            }
            ParamValue::List(items) => {
                if items.is_empty() {
                    return Err(SqlOpsError::EmptyCollectionError(slot.label()));
                }
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        sql.push_str(", ");
                    }
                    values.push(item.clone());
                    style.write_placeholder(&mut sql, values.len());
                }
            }
            ParamValue::Inline(parts) => {
                if parts.is_empty() {
                    return Err(SqlOpsError::EmptyCollectionError(slot.label()));
                }
                if let Some(bad) = parts.iter().find(|p| !INLINE_IDENT.is_match(p)) {
                    return Err(SqlOpsError::UnsafeIdentifier(bad.clone()));
                }
                sql.push_str(&parts.join(", "));
            }
        }
    }
    if let Some(tail) = segments.last() {
        sql.push_str(tail);
    }

    Ok(ExpandedQuery { sql, values })
}

fn check_source(plan: &TranslationPlan, source: &ParamSource) -> Result<(), SqlOpsError> {
    match (plan.kind(), source) {
        (PlanKind::Empty, ParamSource::Named(_)) => Ok(()),
        (PlanKind::Empty | PlanKind::Positional, ParamSource::Positional(values)) => {
            let expected = plan.expected_positional();
            if values.len() == expected {
                Ok(())
            } else {
                Err(SqlOpsError::ParameterCountError {
                    expected,
                    actual: values.len(),
                })
            }
        }
        (PlanKind::Positional, ParamSource::Named(_)) => Err(SqlOpsError::ParameterError(
            "positional template requires an ordered parameter sequence".into(),
        )),
        (PlanKind::Named, ParamSource::Positional(_)) => Err(SqlOpsError::ParameterError(
            "named template requires a parameter mapping".into(),
        )),
        (PlanKind::Named, ParamSource::Named(map)) => {
            match plan.named_keys().into_iter().find(|key| !map.contains_key(*key)) {
                Some(missing) => Err(SqlOpsError::MissingParameterError(missing.to_string())),
                None => Ok(()),
            }
        }
    }
}

fn lookup<'s>(slot: &Slot, source: &'s ParamSource) -> Result<&'s ParamValue, SqlOpsError> {
    match (slot, source) {
        (Slot::Positional(idx), ParamSource::Positional(values)) => {
            values.get(*idx).ok_or(SqlOpsError::ParameterCountError {
                expected: idx + 1,
                actual: values.len(),
            })
        }
        (Slot::Named(key), ParamSource::Named(map)) => map
            .get(key)
            .ok_or_else(|| SqlOpsError::MissingParameterError(key.clone())),
        (slot, _) => Err(SqlOpsError::ParameterError(format!(
            "placeholder {} does not match the parameter source kind",
            slot.label()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::{PlaceholderStyle, translate};
    use crate::{named_params, params};

    fn plan(sql: &str) -> TranslationPlan {
        translate(sql, PlaceholderStyle::Sqlite).unwrap()
    }

    #[test]
    fn scalars_pass_through_in_order() {
        let p = plan("update t set cnt = ? where name = ? limit ?;");
        let e = expand(&p, &params![3, "hello", 10]).unwrap();
        assert_eq!(e.sql, "update t set cnt = ?1 where name = ?2 limit ?3;");
        assert_eq!(
            e.values,
            vec![RowValues::Int(3), RowValues::Text("hello".into()), RowValues::Int(10)]
        );
    }

    #[test]
    fn positional_lists_expand() {
        let p = plan("delete from t where name in (?) and cnt in (?) limit ?;");
        let e = expand(&p, &params![vec!["a"], vec![1, 2], 10]).unwrap();
        assert_eq!(e.sql, "delete from t where name in (?1) and cnt in (?2, ?3) limit ?4;");
        assert_eq!(e.placeholder_count(), 4);
    }

    #[test]
    fn named_lists_expand_in_place() {
        let p = plan("update t set cnt = :cnt where name in (:name) limit :limit;");
        let e = expand(
            &p,
            &named_params! { "cnt" => 5, "name" => vec!["a", "b"], "limit" => 2 },
        )
        .unwrap();
        assert_eq!(e.sql, "update t set cnt = ?1 where name in (?2, ?3) limit ?4;");
        assert_eq!(
            e.values,
            vec![
                RowValues::Int(5),
                RowValues::Text("a".into()),
                RowValues::Text("b".into()),
                RowValues::Int(2),
            ]
        );
    }

    #[test]
    fn repeated_numbered_markers_rebind() {
        let p = plan("select ?1, ?2, ?1");
        let e = expand(&p, &params!["x", vec![1, 2]]).unwrap();
        assert_eq!(e.sql, "select ?1, ?2, ?3, ?4");
        assert_eq!(e.values[0], e.values[3]);
    }

    #[test]
    fn wrong_positional_count_fails() {
        let p = plan("select * from t where a = ? and b = ?");
        let err = expand(&p, &params![1]).unwrap_err();
        assert!(matches!(
            err,
            SqlOpsError::ParameterCountError { expected: 2, actual: 1 }
        ));
        let err = expand(&plan("select 1"), &params![1]).unwrap_err();
        assert!(matches!(err, SqlOpsError::ParameterCountError { expected: 0, actual: 1 }));
    }

    #[test]
    fn missing_named_key_fails() {
        let p = plan("select * from t where a = :a and b = :b");
        let err = expand(&p, &named_params! { "a" => 1, "c" => 2 }).unwrap_err();
        assert!(matches!(err, SqlOpsError::MissingParameterError(ref k) if k == "b"));
    }

    #[test]
    fn empty_list_fails() {
        let p = plan("select * from t where a in (:a)");
        let err = expand(&p, &named_params! { "a" => Vec::<i64>::new() }).unwrap_err();
        assert!(matches!(err, SqlOpsError::EmptyCollectionError(ref l) if l == ":a"));
    }

    #[test]
    fn source_kind_must_match() {
        let err = expand(&plan("select ?"), &named_params! { "a" => 1 }).unwrap_err();
        assert!(matches!(err, SqlOpsError::ParameterError(_)));
        let err = expand(&plan("select :a"), &params![1]).unwrap_err();
        assert!(matches!(err, SqlOpsError::ParameterError(_)));
    }

    #[test]
    fn inline_identifiers_are_validated() {
        let p = plan("select name, count(*) from t group by :groupby order by :orderby");
        let e = expand(
            &p,
            &named_params! {
                "groupby" => ParamValue::inline(["name"]),
                "orderby" => ParamValue::inline(["name desc", "cnt"]),
            },
        )
        .unwrap();
        assert_eq!(e.sql, "select name, count(*) from t group by name order by name desc, cnt");
        assert!(e.values.is_empty());

        let err = expand(
            &p,
            &named_params! {
                "groupby" => ParamValue::inline(["name; drop table t"]),
                "orderby" => ParamValue::inline(["name"]),
            },
        )
        .unwrap_err();
        assert!(matches!(err, SqlOpsError::UnsafeIdentifier(_)));
    }

    #[test]
    fn extra_named_keys_are_ignored() {
        let p = plan("select * from t where a = :a");
        let e = expand(&p, &named_params! { "a" => 1, "unused" => 2 }).unwrap();
        assert_eq!(e.values, vec![RowValues::Int(1)]);
    }
}
