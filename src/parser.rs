//! Expression parsers for the fluent verbs, using nom.
//!
//! Three small grammars share one token layer:
//!
//! ```text
//! selection:  country, eventid:iday, *        ranges and wildcards
//! arrange:    desc(year), country             per-entry direction
//! rename:     place = country, yr = year      new = old pairs
//! ```
//!
//! Selection tokens are classified per comma-separated piece; anything the
//! grammar rejects is kept as a plain name so schema validation can drop it
//! later instead of failing the whole expression.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, value},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use std::collections::HashSet;

use crate::ast::{OrderKey, Selection};

/// One token of a comma-separated selection expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectToken {
    /// Wildcard `*`.
    Star,
    /// Range `first:last` over the schema's natural order.
    Range { first: String, last: String },
    /// Plain column name, validated against the schema at resolution.
    Name(String),
}

/// Parse an identifier (column name).
fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Parse a range token `first:last`.
fn range_token(input: &str) -> IResult<&str, SelectToken> {
    map(
        separated_pair(
            identifier,
            delimited(multispace0, char(':'), multispace0),
            identifier,
        ),
        |(first, last)| SelectToken::Range {
            first: first.to_string(),
            last: last.to_string(),
        },
    )(input)
}

/// Parse one selection token. Ranges must come before plain names so a
/// token like `a:b` is not split at the identifier boundary.
fn select_token(input: &str) -> IResult<&str, SelectToken> {
    alt((
        value(SelectToken::Star, char('*')),
        range_token,
        map(identifier, |s| SelectToken::Name(s.to_string())),
    ))(input)
}

/// Parse one arrange entry: `desc(col)` or a bare ascending column.
fn order_token(input: &str) -> IResult<&str, OrderKey> {
    alt((
        map(
            preceded(
                tag("desc"),
                delimited(
                    char('('),
                    delimited(multispace0, identifier, multispace0),
                    char(')'),
                ),
            ),
            OrderKey::desc,
        ),
        map(identifier, OrderKey::asc),
    ))(input)
}

/// Parse one rename entry `new = old`.
fn rename_pair(input: &str) -> IResult<&str, (String, String)> {
    map(
        separated_pair(
            delimited(multispace0, identifier, multispace0),
            char('='),
            delimited(multispace0, identifier, multispace0),
        ),
        |(new, old)| (new.to_string(), old.to_string()),
    )(input)
}

/// Tokenize a selection expression. Pieces the grammar rejects become plain
/// names; schema validation decides their fate.
pub fn parse_selection(expr: &str) -> Vec<SelectToken> {
    expr.split(',')
        .map(|piece| {
            match all_consuming(delimited(multispace0, select_token, multispace0))(piece) {
                Ok((_, token)) => token,
                Err(_) => SelectToken::Name(piece.trim().to_string()),
            }
        })
        .collect()
}

/// Parse an arrange expression into ORDER BY entries, order preserved.
/// Entries are not validated against the schema; the engine reports bad
/// columns at execution.
pub fn parse_order(expr: &str) -> Vec<OrderKey> {
    expr.split(',')
        .filter_map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() {
                return None;
            }
            match all_consuming(delimited(multispace0, order_token, multispace0))(piece) {
                Ok((_, key)) => Some(key),
                Err(_) => Some(OrderKey::asc(piece)),
            }
        })
        .collect()
}

/// Parse a rename mapping into `(new, old)` pairs. Entries without `=` are
/// ignored.
pub fn parse_renames(expr: &str) -> Vec<(String, String)> {
    expr.split(',')
        .filter_map(|piece| all_consuming(rename_pair)(piece).ok().map(|(_, pair)| pair))
        .collect()
}

/// Split a plain comma-separated column list, trimming whitespace and
/// dropping empty entries.
pub fn parse_list(expr: &str) -> Vec<String> {
    expr.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

/// Expand a range token by forward scan of the schema.
///
/// The scan enters an "on" state at the first occurrence of `first` and
/// collects through the first occurrence of `last` inclusive. Meeting `last`
/// before `first` ends the expansion empty; never meeting `last` runs the
/// collection to the end of the schema, provided the scan turned on at all.
fn expand_range(first: &str, last: &str, schema: &[String]) -> Vec<String> {
    let mut collected = Vec::new();
    let mut on = false;
    for column in schema {
        if column == first {
            on = true;
            collected.push(column.clone());
        } else if column == last {
            if on {
                collected.push(column.clone());
            } else {
                collected.clear();
            }
            return collected;
        } else if on {
            collected.push(column.clone());
        }
    }
    collected
}

/// Resolve a selection expression against a schema.
///
/// Ranges expand in place, wildcards fill in whatever the other tokens left
/// unnamed (schema order), names absent from the schema are dropped, and an
/// empty outcome falls back to [`Selection::All`] so a mistyped expression
/// never produces an empty SELECT list.
pub fn resolve_selection(expr: &str, schema: &[String]) -> Selection {
    let mut expanded: Vec<SelectToken> = Vec::new();
    for token in parse_selection(expr) {
        match token {
            SelectToken::Range { first, last } => expanded.extend(
                expand_range(&first, &last, schema)
                    .into_iter()
                    .map(SelectToken::Name),
            ),
            other => expanded.push(other),
        }
    }

    let named: HashSet<&str> = expanded
        .iter()
        .filter_map(|token| match token {
            SelectToken::Name(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let mut resolved: Vec<String> = Vec::new();
    for token in &expanded {
        match token {
            SelectToken::Star => {
                resolved.extend(
                    schema
                        .iter()
                        .filter(|column| !named.contains(column.as_str()))
                        .cloned(),
                );
            }
            SelectToken::Name(name) => {
                if schema.iter().any(|column| column == name) {
                    resolved.push(name.clone());
                }
            }
            SelectToken::Range { .. } => {}
        }
    }

    if resolved.is_empty() {
        // All-columns fallback: never an empty clause.
        Selection::All
    } else {
        Selection::Columns(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SortOrder;

    fn schema(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_tokenize_mixed_expression() {
        let tokens = parse_selection("country, eventid:iday, *");
        assert_eq!(
            tokens,
            vec![
                SelectToken::Name("country".to_string()),
                SelectToken::Range {
                    first: "eventid".to_string(),
                    last: "iday".to_string(),
                },
                SelectToken::Star,
            ]
        );
    }

    #[test]
    fn test_malformed_piece_kept_as_name() {
        let tokens = parse_selection("a b, ok");
        assert_eq!(
            tokens,
            vec![
                SelectToken::Name("a b".to_string()),
                SelectToken::Name("ok".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_inclusive_forward() {
        let s = schema(&["a", "b", "c", "d", "e"]);
        assert_eq!(resolve_selection("b:d", &s), Selection::Columns(schema(&["b", "c", "d"])));
    }

    #[test]
    fn test_range_reversed_endpoints_empty() {
        let s = schema(&["a", "b", "c", "d", "e"]);
        // Forward scan meets the end before the start: nothing collected,
        // so the whole expression falls back to the sentinel.
        assert_eq!(resolve_selection("d:b", &s), Selection::All);
    }

    #[test]
    fn test_range_missing_last_runs_to_end() {
        let s = schema(&["a", "b", "c", "d"]);
        assert_eq!(
            resolve_selection("c:zzz", &s),
            Selection::Columns(schema(&["c", "d"]))
        );
    }

    #[test]
    fn test_range_missing_first_empty() {
        let s = schema(&["a", "b", "c", "d"]);
        assert_eq!(resolve_selection("zzz:c", &s), Selection::All);
    }

    #[test]
    fn test_wildcard_excludes_named_columns() {
        let s = schema(&["a", "b", "c"]);
        assert_eq!(
            resolve_selection("b,*", &s),
            Selection::Columns(schema(&["b", "a", "c"]))
        );
    }

    #[test]
    fn test_bare_wildcard_yields_full_schema() {
        let s = schema(&["a", "b", "c"]);
        assert_eq!(resolve_selection("*", &s), Selection::Columns(schema(&["a", "b", "c"])));
    }

    #[test]
    fn test_invalid_names_dropped() {
        let s = schema(&["a", "b"]);
        assert_eq!(resolve_selection("a,nope", &s), Selection::Columns(schema(&["a"])));
    }

    #[test]
    fn test_all_invalid_falls_back_to_sentinel() {
        let s = schema(&["a", "b"]);
        assert_eq!(resolve_selection("nope,wrong", &s), Selection::All);
    }

    #[test]
    fn test_duplicates_survive_resolution() {
        let s = schema(&["a", "b"]);
        assert_eq!(
            resolve_selection("a,a", &s),
            Selection::Columns(schema(&["a", "a"]))
        );
    }

    #[test]
    fn test_range_between_plain_tokens_keeps_order() {
        let s = schema(&["a", "b", "c", "d", "e"]);
        assert_eq!(
            resolve_selection("e, b:c, a", &s),
            Selection::Columns(schema(&["e", "b", "c", "a"]))
        );
    }

    #[test]
    fn test_order_entries_preserve_precedence() {
        let keys = parse_order("desc(x),y");
        assert_eq!(keys, vec![OrderKey::desc("x"), OrderKey::asc("y")]);
        assert_eq!(keys[0].order, SortOrder::Desc);
    }

    #[test]
    fn test_order_empty_expression() {
        assert!(parse_order("").is_empty());
    }

    #[test]
    fn test_rename_pairs_and_ignored_entries() {
        let pairs = parse_renames("place = country, junk, yr=year");
        assert_eq!(
            pairs,
            vec![
                ("place".to_string(), "country".to_string()),
                ("yr".to_string(), "year".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_trims_and_drops_empty() {
        assert_eq!(parse_list(" a , b ,,c "), schema(&["a", "b", "c"]));
        assert!(parse_list("").is_empty());
    }
}
