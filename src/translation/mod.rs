use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use clap::ValueEnum;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::SqlOpsError;

mod parsers;
mod scanner;

use parsers::{at, dollar_delimiter};
use scanner::{State, is_valid_key, scan_digits, scan_identifier};

/// Native placeholder syntax a plan renders to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// SQLite-style numbered placeholders like `?1`.
    #[default]
    Sqlite,
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
}

impl PlaceholderStyle {
    /// Append the placeholder for the `n`th (1-based) bound value.
    pub fn write_placeholder(self, buf: &mut String, n: usize) {
        buf.push(match self {
            PlaceholderStyle::Sqlite => '?',
            PlaceholderStyle::Postgres => '$',
        });
        buf.push_str(&n.to_string());
    }
}

/// Which marker family a template uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// No placeholders at all.
    Empty,
    /// `?` or `?N` markers.
    Positional,
    /// `:name` markers.
    Named,
}

/// One placeholder occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Zero-based index into the positional source.
    Positional(usize),
    /// Key into the named source.
    Named(String),
}

impl Slot {
    /// How the slot is written in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Slot::Positional(idx) => format!("?{}", idx + 1),
            Slot::Named(key) => format!(":{key}"),
        }
    }
}

/// Template-derived description of where values go.
///
/// `segments` always holds one more entry than `slots`: the SQL text before the first
/// placeholder, between each pair, and after the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPlan {
    template: String,
    style: PlaceholderStyle,
    kind: PlanKind,
    segments: Vec<String>,
    slots: Vec<Slot>,
    positional_count: usize,
    sql: String,
}

impl TranslationPlan {
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    #[must_use]
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Rewritten SQL with one native placeholder per slot (before any list expansion).
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholder occurrences in the template.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.slots.len()
    }

    /// Length a positional source must have.
    #[must_use]
    pub fn expected_positional(&self) -> usize {
        self.positional_count
    }

    /// Distinct named keys in first-occurrence order.
    #[must_use]
    pub fn named_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for slot in &self.slots {
            if let Slot::Named(key) = slot
                && !keys.contains(&key.as_str())
            {
                keys.push(key);
            }
        }
        keys
    }
}

#[derive(Default)]
struct Markers {
    anonymous: usize,
    numbered_max: usize,
    numbered: bool,
    named: bool,
}

impl Markers {
    fn positional(&self) -> bool {
        self.anonymous > 0 || self.numbered
    }
}

/// Analyse a template and build its plan.
///
/// Quoted strings, quoted identifiers, comments and dollar-quoted blocks are skipped, and
/// `::` casts are left alone.
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let plan = translate("update t set cnt = :cnt where name in (:name)", PlaceholderStyle::Sqlite)?;
/// assert_eq!(plan.sql(), "update t set cnt = ?1 where name in (?2)");
/// assert_eq!(plan.named_keys(), vec!["cnt", "name"]);
/// # Ok::<(), SqlOpsError>(())
/// ```
///
/// # Errors
/// Returns `SqlOpsError::TemplateError` when positional and named markers are mixed, when
/// anonymous `?` and numbered `?N` markers are mixed, for `?0`, or when a named marker's
/// identifier is not made of ASCII letters, digits and underscores.
pub fn translate(template: &str, style: PlaceholderStyle) -> Result<TranslationPlan, SqlOpsError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut slots = Vec::new();
    let mut markers = Markers::default();
    let mut segment_start = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                _ if at(bytes, idx, b"--") => state = State::LineComment,
                _ if at(bytes, idx, b"/*") => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                // SQLite reads `$name` as a parameter; only Postgres has dollar quoting.
                b'$' if style == PlaceholderStyle::Postgres => {
                    if let Some(delim) = dollar_delimiter(bytes, idx) {
                        idx += delim.len() - 1;
                        state = State::DollarQuoted(delim.to_vec());
                    }
                }
                b'?' => {
                    let (end, slot) = match scan_digits(bytes, idx + 1) {
                        Some((digits_end, digits)) => {
                            let n: usize = digits.parse().map_err(|_| {
                                template_error(template, &format!("placeholder ?{digits} is out of range"))
                            })?;
                            if n == 0 {
                                return Err(template_error(template, "placeholder ?0 is not valid; numbering starts at ?1"));
                            }
                            markers.numbered = true;
                            markers.numbered_max = markers.numbered_max.max(n);
                            (digits_end, Slot::Positional(n - 1))
                        }
                        None => {
                            markers.anonymous += 1;
                            (idx + 1, Slot::Positional(markers.anonymous - 1))
                        }
                    };
                    segments.push(template[segment_start..idx].to_string());
                    slots.push(slot);
                    segment_start = end;
                    idx = end;
                    continue;
                }
                b':' if at(bytes, idx, b"::") => {
                    idx += 2;
                    continue;
                }
                b':' => {
                    let (end, ident) = scan_identifier(template, idx + 1);
                    if !ident.is_empty() {
                        if !is_valid_key(ident) {
                            return Err(template_error(
                                template,
                                &format!("named placeholder :{ident} must use ASCII letters, digits and underscores"),
                            ));
                        }
                        markers.named = true;
                        segments.push(template[segment_start..idx].to_string());
                        slots.push(Slot::Named(ident.to_string()));
                        segment_start = end;
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if at(bytes, idx, b"/*") {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if at(bytes, idx, b"*/") {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
            State::DollarQuoted(ref delim) => {
                if b == b'$' && at(bytes, idx, delim) {
                    idx += delim.len() - 1;
                    state = State::Normal;
                }
            }
        }

        idx += 1;
    }
    segments.push(template[segment_start..].to_string());

    if markers.positional() && markers.named {
        return Err(template_error(
            template,
            "positional `?` and named `:name` placeholders cannot be mixed",
        ));
    }
    if markers.anonymous > 0 && markers.numbered {
        return Err(template_error(
            template,
            "anonymous `?` and numbered `?N` placeholders cannot be mixed",
        ));
    }

    let kind = if markers.named {
        PlanKind::Named
    } else if markers.positional() {
        PlanKind::Positional
    } else {
        PlanKind::Empty
    };
    let positional_count = if markers.numbered {
        markers.numbered_max
    } else {
        markers.anonymous
    };

    let mut sql = String::with_capacity(template.len() + slots.len() * 2);
    for (n, segment) in segments.iter().enumerate() {
        sql.push_str(segment);
        if n < slots.len() {
            style.write_placeholder(&mut sql, n + 1);
        }
    }

    Ok(TranslationPlan {
        template: template.to_string(),
        style,
        kind,
        segments,
        slots,
        positional_count,
        sql,
    })
}

fn template_error(template: &str, reason: &str) -> SqlOpsError {
    SqlOpsError::TemplateError(format!("{reason} (in {template:?})"))
}

type PlanKey = (PlaceholderStyle, String);

lazy_static! {
    static ref PLAN_CACHE: Mutex<HashMap<PlanKey, Arc<TranslationPlan>>> =
        Mutex::new(HashMap::new());
}

fn lock_cache() -> MutexGuard<'static, HashMap<PlanKey, Arc<TranslationPlan>>> {
    match PLAN_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Process-wide memo of translation plans keyed by template text and target style.
pub struct PlanCache;

impl PlanCache {
    #[must_use]
    pub fn len() -> usize {
        lock_cache().len()
    }

    #[must_use]
    pub fn is_empty() -> bool {
        lock_cache().is_empty()
    }

    pub fn clear() {
        lock_cache().clear();
    }
}

/// [`translate`] with memoization. Failed translations are not cached.
///
/// # Errors
/// Same as [`translate`].
pub fn translate_cached(
    template: &str,
    style: PlaceholderStyle,
) -> Result<Arc<TranslationPlan>, SqlOpsError> {
    let key = (style, template.to_string());
    if let Some(plan) = lock_cache().get(&key) {
        return Ok(Arc::clone(plan));
    }

    trace!(template, ?style, "translating template");
    let plan = Arc::new(translate(template, style)?);
    Ok(Arc::clone(lock_cache().entry(key).or_insert(plan)))
}
