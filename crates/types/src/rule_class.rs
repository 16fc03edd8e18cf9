//! Rule classification by naming convention.
//!
//! Only rules whose names follow the `deny`/`violation`/`warn` conventions are
//! evaluated. Everything else in a policy module (helpers, functions, the
//! `exception` set itself) is ignored by the orchestrator.

/// Class of a policy rule, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleClass {
    /// `deny`, `violation`, `deny_<suffix>...`, `violation_<suffix>...`
    Failure,
    /// `warn`, `warn_<suffix>...`
    Warning,
    /// Not an evaluated rule
    None,
}

impl RuleClass {
    /// Returns true if rules of this class take part in evaluation.
    #[must_use]
    pub const fn is_evaluated(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for RuleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failure => write!(f, "failure"),
            Self::Warning => write!(f, "warning"),
            Self::None => write!(f, "none"),
        }
    }
}

const FAILURE_PREFIXES: &[&str] = &["deny", "violation"];
const WARNING_PREFIXES: &[&str] = &["warn"];

/// Prefixes removed from a rule name to find the name exceptions refer to.
const EXCEPTION_PREFIXES: &[&str] = &["deny_", "violation_", "warn_"];

/// Classify a rule name.
///
/// Failure rules match `^(deny|violation)(_[A-Za-z0-9]+)*$` and warning rules
/// match `^warn(_[A-Za-z0-9]+)*$`. Anything else is [`RuleClass::None`].
#[must_use]
pub fn classify(rule: &str) -> RuleClass {
    if matches_convention(rule, FAILURE_PREFIXES) {
        RuleClass::Failure
    } else if matches_convention(rule, WARNING_PREFIXES) {
        RuleClass::Warning
    } else {
        RuleClass::None
    }
}

/// Strip a single class prefix (`deny_`, `violation_`, `warn_`) from a rule name.
///
/// Bare names such as `deny` are returned unchanged.
#[must_use]
pub fn base_rule_name(rule: &str) -> &str {
    EXCEPTION_PREFIXES
        .iter()
        .find_map(|prefix| rule.strip_prefix(prefix))
        .unwrap_or(rule)
}

fn matches_convention(rule: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| {
        rule.strip_prefix(prefix)
            .is_some_and(has_only_suffix_tokens)
    })
}

/// Matches `(_[A-Za-z0-9]+)*`.
fn has_only_suffix_tokens(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }

    let Some(tokens) = rest.strip_prefix('_') else {
        return false;
    };

    tokens
        .split('_')
        .all(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()))
}
