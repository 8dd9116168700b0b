//! Source selection for allocation rules.

use regex::Regex;
use stratum_shared::types::CostCenterId;

use super::error::AllocationError;
use super::types::SourceSelector;
use crate::account::AccountChart;
use crate::budget::BudgetLineItem;
use crate::hierarchy::CostCenterDirectory;

/// A source selector ready for matching.
#[derive(Debug, Clone)]
pub enum CompiledSelector {
    /// Exact cost center.
    CostCenter(CostCenterId),
    /// Code patterns; an absent pattern matches anything.
    Pattern {
        /// Cost-center code pattern.
        cost_center_code: Option<Regex>,
        /// Account code pattern.
        account_code: Option<Regex>,
    },
}

impl CompiledSelector {
    /// Compiles a selector.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::InvalidPattern` if a pattern does not compile
    /// and `AllocationError::EmptySelector` if neither pattern is set.
    pub fn compile(selector: &SourceSelector) -> Result<Self, AllocationError> {
        match selector {
            SourceSelector::CostCenter { cost_center_id } => Ok(Self::CostCenter(*cost_center_id)),
            SourceSelector::Pattern {
                cost_center_code: None,
                account_code: None,
            } => Err(AllocationError::EmptySelector),
            SourceSelector::Pattern {
                cost_center_code,
                account_code,
            } => Ok(Self::Pattern {
                cost_center_code: cost_center_code.as_deref().map(like_to_regex).transpose()?,
                account_code: account_code.as_deref().map(like_to_regex).transpose()?,
            }),
        }
    }

    /// Returns true if the line item is drawn from by this selector.
    #[must_use]
    pub fn matches(
        &self,
        item: &BudgetLineItem,
        directory: &CostCenterDirectory,
        accounts: &AccountChart,
    ) -> bool {
        match self {
            Self::CostCenter(id) => item.cost_center_id == *id,
            Self::Pattern {
                cost_center_code,
                account_code,
            } => {
                let cc_ok = cost_center_code.as_ref().is_none_or(|re| {
                    directory
                        .get(item.cost_center_id)
                        .is_some_and(|cc| re.is_match(&cc.code))
                });
                let acct_ok = account_code.as_ref().is_none_or(|re| {
                    accounts
                        .get(item.gl_account_id)
                        .is_some_and(|a| re.is_match(&a.code))
                });
                cc_ok && acct_ok
            }
        }
    }
}

/// Translates a SQL `LIKE` pattern into an anchored regex.
///
/// `%` matches any run of characters and `_` exactly one.
///
/// # Errors
///
/// Returns `AllocationError::InvalidPattern` if the translated regex does not compile.
pub fn like_to_regex(pattern: &str) -> Result<Regex, AllocationError> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '%' | '_' => {
                translated.push_str(&regex::escape(&literal));
                literal.clear();
                translated.push_str(if ch == '%' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    translated.push_str(&regex::escape(&literal));
    translated.push('$');

    Regex::new(&translated).map_err(|source| AllocationError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CC-%", "CC-100", true)]
    #[case("CC-%", "XC-100", false)]
    #[case("CC-1_0", "CC-120", true)]
    #[case("CC-1_0", "CC-1200", false)]
    #[case("6%", "6100", true)]
    #[case("A.B", "A.B", true)]
    #[case("A.B", "AxB", false)]
    #[case("%", "", true)]
    fn test_like_patterns(#[case] pattern: &str, #[case] code: &str, #[case] expected: bool) {
        let re = like_to_regex(pattern).unwrap();
        assert_eq!(re.is_match(code), expected);
    }

    #[test]
    fn test_empty_pattern_selector_rejected() {
        let selector = SourceSelector::Pattern {
            cost_center_code: None,
            account_code: None,
        };
        assert!(matches!(
            CompiledSelector::compile(&selector),
            Err(AllocationError::EmptySelector)
        ));
    }
}
