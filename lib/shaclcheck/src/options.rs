//! Checker configuration.

/// Options of a [`ShapeChecker`](crate::ShapeChecker) run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct CheckerOptions {
    /// Do not write `sh:resultMessage` into the report graph.
    pub no_result_message: bool,
    /// Maximum number of nested shape evaluations before the run fails.
    pub max_recursion_depth: usize,
}

impl CheckerOptions {
    pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 50;

    #[must_use]
    pub fn with_no_result_message(mut self, no_result_message: bool) -> Self {
        self.no_result_message = no_result_message;
        self
    }

    #[must_use]
    pub fn with_max_recursion_depth(mut self, max_recursion_depth: usize) -> Self {
        self.max_recursion_depth = max_recursion_depth;
        self
    }
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            no_result_message: false,
            max_recursion_depth: Self::DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_keys() {
        let options: CheckerOptions = serde_json::from_str(r#"{"noResultMessage": true}"#).unwrap();
        assert!(options.no_result_message);
        assert_eq!(
            options.max_recursion_depth,
            CheckerOptions::DEFAULT_MAX_RECURSION_DEPTH
        );
        let json = serde_json::to_string(&options.with_max_recursion_depth(8)).unwrap();
        assert_eq!(json, r#"{"noResultMessage":true,"maxRecursionDepth":8}"#);
    }
}
