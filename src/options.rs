//! Generator toggles.
//!
//! Every boolean gates exactly one generation category; the integers bound
//! statement counts or expression depth.

use std::path::Path;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct Options {
    #[garde(skip)]
    pub test_collate: bool,
    #[garde(skip)]
    pub test_check_constraints: bool,
    #[garde(skip)]
    pub test_default_values: bool,
    #[garde(skip)]
    pub test_not_null_constraints: bool,
    #[garde(skip)]
    pub test_functions: bool,
    #[garde(skip)]
    pub test_casts: bool,
    #[garde(skip)]
    pub test_between: bool,
    #[garde(skip)]
    pub test_in: bool,
    #[garde(skip)]
    pub test_case: bool,
    #[garde(skip)]
    pub test_binary_logicals: bool,
    #[garde(skip)]
    pub test_binary_comparisons: bool,
    #[garde(skip)]
    pub test_int_constants: bool,
    #[garde(skip)]
    pub test_string_constants: bool,
    #[garde(skip)]
    pub test_date_constants: bool,
    #[garde(skip)]
    pub test_timestamp_constants: bool,
    #[garde(skip)]
    pub test_float_constants: bool,
    #[garde(skip)]
    pub test_boolean_constants: bool,
    #[garde(skip)]
    pub test_indexes: bool,
    /// COMMENT, COLUMN_FORMAT and STORAGE column options.
    #[garde(skip)]
    pub test_engine_column_options: bool,
    /// Expose the implicit `rowid` column to expressions.
    #[garde(skip)]
    pub test_rowid: bool,
    /// `B'0101'` bit literals.
    #[garde(skip)]
    pub test_bit_constants: bool,
    /// SIMILAR TO, NOT SIMILAR TO, `~` and `!~`.
    #[garde(skip)]
    pub test_regex_operators: bool,
    /// UNSIGNED and ZEROFILL on numeric column types.
    #[garde(skip)]
    pub test_numeric_attributes: bool,
    /// The `UNIQUE KEY` spelling of a unique column constraint.
    #[garde(skip)]
    pub test_unique_key: bool,
    /// `CREATE TABLE tN LIKE tM`.
    #[garde(skip)]
    pub test_create_table_like: bool,
    /// `DEFAULT` in place of an INSERT value.
    #[garde(skip)]
    pub test_insert_default: bool,
    /// `ALTER TABLE .. ALTER COLUMN .. SET DATA TYPE`.
    #[garde(skip)]
    pub test_alter_column_type: bool,
    /// HAVING on a query without GROUP BY.
    #[garde(skip)]
    pub test_having_without_group_by: bool,
    #[garde(range(max = 64))]
    pub max_num_views: usize,
    #[garde(range(max = 1000))]
    pub max_num_deletes: usize,
    #[garde(range(max = 1000))]
    pub max_num_updates: usize,
    #[garde(range(max = 10_000))]
    pub max_num_inserts: usize,
    #[garde(range(min = 1, max = 16))]
    pub max_expression_depth: usize,
    /// Per-statement timeout; 0 disables it.
    #[garde(skip)]
    pub statement_timeout_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            test_collate: true,
            test_check_constraints: true,
            test_default_values: true,
            test_not_null_constraints: true,
            test_functions: true,
            test_casts: true,
            test_between: true,
            test_in: true,
            test_case: true,
            test_binary_logicals: true,
            test_binary_comparisons: true,
            test_int_constants: true,
            test_string_constants: true,
            test_date_constants: true,
            test_timestamp_constants: true,
            test_float_constants: true,
            test_boolean_constants: true,
            test_indexes: true,
            test_engine_column_options: true,
            test_rowid: true,
            test_bit_constants: true,
            test_regex_operators: true,
            test_numeric_attributes: true,
            test_unique_key: true,
            test_create_table_like: true,
            test_insert_default: true,
            test_alter_column_type: true,
            test_having_without_group_by: true,
            max_num_views: 1,
            max_num_deletes: 1,
            max_num_updates: 5,
            max_num_inserts: 30,
            max_expression_depth: 3,
            statement_timeout_ms: 10_000,
        }
    }
}

impl Options {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        options.check()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Run the garde rules, reporting the first violation as a config error.
    pub fn check(&self) -> Result<(), GenError> {
        self.validate()
            .map_err(|report| GenError::invalid_config(report.to_string()))
    }

    pub fn with_max_expression_depth(mut self, depth: usize) -> Self {
        self.max_expression_depth = depth;
        self
    }

    pub fn with_statement_timeout_ms(mut self, ms: u64) -> Self {
        self.statement_timeout_ms = ms;
        self
    }

    pub fn with_functions(mut self, enabled: bool) -> Self {
        self.test_functions = enabled;
        self
    }

    pub fn with_casts(mut self, enabled: bool) -> Self {
        self.test_casts = enabled;
        self
    }

    pub fn with_collate(mut self, enabled: bool) -> Self {
        self.test_collate = enabled;
        self
    }

    pub fn with_rowid(mut self, enabled: bool) -> Self {
        self.test_rowid = enabled;
        self
    }

    pub fn with_indexes(mut self, enabled: bool) -> Self {
        self.test_indexes = enabled;
        self
    }

    /// Enable or disable every expression category at once.
    pub fn with_all_expression_categories(mut self, enabled: bool) -> Self {
        self.test_collate = enabled;
        self.test_functions = enabled;
        self.test_casts = enabled;
        self.test_between = enabled;
        self.test_in = enabled;
        self.test_case = enabled;
        self.test_binary_logicals = enabled;
        self.test_binary_comparisons = enabled;
        self
    }

    /// Enable or disable every constant kind at once.
    pub fn with_all_constants(mut self, enabled: bool) -> Self {
        self.test_int_constants = enabled;
        self.test_string_constants = enabled;
        self.test_date_constants = enabled;
        self.test_timestamp_constants = enabled;
        self.test_float_constants = enabled;
        self.test_boolean_constants = enabled;
        self
    }

    pub fn with_int_constants(mut self, enabled: bool) -> Self {
        self.test_int_constants = enabled;
        self
    }

    pub fn with_string_constants(mut self, enabled: bool) -> Self {
        self.test_string_constants = enabled;
        self
    }

    /// Toggles for running against the embedded SQLite. It lacks the
    /// dialect's collations, temporal literals, engine column options and
    /// every MySQL-only piece of syntax the generator can emit.
    pub fn sqlite_compatible() -> Self {
        Self {
            test_collate: false,
            test_functions: false,
            test_date_constants: false,
            test_timestamp_constants: false,
            test_engine_column_options: false,
            test_bit_constants: false,
            test_regex_operators: false,
            test_numeric_attributes: false,
            test_unique_key: false,
            test_create_table_like: false,
            test_insert_default: false,
            test_alter_column_type: false,
            test_having_without_group_by: false,
            ..Self::default()
        }
    }
}
