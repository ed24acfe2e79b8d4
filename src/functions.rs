//! Scalar and aggregate function catalog.

use crate::context::Context;

/// Category of a scalar function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    Trigonometric,
    Math,
    Text,
    DateTime,
    NullHandling,
    Bit,
    ControlFlow,
    Aggregate,
}

/// A function the generator may call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: &'static str,
    /// Fixed arity, or the minimum arity for variadic functions.
    pub args: usize,
    pub variadic: bool,
    pub category: FunctionCategory,
}

impl FunctionDef {
    pub const fn new(name: &'static str, args: usize, category: FunctionCategory) -> Self {
        Self {
            name,
            args,
            variadic: false,
            category,
        }
    }

    /// Accept `args + small_number()` arguments.
    pub const fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn is_aggregate(&self) -> bool {
        self.category == FunctionCategory::Aggregate
    }

    /// Number of arguments to generate for one call.
    pub fn arg_count(&self, ctx: &mut Context) -> usize {
        if self.variadic {
            self.args + ctx.small_number()
        } else {
            self.args
        }
    }
}

use FunctionCategory::*;

pub static SCALAR_FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("ACOS", 1, Trigonometric),
    FunctionDef::new("ASIN", 1, Trigonometric),
    FunctionDef::new("ATAN", 1, Trigonometric),
    FunctionDef::new("COS", 1, Trigonometric),
    FunctionDef::new("SIN", 1, Trigonometric),
    FunctionDef::new("TAN", 1, Trigonometric),
    FunctionDef::new("COT", 1, Trigonometric),
    FunctionDef::new("ATAN2", 1, Trigonometric),
    FunctionDef::new("ABS", 1, Math),
    FunctionDef::new("CEIL", 1, Math),
    FunctionDef::new("CEILING", 1, Math),
    FunctionDef::new("FLOOR", 1, Math),
    FunctionDef::new("LOG", 1, Math),
    FunctionDef::new("LOG10", 1, Math),
    FunctionDef::new("LOG2", 1, Math),
    FunctionDef::new("LN", 1, Math),
    FunctionDef::new("PI", 0, Math),
    FunctionDef::new("SQRT", 1, Math),
    FunctionDef::new("POWER", 1, Math),
    FunctionDef::new("CBRT", 1, Math),
    FunctionDef::new("ROUND", 2, Math),
    FunctionDef::new("SIGN", 1, Math),
    FunctionDef::new("DEGREES", 1, Math),
    FunctionDef::new("RADIANS", 1, Math),
    FunctionDef::new("MOD", 2, Math),
    FunctionDef::new("XOR", 2, Math),
    FunctionDef::new("LENGTH", 1, Text),
    FunctionDef::new("LOWER", 1, Text),
    FunctionDef::new("UPPER", 1, Text),
    FunctionDef::new("SUBSTRING", 3, Text),
    FunctionDef::new("REVERSE", 1, Text),
    FunctionDef::new("CONCAT", 1, Text).variadic(),
    FunctionDef::new("CONCAT_WS", 1, Text).variadic(),
    FunctionDef::new("CONTAINS", 2, Text),
    FunctionDef::new("PREFIX", 2, Text),
    FunctionDef::new("SUFFIX", 2, Text),
    FunctionDef::new("INSTR", 2, Text),
    FunctionDef::new("PRINTF", 1, Text).variadic(),
    FunctionDef::new("REGEXP_MATCHES", 2, Text),
    FunctionDef::new("REGEXP_REPLACE", 3, Text),
    FunctionDef::new("STRIP_ACCENTS", 1, Text),
    FunctionDef::new("LTRIM", 1, Text),
    FunctionDef::new("RTRIM", 1, Text),
    FunctionDef::new("REPLACE", 3, Text),
    FunctionDef::new("UNICODE", 1, Text),
    FunctionDef::new("DATE_PART", 2, DateTime),
    FunctionDef::new("AGE", 2, DateTime),
    FunctionDef::new("LAST_DAY", 1, DateTime),
    FunctionDef::new("MONTHNAME", 1, DateTime),
    FunctionDef::new("DAYNAME", 1, DateTime),
    FunctionDef::new("YEARWEEK", 1, DateTime),
    FunctionDef::new("DAYOFMONTH", 1, DateTime),
    FunctionDef::new("WEEKDAY", 1, DateTime),
    FunctionDef::new("WEEKOFYEAR", 1, DateTime),
    FunctionDef::new("COALESCE", 3, NullHandling),
    FunctionDef::new("NULLIF", 2, NullHandling),
    FunctionDef::new("IFNULL", 2, NullHandling),
    FunctionDef::new("BIT_COUNT", 1, Bit),
    FunctionDef::new("BIT_LENGTH", 1, Bit),
    FunctionDef::new("IF", 3, ControlFlow),
];

pub static AGGREGATE_FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("MAX", 1, Aggregate),
    FunctionDef::new("MIN", 1, Aggregate),
    FunctionDef::new("AVG", 1, Aggregate),
    FunctionDef::new("COUNT", 1, Aggregate),
    FunctionDef::new("STRING_AGG", 1, Aggregate),
    FunctionDef::new("FIRST", 1, Aggregate),
    FunctionDef::new("SUM", 1, Aggregate),
    FunctionDef::new("STDDEV_SAMP", 1, Aggregate),
    FunctionDef::new("STDDEV_POP", 1, Aggregate),
    FunctionDef::new("VAR_POP", 1, Aggregate),
    FunctionDef::new("VAR_SAMP", 1, Aggregate),
    FunctionDef::new("COVAR_POP", 1, Aggregate),
    FunctionDef::new("COVAR_SAMP", 1, Aggregate),
];

/// Look up any catalog function by name.
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    SCALAR_FUNCTIONS
        .iter()
        .chain(AGGREGATE_FUNCTIONS)
        .find(|f| f.name == name)
}

/// Look up an aggregate by name.
pub fn aggregate(name: &str) -> Option<&'static FunctionDef> {
    lookup(name).filter(|f| f.is_aggregate())
}
