//! Runs several oracles back to back.

use strum::IntoEnumIterator;

use super::{AggregateOracle, Oracle, TlpOracle, TlpVariant};
use crate::context::Context;
use crate::error::CheckError;
use crate::executor::StatementExecutor;
use crate::generate::Generator;

pub struct CompositeOracle {
    oracles: Vec<Box<dyn Oracle>>,
}

impl CompositeOracle {
    pub fn new(oracles: Vec<Box<dyn Oracle>>) -> Self {
        Self { oracles }
    }

    /// Every partitioning clause position plus the aggregate variant.
    pub fn query_partitioning() -> Self {
        let mut oracles: Vec<Box<dyn Oracle>> = TlpVariant::iter()
            .map(|v| Box::new(TlpOracle::new(v)) as Box<dyn Oracle>)
            .collect();
        oracles.push(Box::new(AggregateOracle));
        Self::new(oracles)
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl Oracle for CompositeOracle {
    fn name(&self) -> &'static str {
        "TLP"
    }

    /// Stops at the first reportable failure. Checks that only ended in an
    /// expected error or an abort do not stop the sequence; if no check
    /// passed, the first of those is returned.
    fn check(
        &mut self,
        ctx: &mut Context,
        g: &Generator<'_>,
        exec: &mut dyn StatementExecutor,
    ) -> Result<(), CheckError> {
        let mut first_skip = None;
        let mut passed = false;
        for oracle in &mut self.oracles {
            match oracle.check(ctx, g, exec) {
                Ok(()) => passed = true,
                Err(e) if e.is_reportable() => return Err(e),
                Err(e) => {
                    tracing::trace!("{} skipped: {e}", oracle.name());
                    first_skip.get_or_insert(e);
                }
            }
        }
        match first_skip {
            Some(e) if !passed => Err(e),
            _ => Ok(()),
        }
    }
}
