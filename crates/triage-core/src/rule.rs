//! Rule contract consumed by the decision engine.

use crate::decision::Decision;
use crate::error::RuleError;
use crate::record::RunRecord;

/// One independent decision criterion.
///
/// Rules receive the record read-only and must be deterministic: identical
/// record contents always yield the identical verdict. Returning `Ok(None)`
/// defers to the next rule; returning a decision is decisive.
pub trait Rule: Send + Sync {
    /// Name recorded in decision provenance.
    fn name(&self) -> &str;

    fn evaluate(&self, record: &RunRecord) -> Result<Option<Decision>, RuleError>;
}
