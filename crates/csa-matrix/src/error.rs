use csa_core::{AdditionalMeasureId, MeasureCode, SubclauseId};
use thiserror::Error;

/// Misuse of a matrix or relation set by its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// `set_field` addressed a guide-measure cell that is not in the matrix.
    #[error("no assessment cell for ({measure_code}, {subclause_id})")]
    UnknownCell {
        measure_code: MeasureCode,
        subclause_id: SubclauseId,
    },

    /// An MA edit addressed a relation that is not active.
    #[error("no active relation for ({measure_id}, {subclause_id})")]
    UnknownRelation {
        measure_id: AdditionalMeasureId,
        subclause_id: SubclauseId,
    },

    /// The additional measure is not part of this scope.
    #[error("additional measure {0} not found in scope")]
    UnknownMeasure(AdditionalMeasureId),
}
