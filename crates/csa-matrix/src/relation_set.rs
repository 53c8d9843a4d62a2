//! # Additional-Measure Relation Set
//!
//! User-declared measures for one scope, the sub-clauses each one is marked
//! applicable to, and the assessment entry for every such relation.
//!
//! ## Invariant
//!
//! The set of assessment entries is exactly the set of active relations.
//! Both are the same map here: a relation *is* a key of `entries`, and its
//! evaluation is the value. Removing a relation removes its entry in the
//! same step, and a relation cannot exist without one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use csa_core::{AdditionalMeasureId, Evaluation, FieldUpdate, SubclauseId};

use crate::error::MatrixError;
use crate::matrix::{MatrixScope, Progress};
use crate::measure::AdditionalMeasure;

// ─── Keys and Entries ────────────────────────────────────────────────

/// `(additional measure, sub-clause)`: existence means "applicable".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaCellKey {
    pub measure_id: AdditionalMeasureId,
    pub subclause_id: SubclauseId,
}

impl MaCellKey {
    pub fn new(measure_id: AdditionalMeasureId, subclause_id: SubclauseId) -> Self {
        Self {
            measure_id,
            subclause_id,
        }
    }
}

impl std::fmt::Display for MaCellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.measure_id, self.subclause_id)
    }
}

/// Assessment of one additional measure against one sub-clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaAssessment {
    pub measure_id: AdditionalMeasureId,
    pub subclause_id: SubclauseId,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

impl MaAssessment {
    pub fn key(&self) -> MaCellKey {
        MaCellKey::new(self.measure_id, self.subclause_id.clone())
    }
}

// ─── Toggle Outcome ──────────────────────────────────────────────────

/// What a toggle actually did. Callers must update local state from this
/// value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ToggleFlags", from = "ToggleFlags")]
pub enum ToggleOutcome {
    /// The relation was absent and has been created.
    Added,
    /// The relation was present and has been deleted.
    Removed,
    /// Nothing changed (the store interaction failed).
    Unchanged,
}

impl ToggleOutcome {
    pub fn added(&self) -> bool {
        matches!(self, Self::Added)
    }

    pub fn removed(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// Wire form of [`ToggleOutcome`]: `{"added": bool, "removed": bool}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleFlags {
    pub added: bool,
    pub removed: bool,
}

impl From<ToggleOutcome> for ToggleFlags {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            added: outcome.added(),
            removed: outcome.removed(),
        }
    }
}

impl From<ToggleFlags> for ToggleOutcome {
    fn from(flags: ToggleFlags) -> Self {
        match (flags.added, flags.removed) {
            (true, false) => Self::Added,
            (false, true) => Self::Removed,
            _ => Self::Unchanged,
        }
    }
}

// ─── Relation Set ────────────────────────────────────────────────────

/// Additional measures, relations and MA assessments for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalMeasureRelationSet {
    scope: MatrixScope,
    measures: Vec<AdditionalMeasure>,
    entries: BTreeMap<MaCellKey, Evaluation>,
}

impl AdditionalMeasureRelationSet {
    pub fn new(scope: MatrixScope) -> Self {
        Self {
            scope,
            measures: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Rebuild from stored parts.
    ///
    /// Every relation of a known measure gets an entry, taking its stored
    /// evaluation when one exists. Assessments without a relation and
    /// relations of unknown measures are dropped.
    pub fn from_parts(
        scope: MatrixScope,
        measures: Vec<AdditionalMeasure>,
        relations: Vec<MaCellKey>,
        assessments: Vec<MaAssessment>,
    ) -> Self {
        let mut stored: BTreeMap<MaCellKey, Evaluation> = assessments
            .into_iter()
            .map(|a| (a.key(), a.evaluation))
            .collect();
        let mut entries = BTreeMap::new();
        for key in relations {
            if !measures.iter().any(|m| m.id == key.measure_id) {
                continue;
            }
            let evaluation = stored.remove(&key).unwrap_or_default();
            entries.insert(key, evaluation);
        }
        if !stored.is_empty() {
            tracing::debug!(
                scope = %scope,
                orphans = stored.len(),
                "dropping MA assessments without an active relation"
            );
        }
        Self {
            scope,
            measures,
            entries,
        }
    }

    pub fn scope(&self) -> &MatrixScope {
        &self.scope
    }

    /// Measures in creation order.
    pub fn measures(&self) -> &[AdditionalMeasure] {
        &self.measures
    }

    pub fn measure(&self, id: AdditionalMeasureId) -> Option<&AdditionalMeasure> {
        self.measures.iter().find(|m| m.id == id)
    }

    pub fn add_measure(&mut self, measure: AdditionalMeasure) {
        self.measures.push(measure);
    }

    /// Remove a measure with all of its relations and assessment entries.
    pub fn remove_measure(&mut self, id: AdditionalMeasureId) -> Option<AdditionalMeasure> {
        let index = self.measures.iter().position(|m| m.id == id)?;
        self.entries.retain(|k, _| k.measure_id != id);
        Some(self.measures.remove(index))
    }

    pub fn set_attachment(
        &mut self,
        id: AdditionalMeasureId,
        attachment: Option<String>,
    ) -> Result<(), MatrixError> {
        let measure = self
            .measures
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MatrixError::UnknownMeasure(id))?;
        measure.attachment = attachment;
        Ok(())
    }

    pub fn contains(&self, key: &MaCellKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Local toggle: add if absent, remove if present.
    pub fn toggle(&mut self, key: MaCellKey) -> Result<ToggleOutcome, MatrixError> {
        if self.measure(key.measure_id).is_none() {
            return Err(MatrixError::UnknownMeasure(key.measure_id));
        }
        let outcome = if self.contains(&key) {
            ToggleOutcome::Removed
        } else {
            ToggleOutcome::Added
        };
        self.apply_toggle(key, outcome);
        Ok(outcome)
    }

    /// Mirror a toggle that was performed against storage.
    pub fn apply_toggle(&mut self, key: MaCellKey, outcome: ToggleOutcome) {
        match outcome {
            ToggleOutcome::Added => {
                self.entries.entry(key).or_default();
            }
            ToggleOutcome::Removed => {
                self.entries.remove(&key);
            }
            ToggleOutcome::Unchanged => {}
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = &MaCellKey> {
        self.entries.keys()
    }

    pub fn relations_for(&self, id: AdditionalMeasureId) -> Vec<SubclauseId> {
        self.entries
            .keys()
            .filter(|k| k.measure_id == id)
            .map(|k| k.subclause_id.clone())
            .collect()
    }

    pub fn assessments(&self) -> Vec<MaAssessment> {
        self.entries
            .iter()
            .map(|(k, e)| MaAssessment {
                measure_id: k.measure_id,
                subclause_id: k.subclause_id.clone(),
                evaluation: *e,
            })
            .collect()
    }

    pub fn assessments_for(&self, id: AdditionalMeasureId) -> Vec<MaAssessment> {
        self.assessments()
            .into_iter()
            .filter(|a| a.measure_id == id)
            .collect()
    }

    pub fn set_field(&mut self, key: &MaCellKey, update: FieldUpdate) -> Result<(), MatrixError> {
        let evaluation = self
            .entries
            .get_mut(key)
            .ok_or_else(|| MatrixError::UnknownRelation {
                measure_id: key.measure_id,
                subclause_id: key.subclause_id.clone(),
            })?;
        evaluation.apply(update);
        Ok(())
    }

    /// Whether every MA entry has a maturity. An empty set is complete.
    pub fn is_complete(&self) -> bool {
        self.entries.values().all(Evaluation::is_completed)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.entries.values().filter(|e| e.is_completed()).count(),
            total: self.entries.len(),
        }
    }
}
