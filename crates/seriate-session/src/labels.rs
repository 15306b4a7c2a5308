// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{SeriateError, Verdict};

/// Per-cluster verdicts, indexed by cluster id.
///
/// The array grows whenever the id space grows; it never shrinks, so a
/// verdict attached before a split stays with the surviving id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelStore {
    verdicts: Vec<Verdict>,
}

impl LabelStore {
    pub fn new(num_cluster_ids: usize) -> Self {
        Self {
            verdicts: vec![Verdict::Unset; num_cluster_ids],
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Ids never explicitly set read back as `Unset`.
    pub fn get(&self, cluster_id: usize) -> Verdict {
        self.verdicts
            .get(cluster_id)
            .copied()
            .unwrap_or(Verdict::Unset)
    }

    pub fn set(&mut self, cluster_id: usize, value: bool) -> Result<(), SeriateError> {
        let len = self.verdicts.len();
        let slot = self.verdicts.get_mut(cluster_id).ok_or_else(|| {
            SeriateError::not_found(format!(
                "cluster {cluster_id} is outside the {len} known cluster ids"
            ))
        })?;
        *slot = Verdict::from_bool(value);
        Ok(())
    }

    /// Extends the array with `Unset` entries; shrinking is never allowed.
    pub fn grow(&mut self, new_len: usize) {
        if new_len > self.verdicts.len() {
            self.verdicts.resize(new_len, Verdict::Unset);
        }
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Projects cluster verdicts back onto original ids. Rows removed by the
    /// filters get `None`, which is distinct from an `Unset` verdict.
    pub fn project_to_original(
        &self,
        assignments: &[usize],
        active_to_original: &[usize],
        original_len: usize,
    ) -> Vec<Option<Verdict>> {
        let mut projected = vec![None; original_len];
        for (&cluster_id, &original_id) in assignments.iter().zip(active_to_original.iter()) {
            if original_id < original_len {
                projected[original_id] = Some(self.get(cluster_id));
            }
        }
        projected
    }
}
