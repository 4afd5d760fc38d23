use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::Catalog;
use crate::error::{MargenError, Result};
use crate::models::{
    Candidate, HourCandidate, HourType, MaterialCandidate, Mismatch, MismatchKind, ParseResult,
    ProjectStatus, RecoveredContext,
};
use crate::normalize::normalize;

/// The unit of correction: all mismatch rows sharing one unresolved
/// `(kind, raw value)` pair. One decision resolves every row in the group.
pub type GroupKey = (MismatchKind, String);

pub fn group_key(m: &Mismatch) -> GroupKey {
    (m.kind, normalize(&m.raw_value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Correct(i64),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub kind: MismatchKind,
    pub raw_value: String,
    pub rows: usize,
    pub decision: Option<Decision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Parsed,
    Correcting,
    Saving,
    Committed,
}

/// Accepts one batch of validated transactions. The engine issues exactly
/// one call per successful save; partial retry is the sink's business.
pub trait TransactionSink {
    fn submit(&mut self, batch: &[Candidate]) -> Result<()>;
}

#[derive(Debug)]
pub struct SaveOutcome {
    pub committed: usize,
    pub message: String,
}

/// One upload session: parser output held in memory through the correction
/// loop, consumed exactly once by a successful save. Nothing here persists
/// across sessions.
pub struct Session {
    state: SessionState,
    candidates: Vec<Candidate>,
    mismatches: Vec<Mismatch>,
    corrections: HashMap<GroupKey, i64>,
    ignored: HashSet<GroupKey>,
}

impl Session {
    pub fn new(result: ParseResult) -> Self {
        let mut session = Self {
            state: SessionState::Parsed,
            candidates: result.candidates,
            mismatches: result.mismatches,
            corrections: HashMap::new(),
            ignored: HashSet::new(),
        };
        if session.unresolved() > 0 {
            session.state = SessionState::Correcting;
        }
        session
    }

    /// Mismatch groups in stable (kind, key) order, informational last.
    pub fn groups(&self) -> Vec<GroupSummary> {
        let mut map: BTreeMap<GroupKey, GroupSummary> = BTreeMap::new();
        for m in &self.mismatches {
            let key = group_key(m);
            let entry = map.entry(key.clone()).or_insert_with(|| GroupSummary {
                kind: m.kind,
                raw_value: m.raw_value.clone(),
                rows: 0,
                decision: self.decision(&key),
            });
            entry.rows += 1;
        }
        let mut groups: Vec<GroupSummary> = map.into_values().collect();
        groups.sort_by_key(|g| (!g.kind.is_correctable(), g.kind, g.raw_value.clone()));
        groups
    }

    pub fn decision(&self, key: &GroupKey) -> Option<Decision> {
        if let Some(&id) = self.corrections.get(key) {
            return Some(Decision::Correct(id));
        }
        if self.ignored.contains(key) {
            return Some(Decision::Ignore);
        }
        None
    }

    /// Correctable groups that still lack both a correction and an ignore
    /// decision. Save is rejected while this is non-zero.
    pub fn unresolved(&self) -> usize {
        self.groups()
            .iter()
            .filter(|g| g.kind.is_correctable() && g.decision.is_none())
            .count()
    }

    /// Record a correction for a group. Validates the chosen id against the
    /// catalog and clears any previous ignore decision for the same group.
    pub fn set_correction(
        &mut self,
        kind: MismatchKind,
        raw_value: &str,
        id: i64,
        catalog: &Catalog,
    ) -> Result<()> {
        if !kind.is_correctable() {
            return Err(MargenError::Validation(format!(
                "\"{raw_value}\" is a finished-project notice; it cannot be corrected"
            )));
        }
        match kind {
            MismatchKind::UnresolvedEmployee => {
                if catalog.employee_by_id(id).is_none() {
                    return Err(MargenError::UnknownEmployee(id.to_string()));
                }
            }
            MismatchKind::UnresolvedProject => match catalog.project_by_id(id) {
                None => return Err(MargenError::UnknownProject(id.to_string())),
                Some(p) if p.status == ProjectStatus::Finished => {
                    return Err(MargenError::Validation(format!(
                        "project {} is finished; costs can no longer be posted to it",
                        p.name
                    )))
                }
                Some(_) => {}
            },
            MismatchKind::ProjectFinished => unreachable!(),
        }
        let key = (kind, normalize(raw_value));
        self.ignored.remove(&key);
        self.corrections.insert(key, id);
        Ok(())
    }

    /// Drop every row of a group instead of correcting it. Clears any
    /// previous correction; the two decisions are mutually exclusive.
    pub fn set_ignore(&mut self, kind: MismatchKind, raw_value: &str) {
        let key = (kind, normalize(raw_value));
        self.corrections.remove(&key);
        self.ignored.insert(key);
    }

    /// Rebuild full transactions from corrected mismatches. Rates come fresh
    /// from the catalog at save time, never from values captured at parse.
    fn reconstruct(&self, catalog: &Catalog) -> Result<Vec<Candidate>> {
        let mut rebuilt = Vec::new();
        for m in &self.mismatches {
            if !m.kind.is_correctable() {
                continue;
            }
            let key = group_key(m);
            if self.ignored.contains(&key) {
                continue;
            }
            let Some(&id) = self.corrections.get(&key) else {
                continue;
            };
            match &m.context {
                RecoveredContext::HoursRow { cells } => {
                    let employee = catalog
                        .employee_by_id(id)
                        .ok_or_else(|| MargenError::UnknownEmployee(id.to_string()))?;
                    for cell in cells {
                        rebuilt.push(Candidate::Hours(HourCandidate {
                            project_id: cell.project_id,
                            employee_id: employee.id,
                            date: cell.date,
                            week: cell.week,
                            hours: cell.hours,
                            rate: employee.hourly_rate,
                            cost: cell.hours * employee.hourly_rate,
                            hour_type: HourType::Normal,
                        }));
                    }
                }
                RecoveredContext::HoursCell {
                    employee_id,
                    date,
                    week,
                    hours,
                } => {
                    let employee = catalog
                        .employee_by_id(*employee_id)
                        .ok_or_else(|| MargenError::UnknownEmployee(employee_id.to_string()))?;
                    rebuilt.push(Candidate::Hours(HourCandidate {
                        project_id: id,
                        employee_id: employee.id,
                        date: *date,
                        week: *week,
                        hours: *hours,
                        rate: employee.hourly_rate,
                        cost: hours * employee.hourly_rate,
                        hour_type: HourType::Normal,
                    }));
                }
                RecoveredContext::MaterialRow {
                    part_number,
                    description,
                    quantity,
                    unit_cost,
                    amount,
                    date,
                } => rebuilt.push(Candidate::Material(MaterialCandidate {
                    project_id: id,
                    part_number: part_number.clone(),
                    description: description.clone(),
                    quantity: *quantity,
                    unit_cost: *unit_cost,
                    amount: *amount,
                    date: *date,
                    source_sheet: m.sheet.clone().unwrap_or_default(),
                })),
                RecoveredContext::None => {}
            }
        }
        Ok(rebuilt)
    }

    /// The batch a save would submit right now: parser candidates plus
    /// reconstructions for every corrected group.
    pub fn preview(&self, catalog: &Catalog) -> Result<Vec<Candidate>> {
        let mut batch = self.candidates.clone();
        batch.extend(self.reconstruct(catalog)?);
        Ok(batch)
    }

    /// Build the final batch and submit it in one all-or-nothing call. A
    /// sink failure returns the session to `Correcting` with every decision
    /// intact, so save can be retried without re-parsing. A committed
    /// session rejects further saves; its batch must post at most once.
    pub fn save(
        &mut self,
        catalog: &Catalog,
        sink: &mut dyn TransactionSink,
    ) -> Result<SaveOutcome> {
        if self.state == SessionState::Committed {
            return Err(MargenError::Validation(
                "session already committed; re-parse the file to import it again".to_string(),
            ));
        }

        let pending = self.unresolved();
        if pending > 0 {
            return Err(MargenError::Validation(format!(
                "{pending} mismatch group(s) still need a correction or an ignore decision"
            )));
        }

        self.state = SessionState::Saving;
        let mut batch = self.candidates.clone();
        match self.reconstruct(catalog) {
            Ok(rebuilt) => batch.extend(rebuilt),
            Err(e) => {
                self.state = SessionState::Correcting;
                return Err(e);
            }
        }

        if batch.is_empty() {
            self.state = SessionState::Committed;
            return Ok(SaveOutcome {
                committed: 0,
                message: "nothing to commit; no transactions were produced".to_string(),
            });
        }

        match sink.submit(&batch) {
            Ok(()) => {
                self.state = SessionState::Committed;
                Ok(SaveOutcome {
                    committed: batch.len(),
                    message: format!("{} transaction(s) committed", batch.len()),
                })
            }
            Err(e) => {
                self.state = SessionState::Correcting;
                Err(e)
            }
        }
    }
}
