use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Open,
    InProgress,
    Finished,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub sae_code: String,
    pub internal_code: String,
    pub name: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: i64,
    pub emp_code: String,
    pub name: String,
    pub hourly_rate: f64,
    pub overtime_rate: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourType {
    Normal,
    Extra,
}

impl HourType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Extra => "extra",
        }
    }
}

/// Save-ready labor transaction proposed by the hours parser.
#[derive(Debug, Clone)]
pub struct HourCandidate {
    pub project_id: i64,
    pub employee_id: i64,
    pub date: NaiveDate,
    pub week: u32,
    pub hours: f64,
    pub rate: f64,
    pub cost: f64,
    pub hour_type: HourType,
}

/// Save-ready material transaction proposed by the SAE parser.
#[derive(Debug, Clone)]
pub struct MaterialCandidate {
    pub project_id: i64,
    pub part_number: String,
    pub description: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub amount: f64,
    pub date: NaiveDate,
    pub source_sheet: String,
}

#[derive(Debug, Clone)]
pub enum Candidate {
    Hours(HourCandidate),
    Material(MaterialCandidate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MismatchKind {
    UnresolvedEmployee,
    UnresolvedProject,
    ProjectFinished,
}

impl MismatchKind {
    /// Finished-project notices are advisory; there is nothing to correct.
    pub fn is_correctable(&self) -> bool {
        !matches!(self, Self::ProjectFinished)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnresolvedEmployee => "unresolved employee",
            Self::UnresolvedProject => "unresolved project",
            Self::ProjectFinished => "project finished",
        }
    }
}

/// One populated hours cell captured from a row whose employee id failed to
/// resolve. Enough to rebuild the transaction once the employee is known.
#[derive(Debug, Clone)]
pub struct HourCellContext {
    pub project_id: i64,
    pub date: NaiveDate,
    pub week: u32,
    pub hours: f64,
}

/// Carries the resolved half of a mismatched row so a correction can
/// reconstruct the full transaction without re-reading the file.
#[derive(Debug, Clone)]
pub enum RecoveredContext {
    /// Whole-row employee mismatch: every cell whose project resolved.
    HoursRow { cells: Vec<HourCellContext> },
    /// Single-cell project mismatch inside an otherwise-resolved row.
    HoursCell {
        employee_id: i64,
        date: NaiveDate,
        week: u32,
        hours: f64,
    },
    /// Material row whose project token failed to resolve.
    MaterialRow {
        part_number: String,
        description: String,
        quantity: f64,
        unit_cost: f64,
        amount: f64,
        date: NaiveDate,
    },
    /// Informational mismatches carry nothing to reconstruct.
    None,
}

#[derive(Debug, Clone)]
pub struct Mismatch {
    pub row: usize,
    pub kind: MismatchKind,
    pub raw_value: String,
    pub sheet: Option<String>,
    pub context: RecoveredContext,
}

/// Partitioned parser output: what can be committed as-is, and what needs a
/// human decision first.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub candidates: Vec<Candidate>,
    pub mismatches: Vec<Mismatch>,
}

impl ParseResult {
    pub fn push_hours(&mut self, c: HourCandidate) {
        self.candidates.push(Candidate::Hours(c));
    }

    pub fn push_material(&mut self, c: MaterialCandidate) {
        self.candidates.push(Candidate::Material(c));
    }
}
