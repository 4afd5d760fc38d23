use std::collections::HashMap;

use crate::models::{Employee, Project};
use crate::normalize::normalize;

/// Immutable catalog snapshot with O(1) identifier lookups, built once per
/// upload session. Never rebuilt mid-parse: every row in one run must
/// resolve against the same catalog version.
pub struct Catalog {
    projects: Vec<Project>,
    employees: Vec<Employee>,
    by_sae: HashMap<String, usize>,
    by_internal: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    project_ids: HashMap<i64, usize>,
    by_emp_code: HashMap<String, usize>,
    employee_ids: HashMap<i64, usize>,
}

impl Catalog {
    pub fn new(projects: Vec<Project>, employees: Vec<Employee>) -> Self {
        let mut by_sae = HashMap::new();
        let mut by_internal = HashMap::new();
        let mut by_name = HashMap::new();
        let mut project_ids = HashMap::new();
        for (i, p) in projects.iter().enumerate() {
            by_sae.insert(normalize(&p.sae_code), i);
            by_internal.insert(normalize(&p.internal_code), i);
            by_name.insert(normalize(&p.name), i);
            project_ids.insert(p.id, i);
        }

        let mut by_emp_code = HashMap::new();
        let mut employee_ids = HashMap::new();
        for (i, e) in employees.iter().enumerate() {
            if !e.active {
                continue;
            }
            by_emp_code.insert(normalize(&e.emp_code), i);
            employee_ids.insert(e.id, i);
        }

        Self {
            projects,
            employees,
            by_sae,
            by_internal,
            by_name,
            project_ids,
            by_emp_code,
            employee_ids,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn project_by_id(&self, id: i64) -> Option<&Project> {
        self.project_ids.get(&id).map(|&i| &self.projects[i])
    }

    pub fn employee_by_id(&self, id: i64) -> Option<&Employee> {
        self.employee_ids.get(&id).map(|&i| &self.employees[i])
    }

    /// Employee lookup by the raw id string from column A.
    pub fn employee(&self, raw: &str) -> Option<&Employee> {
        self.by_emp_code
            .get(&normalize(raw))
            .map(|&i| &self.employees[i])
    }

    /// Hours-grid resolution order: SAE code, then internal code.
    pub fn project_by_code(&self, token: &str) -> Option<&Project> {
        let key = normalize(token);
        self.by_sae
            .get(&key)
            .or_else(|| self.by_internal.get(&key))
            .map(|&i| &self.projects[i])
    }

    /// Materials resolution order: SAE code, internal code, project name,
    /// then a retry with a leading "PR"/"PR-" prefix stripped.
    pub fn resolve_material_token(&self, token: &str) -> Option<&Project> {
        let key = normalize(token);
        if let Some(&i) = self
            .by_sae
            .get(&key)
            .or_else(|| self.by_internal.get(&key))
            .or_else(|| self.by_name.get(&key))
        {
            return Some(&self.projects[i]);
        }
        let stripped = key
            .strip_prefix("PR-")
            .or_else(|| key.strip_prefix("PR"))?;
        self.by_sae
            .get(stripped)
            .or_else(|| self.by_internal.get(stripped))
            .map(|&i| &self.projects[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;

    pub fn sample_projects() -> Vec<Project> {
        vec![
            Project {
                id: 1,
                sae_code: "25-046-00".into(),
                internal_code: "PR100".into(),
                name: "Nave industrial López".into(),
                status: ProjectStatus::Open,
            },
            Project {
                id: 2,
                sae_code: "24-012-00".into(),
                internal_code: "PR-200".into(),
                name: "Bodega Querétaro".into(),
                status: ProjectStatus::Finished,
            },
        ]
    }

    pub fn sample_employees() -> Vec<Employee> {
        vec![
            Employee {
                id: 10,
                emp_code: "E1".into(),
                name: "José Peña".into(),
                hourly_rate: 80.0,
                overtime_rate: 120.0,
                active: true,
            },
            Employee {
                id: 11,
                emp_code: "E2".into(),
                name: "Ana Ruiz".into(),
                hourly_rate: 95.0,
                overtime_rate: 140.0,
                active: false,
            },
        ]
    }

    fn catalog() -> Catalog {
        Catalog::new(sample_projects(), sample_employees())
    }

    #[test]
    fn test_lookups_are_normalized() {
        let cat = catalog();
        assert_eq!(cat.project_by_code(" pr100 ").unwrap().id, 1);
        assert_eq!(cat.project_by_code("25-046-00").unwrap().id, 1);
        assert_eq!(cat.employee("  e1 ").unwrap().id, 10);
    }

    #[test]
    fn test_inactive_employees_do_not_resolve() {
        let cat = catalog();
        assert!(cat.employee("E2").is_none());
        assert!(cat.employee_by_id(11).is_none());
    }

    #[test]
    fn test_material_token_name_and_prefix_fallback() {
        let cat = catalog();
        // Accent-insensitive name match
        assert_eq!(
            cat.resolve_material_token("nave industrial lopez").unwrap().id,
            1
        );
        // "PR" prefix stripped and retried against SAE codes
        assert_eq!(cat.resolve_material_token("PR25-046-00").unwrap().id, 1);
        assert_eq!(cat.resolve_material_token("PR-24-012-00").unwrap().id, 2);
        assert!(cat.resolve_material_token("PR999").is_none());
    }

    #[test]
    fn test_hours_resolution_skips_name_map() {
        let cat = catalog();
        assert!(cat.project_by_code("Nave industrial López").is_none());
    }
}
