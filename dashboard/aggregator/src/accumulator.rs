use crate::columns::Issue;
use dashboard_model::prelude::{DashboardData, ProjectInfo, TOP_PROJECTS};
use std::collections::{BTreeMap, HashMap};

pub const CRITICAL: &str = "critical";
pub const HIGH: &str = "high";
pub const FIXABLE: &str = "fixable";

/// Bucket of issues when the export carries no environment column.
pub const NO_ENVIRONMENT_COLUMN: &str = "N/A";
/// Bucket of issues without any environment.
pub const UNDEFINED_ENVIRONMENT: &str = "undefined";

/// Running totals of a single export, folded row by row.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    by_severity: BTreeMap<String, u64>,
    by_environment: BTreeMap<String, u64>,
    fixable_critical: u64,
    /// Projects in order of first appearance.
    projects: Vec<ProjectInfo>,
    index: HashMap<String, usize>,
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

fn increment(map: &mut BTreeMap<String, u64>, key: &str) {
    match map.get_mut(key) {
        Some(count) => *count += 1,
        None => {
            map.insert(key.to_string(), 1);
        }
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single issue to the totals.
    pub fn apply(mut self, issue: Issue<'_>) -> Self {
        let severity = normalize(issue.severity);
        if !severity.is_empty() {
            increment(&mut self.by_severity, &severity);
        }

        match issue.environments {
            None => increment(&mut self.by_environment, NO_ENVIRONMENT_COLUMN),
            Some(environments) => {
                let mut found = false;
                for environment in environments.split(',').map(str::trim).filter(|env| !env.is_empty()) {
                    increment(&mut self.by_environment, environment);
                    found = true;
                }
                if !found {
                    increment(&mut self.by_environment, UNDEFINED_ENVIRONMENT);
                }
            }
        }

        let critical = severity == CRITICAL;
        if critical && issue.fixability.map(normalize).as_deref() == Some(FIXABLE) {
            self.fixable_critical += 1;
        }

        let project = self.project(issue.project.trim());
        if critical {
            project.critical_issue_count += 1;
        } else if severity == HIGH {
            project.high_issue_count += 1;
        }

        self
    }

    fn project(&mut self, name: &str) -> &mut ProjectInfo {
        let idx = match self.index.get(name) {
            Some(idx) => *idx,
            None => {
                self.projects.push(ProjectInfo::new(name));
                self.index.insert(name.to_string(), self.projects.len() - 1);
                self.projects.len() - 1
            }
        };
        &mut self.projects[idx]
    }

    /// Rank the projects and produce the dashboard data.
    pub fn finish(self) -> DashboardData {
        let mut projects = self.projects;
        // stable, so equal projects keep the order of their first appearance
        projects.sort_by(|a, b| {
            b.critical_issue_count
                .cmp(&a.critical_issue_count)
                .then(b.high_issue_count.cmp(&a.high_issue_count))
        });
        projects.truncate(TOP_PROJECTS);

        DashboardData {
            issues_by_severity: self.by_severity,
            issues_by_environment: self.by_environment,
            fixable_critical_issues: self.fixable_critical,
            top_riskiest_projects: projects,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn issue<'a>(severity: &'a str, project: &'a str, environments: &'a str, fixability: &'a str) -> Issue<'a> {
        Issue {
            severity,
            project,
            environments: Some(environments),
            fixability: Some(fixability),
        }
    }

    #[test]
    fn severities_are_normalized() {
        let data = Accumulator::new()
            .apply(issue("Critical", "p", "", ""))
            .apply(issue(" critical ", "p", "", ""))
            .apply(issue("HIGH", "p", "", ""))
            .apply(issue("", "p", "", ""))
            .finish();

        assert_eq!(data.issues_by_severity, [("critical".into(), 2), ("high".into(), 1)].into());
        assert_eq!(data.top_riskiest_projects, vec![project("p", 2, 1)]);
    }

    #[test]
    fn environments() {
        let data = Accumulator::new()
            .apply(issue("low", "p", "frontend, backend", ""))
            .apply(issue("low", "p", "backend", ""))
            .apply(issue("low", "p", "", ""))
            .apply(issue("low", "p", " , ", ""))
            .finish();

        assert_eq!(
            data.issues_by_environment,
            [
                ("backend".into(), 2),
                ("frontend".into(), 1),
                (UNDEFINED_ENVIRONMENT.into(), 2)
            ]
            .into()
        );
    }

    #[test]
    fn missing_environment_column() {
        let data = Accumulator::new()
            .apply(Issue {
                severity: "low",
                project: "p",
                environments: None,
                fixability: None,
            })
            .apply(Issue {
                severity: "high",
                project: "q",
                environments: None,
                fixability: None,
            })
            .finish();

        assert_eq!(data.issues_by_environment, [(NO_ENVIRONMENT_COLUMN.into(), 2)].into());
    }

    #[test]
    fn fixable_critical() {
        let data = Accumulator::new()
            .apply(issue("critical", "p", "", "fixable"))
            .apply(issue("critical", "p", "", "Fixable"))
            .apply(issue("critical", "p", "", "not-fixable"))
            .apply(issue("high", "p", "", "fixable"))
            .apply(Issue {
                severity: "critical",
                project: "p",
                environments: None,
                fixability: None,
            })
            .finish();

        assert_eq!(data.fixable_critical_issues, 2);
    }

    fn project(name: &str, critical: u64, high: u64) -> ProjectInfo {
        ProjectInfo {
            name: name.into(),
            critical_issue_count: critical,
            high_issue_count: high,
        }
    }

    #[test]
    fn ranking() {
        let mut acc = Accumulator::new();
        for (severity, name) in [
            ("high", "a"),
            ("critical", "b"),
            ("high", "c"),
            ("high", "c"),
            ("critical", "d"),
            ("high", "d"),
            ("low", "e"),
            ("high", "f"),
            ("medium", "g"),
        ] {
            acc = acc.apply(issue(severity, name, "", ""));
        }
        let data = acc.finish();

        assert_eq!(
            data.top_riskiest_projects,
            vec![
                project("d", 1, 1),
                project("b", 1, 0),
                project("c", 0, 2),
                project("a", 0, 1),
                project("f", 0, 1),
            ]
        );
    }

    #[test]
    fn ties_keep_first_appearance() {
        let data = Accumulator::new()
            .apply(issue("critical", "z", "", ""))
            .apply(issue("critical", "a", "", ""))
            .apply(issue("critical", "m", "", ""))
            .finish();

        let names: Vec<_> = data.top_riskiest_projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn empty() {
        assert_eq!(Accumulator::new().finish(), DashboardData::default());
    }
}
