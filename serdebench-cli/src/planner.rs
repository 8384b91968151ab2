//! Unit Planner
//!
//! Selects the units to run by regex over their ids and by group. Units keep
//! their registration order (source file, then line), so a suite runs in the
//! order it was written.

use serdebench_core::UnitDef;

/// Units selected for a run
pub struct ExecutionPlan {
    /// Units in execution order
    pub units: Vec<&'static UnitDef>,
}

impl ExecutionPlan {
    /// Units grouped by `group`, groups in order of first appearance
    pub fn groups(&self) -> Vec<(&'static str, Vec<&'static UnitDef>)> {
        let mut groups: Vec<(&'static str, Vec<&'static UnitDef>)> = Vec::new();
        for unit in &self.units {
            match groups.iter_mut().find(|(g, _)| *g == unit.group) {
                Some((_, members)) => members.push(unit),
                None => groups.push((unit.group, vec![unit])),
            }
        }
        groups
    }
}

/// Build the execution plan from registered units
pub fn build_plan(
    units: impl IntoIterator<Item = &'static UnitDef>,
    filter: Option<&regex::Regex>,
    group: Option<&str>,
) -> ExecutionPlan {
    let units = units
        .into_iter()
        .filter(|u| filter.map_or(true, |re| re.is_match(u.id)))
        .filter(|u| group.map_or(true, |g| u.group == g))
        .collect();

    ExecutionPlan { units }
}
