//! System prompts bundled at compile time, one per stage.

/// Mission Analyst - classifies scope, domain, and effort
pub const MISSION_ANALYST: &str = include_str!("defaults/mission_analyst.md");

/// Milestone Planner - orders phases and dates their deadlines
pub const MILESTONE_PLANNER: &str = include_str!("defaults/milestone_planner.md");

/// Task Planner - breaks milestones into estimated tasks
pub const TASK_PLANNER: &str = include_str!("defaults/task_planner.md");

/// Resource Planner - staffs and prices the work
pub const RESOURCE_PLANNER: &str = include_str!("defaults/resource_planner.md");

/// All prompts with their slugs.
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("mission_analyst", MISSION_ANALYST),
        ("milestone_planner", MILESTONE_PLANNER),
        ("task_planner", TASK_PLANNER),
        ("resource_planner", RESOURCE_PLANNER),
    ]
}
