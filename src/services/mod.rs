pub mod conflict_resolution;
pub mod overdue_task_handler;
pub mod planning_service;
pub mod recurrence_expander;
pub mod rrule_parser;
pub mod schedule_utils;
pub mod settings_service;
pub mod task_categorizer;
pub mod task_placer;
pub mod task_prioritizer;
pub mod timeline_manager;
