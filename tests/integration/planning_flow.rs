use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use taskplan_core::{
    ConflictType, DayOrganization, DayPeriod, GeneratePlanUseCase, OverdueTaskHandling,
    PlannerInput, PlannerOutput, PlannerResult, PrioritizationStrategy, Priority,
    RecurrenceFrequency, RecurrencePlan, ResolutionOption, ScheduleScope, Subtask, Task, TimePlan,
    WorkHours,
};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date")
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(day).and_hms_opt(hour, minute, 0).expect("valid time")
}

/// Monday morning before work starts.
fn monday_morning() -> NaiveDateTime {
    at(3, 7, 30)
}

fn plan(input: PlannerInput) -> PlannerOutput {
    GeneratePlanUseCase::new().invoke(input).expect("planning run")
}

fn assert_no_double_booking(output: &PlannerOutput) {
    for (day, items) in &output.scheduled {
        for (idx, a) in items.iter().enumerate() {
            for b in items.iter().skip(idx + 1) {
                let overlapping = a.start < b.end && b.start < a.end;
                let both_timed = a.start < a.end && b.start < b.end;
                assert!(
                    !(overlapping && both_timed),
                    "{} and {} overlap on {day}",
                    a.task.id,
                    b.task.id
                );
            }
        }
    }
}

fn assert_covered(tasks: &[Task], output: &PlannerOutput) {
    let conflicted: HashSet<&str> = output
        .unresolved_conflicts
        .iter()
        .flat_map(|conflict| conflict.tasks.iter().map(|task| task.id.as_str()))
        .collect();
    let expired: HashSet<&str> = output
        .unresolved_expired
        .iter()
        .map(|item| item.task.id.as_str())
        .collect();
    let out_of_scope: HashSet<&str> = output.out_of_scope.iter().map(|t| t.id.as_str()).collect();

    for task in tasks {
        let id = task.id.as_str();
        let accounted = task.is_completed
            || output.is_scheduled(id)
            || conflicted.contains(id)
            || expired.contains(id)
            || out_of_scope.contains(id)
            || task.is_recurring();
        assert!(accounted, "task {id} disappeared from the plan");
    }
}

fn busy_week() -> Vec<Task> {
    vec![
        Task::new("standup", "Daily standup")
            .with_start(TimePlan::at(at(3, 9, 30)))
            .with_duration(15)
            .with_recurrence(RecurrencePlan::new(RecurrenceFrequency::Daily)),
        Task::new("review", "Design review")
            .with_priority(Priority::High)
            .with_start(TimePlan::at(at(4, 14, 0)))
            .with_end(TimePlan::at(at(4, 15, 30))),
        Task::new("gym", "Gym")
            .with_start(TimePlan::in_period(date(5), DayPeriod::Evening))
            .with_duration(60),
        Task::new("taxes", "Taxes")
            .with_priority(Priority::Medium)
            .with_end(TimePlan::on_date(date(6)))
            .with_subtasks(vec![
                Subtask {
                    id: "taxes-1".into(),
                    name: "collect receipts".into(),
                    estimated_minutes: Some(45),
                    is_completed: false,
                },
                Subtask {
                    id: "taxes-2".into(),
                    name: "fill form".into(),
                    estimated_minutes: Some(90),
                    is_completed: false,
                },
            ]),
        Task::new("read", "Read paper").with_duration(120),
        Task::new("errand", "Post office").with_start(TimePlan::on_date(date(7))),
        Task::new("done", "Already done").with_duration(30).completed(),
        Task::new("stale", "Forgotten")
            .with_end(TimePlan::at(at(1, 12, 0)))
            .with_duration(40),
    ]
}

#[test]
fn empty_input_produces_empty_plan() {
    let output = plan(PlannerInput::new(Vec::new(), monday_morning()));
    assert!(output.scheduled.is_empty());
    assert!(output.unresolved_expired.is_empty());
    assert!(output.unresolved_conflicts.is_empty());
}

#[test]
fn all_completed_input_schedules_nothing() {
    let tasks = vec![
        Task::new("a", "a")
            .with_start(TimePlan::at(at(3, 10, 0)))
            .completed(),
        Task::new("b", "b").with_duration(600).completed(),
        Task::new("c", "c")
            .with_end(TimePlan::at(at(1, 10, 0)))
            .completed(),
    ];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_scope(ScheduleScope::ThisWeek)
            .with_splitting(true),
    );
    assert!(output.scheduled.is_empty());
    assert!(output.unresolved_expired.is_empty());
}

#[test]
fn overlapping_fixed_tasks_produce_one_conflict_and_no_placement() {
    let tasks = vec![
        Task::new("x", "Call with bank")
            .with_start(TimePlan::at(at(3, 10, 0)))
            .with_end(TimePlan::at(at(3, 11, 0))),
        Task::new("y", "Dentist")
            .with_start(TimePlan::at(at(3, 10, 30)))
            .with_end(TimePlan::at(at(3, 11, 30))),
    ];
    let output = plan(PlannerInput::new(tasks, monday_morning()));

    let fixed: Vec<_> = output
        .unresolved_conflicts
        .iter()
        .filter(|conflict| conflict.conflict_type == ConflictType::FixedVsFixed)
        .collect();
    assert_eq!(fixed.len(), 1);
    assert!(fixed[0].involves("x") && fixed[0].involves("y"));
    assert!(!output.is_scheduled("x"));
    assert!(!output.is_scheduled("y"));
}

#[test]
fn oversized_task_without_splitting_is_a_no_slot_conflict() {
    let tasks = vec![Task::new("big", "Migrate archive").with_duration(600)];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_work_hours(WorkHours::new(9 * 60, 17 * 60))
            .with_splitting(false),
    );
    assert!(output.scheduled.is_empty());
    assert_eq!(output.unresolved_conflicts.len(), 1);
    assert_eq!(
        output.unresolved_conflicts[0].conflict_type,
        ConflictType::NoSlotInScope
    );
}

#[test]
fn oversized_task_with_splitting_spans_the_week() {
    let tasks = vec![Task::new("big", "Migrate archive").with_duration(600)];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_scope(ScheduleScope::ThisWeek)
            .with_work_hours(WorkHours::new(9 * 60, 17 * 60))
            .with_splitting(true),
    );
    let fragments = output.items_for("big");
    assert_eq!(fragments.len(), 2);
    assert_eq!(output.scheduled_minutes("big"), 600);
    assert!(output.unresolved_conflicts.is_empty());
    assert_no_double_booking(&output);
}

#[test]
fn busy_week_is_covered_without_double_booking() {
    let tasks = busy_week();
    let output = plan(
        PlannerInput::new(tasks.clone(), monday_morning())
            .with_scope(ScheduleScope::ThisWeek)
            .with_strategy(PrioritizationStrategy::EarlierDeadlinesFirst)
            .with_day_organization(DayOrganization::LooseScheduleBreaks)
            .with_overdue_handling(OverdueTaskHandling::ManageWhenFree),
    );

    assert_no_double_booking(&output);
    assert_covered(&tasks, &output);

    // Seven standups in a Monday-to-Sunday scope.
    assert_eq!(output.items_for("standup").len(), 7);
    assert!(output
        .items_for("gym")
        .iter()
        .all(|item| item.date == date(5) && item.start >= at(5, 12, 0)));
    assert!(output
        .items_for("taxes")
        .iter()
        .all(|item| item.end <= at(7, 0, 0)));
    assert_eq!(output.scheduled_minutes("taxes"), 135);
    assert!(output.is_scheduled("stale"));
    assert!(!output.is_scheduled("done"));
    assert_eq!(output.items_for("errand")[0].date, date(7));
}

#[test]
fn flexible_work_is_never_placed_in_the_past() {
    let tasks = vec![Task::new("later", "Write summary").with_duration(30)];
    let output = plan(PlannerInput::new(tasks, at(3, 13, 7)));
    assert_eq!(output.items_for("later")[0].start, at(3, 13, 7));
}

#[test]
fn postponed_overdue_task_outside_scope_is_unresolved() {
    let tasks = vec![Task::new("late", "Late invoice")
        .with_end(TimePlan::at(at(2, 17, 0)))
        .with_duration(30)];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_scope(ScheduleScope::Today)
            .with_overdue_handling(OverdueTaskHandling::PostponeToTomorrow),
    );
    assert_eq!(output.unresolved_expired.len(), 1);
    assert_eq!(
        output.unresolved_expired[0].policy,
        OverdueTaskHandling::PostponeToTomorrow
    );
    assert!(output.scheduled.is_empty());
}

#[test]
fn postponed_overdue_task_lands_tomorrow() {
    let tasks = vec![Task::new("late", "Late invoice")
        .with_end(TimePlan::at(at(2, 17, 0)))
        .with_duration(30)];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_scope(ScheduleScope::ThisWeek)
            .with_overdue_handling(OverdueTaskHandling::PostponeToTomorrow),
    );
    assert_eq!(output.items_for("late")[0].date, date(4));
}

#[test]
fn high_priority_first_orders_flexible_work() {
    let tasks = vec![
        Task::new("low", "Tidy desk")
            .with_priority(Priority::Low)
            .with_duration(60),
        Task::new("high", "Ship release")
            .with_priority(Priority::High)
            .with_duration(60),
    ];
    let output = plan(
        PlannerInput::new(tasks, monday_morning())
            .with_strategy(PrioritizationStrategy::HighPriorityFirst),
    );
    assert_eq!(output.items_for("high")[0].start, at(3, 9, 0));
    assert_eq!(output.items_for("low")[0].start, at(3, 10, 0));
}

#[test]
fn weekly_recurring_task_follows_selected_days() {
    let tasks = vec![Task::new("yoga", "Yoga")
        .with_start(TimePlan::at(at(3, 17, 0)))
        .with_duration(45)
        .with_recurrence(
            RecurrencePlan::new(RecurrenceFrequency::Weekly)
                .with_selected_days(vec![Weekday::Tue, Weekday::Sat]),
        )];
    let output = plan(PlannerInput::new(tasks, monday_morning()).with_scope(ScheduleScope::ThisWeek));
    let dates: Vec<NaiveDate> = output.items_for("yoga").iter().map(|i| i.date).collect();
    assert_eq!(dates, vec![date(4), date(8)]);
}

#[test]
fn resolution_feeds_back_into_next_run() -> PlannerResult<()> {
    let first = Task::new("x", "Call with bank")
        .with_start(TimePlan::at(at(3, 10, 0)))
        .with_end(TimePlan::at(at(3, 11, 0)));
    let second = Task::new("y", "Dentist")
        .with_start(TimePlan::at(at(3, 10, 30)))
        .with_end(TimePlan::at(at(3, 11, 30)));
    let output = GeneratePlanUseCase::new().invoke(PlannerInput::new(
        vec![first.clone(), second.clone()],
        monday_morning(),
    ))?;
    let conflict = &output.unresolved_conflicts[0];
    assert!(conflict
        .resolution_options()
        .contains(&ResolutionOption::MoveToNearestFree));

    let moved = ResolutionOption::MoveToNearestFree.apply(&second, date(3));
    let rerun = GeneratePlanUseCase::new().invoke(PlannerInput::new(
        vec![first, moved],
        monday_morning(),
    ))?;
    assert!(rerun.unresolved_conflicts.is_empty());
    assert_eq!(rerun.items_for("x")[0].start, at(3, 10, 0));
    assert_eq!(rerun.scheduled_minutes("y"), 60);
    assert_no_double_booking(&rerun);
    Ok(())
}

#[test]
fn summary_counts_match_output() {
    let output = plan(
        PlannerInput::new(busy_week(), monday_morning()).with_scope(ScheduleScope::ThisWeek),
    );
    let summary = output.summary();
    assert_eq!(summary.scheduled_items, output.items().count());
    assert_eq!(summary.conflicts, output.unresolved_conflicts.len());
    assert!(summary.scheduled_tasks <= summary.scheduled_items);
}

#[tokio::test]
async fn async_entry_matches_sync_result() -> PlannerResult<()> {
    let input = PlannerInput::new(busy_week(), monday_morning()).with_scope(ScheduleScope::ThisWeek);
    let sync = GeneratePlanUseCase::new().invoke(input.clone())?;
    let asynchronous = GeneratePlanUseCase::new().invoke_async(input).await?;
    assert_eq!(sync.scheduled, asynchronous.scheduled);
    assert_eq!(sync.unresolved_conflicts, asynchronous.unresolved_conflicts);
    assert_ne!(sync.session_id, asynchronous.session_id);
    Ok(())
}
