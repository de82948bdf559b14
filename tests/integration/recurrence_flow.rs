use chrono::{Datelike, NaiveDate, Weekday};
use taskplan_core::{
    GeneratePlanUseCase, PlannerInput, PlannerResult, RecurrenceExpander, RecurrenceFrequency,
    RecurrencePlan, ScheduleScope, Task, TimePlan,
};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[test]
fn last_friday_of_each_month() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("RRULE:FREQ=MONTHLY;BYDAY=-1FR")?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 1, 1), ymd(2025, 1, 1), ymd(2025, 6, 30));
    assert_eq!(
        dates,
        vec![
            ymd(2025, 1, 31),
            ymd(2025, 2, 28),
            ymd(2025, 3, 28),
            ymd(2025, 4, 25),
            ymd(2025, 5, 30),
            ymd(2025, 6, 27),
        ]
    );
    Ok(())
}

#[test]
fn set_position_picks_last_weekday_of_month() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1")?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 1, 1), ymd(2025, 1, 1), ymd(2025, 3, 31));
    assert_eq!(dates, vec![ymd(2025, 1, 31), ymd(2025, 2, 28), ymd(2025, 3, 31)]);
    Ok(())
}

#[test]
fn count_is_measured_from_the_anchor() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("FREQ=DAILY;COUNT=5")?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 3, 1), ymd(2025, 3, 3), ymd(2025, 3, 31));
    assert_eq!(dates, vec![ymd(2025, 3, 3), ymd(2025, 3, 4), ymd(2025, 3, 5)]);
    Ok(())
}

#[test]
fn until_date_is_inclusive() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250324")?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 3, 3), ymd(2025, 3, 1), ymd(2025, 4, 30));
    assert_eq!(
        dates,
        vec![ymd(2025, 3, 3), ymd(2025, 3, 10), ymd(2025, 3, 17), ymd(2025, 3, 24)]
    );
    Ok(())
}

#[test]
fn biweekly_rule_skips_alternate_weeks() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("FREQ=WEEKLY;INTERVAL=2;BYDAY=TU")?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 3, 3), ymd(2025, 3, 3), ymd(2025, 4, 6));
    assert_eq!(dates, vec![ymd(2025, 3, 4), ymd(2025, 3, 18), ymd(2025, 4, 1)]);
    Ok(())
}

#[test]
fn month_end_days_clamp_to_short_months() -> PlannerResult<()> {
    let plan = RecurrencePlan::new(RecurrenceFrequency::Monthly).with_days_of_month(vec![31])?;
    let dates =
        RecurrenceExpander::dates_between(&plan, ymd(2025, 1, 31), ymd(2025, 1, 1), ymd(2025, 4, 30));
    assert_eq!(
        dates,
        vec![ymd(2025, 1, 31), ymd(2025, 2, 28), ymd(2025, 3, 31), ymd(2025, 4, 30)]
    );
    Ok(())
}

#[test]
fn unbounded_rule_stays_inside_window() {
    let plan = RecurrencePlan::new(RecurrenceFrequency::Daily);
    let year = RecurrenceExpander::dates_between(
        &plan,
        ymd(2020, 1, 1),
        ymd(2025, 1, 1),
        ymd(2025, 12, 31),
    );
    assert_eq!(year.len(), 365);
    assert!(year.iter().all(|date| date.year() == 2025));

    let first_three: Vec<NaiveDate> =
        RecurrenceExpander::expand(&plan, ymd(2025, 1, 1), ymd(2025, 1, 1), ymd(9999, 12, 31))
            .take(3)
            .collect();
    assert_eq!(first_three, vec![ymd(2025, 1, 1), ymd(2025, 1, 2), ymd(2025, 1, 3)]);
}

#[test]
fn rrule_text_survives_a_round_trip() -> PlannerResult<()> {
    let plan = RecurrencePlan::from_rrule("FREQ=MONTHLY;INTERVAL=2;BYDAY=2TU")?;
    assert_eq!(plan.to_rrule()?, "FREQ=MONTHLY;INTERVAL=2;BYDAY=2TU");

    let weekly = RecurrencePlan::new(RecurrenceFrequency::Weekly)
        .with_selected_days(vec![Weekday::Mon, Weekday::Thu]);
    assert_eq!(weekly.to_rrule()?, "FREQ=WEEKLY;BYDAY=MO,TH");
    assert!(RecurrencePlan::new(RecurrenceFrequency::None).to_rrule().is_err());
    Ok(())
}

#[test]
fn recurring_task_from_rrule_is_planned_each_matching_day() -> PlannerResult<()> {
    let monday = ymd(2025, 3, 3);
    let plan = RecurrencePlan::from_rrule("FREQ=WEEKLY;BYDAY=MO,WE,FR")?;
    let task = Task::new("swim", "Swim")
        .with_start(TimePlan::at(monday.and_hms_opt(8, 0, 0).expect("time")))
        .with_duration(45)
        .with_recurrence(plan);

    let output = GeneratePlanUseCase::new().invoke(
        PlannerInput::new(vec![task], monday.and_hms_opt(7, 30, 0).expect("time"))
            .with_scope(ScheduleScope::ThisWeek),
    )?;
    let dates: Vec<NaiveDate> = output.items_for("swim").iter().map(|item| item.date).collect();
    assert_eq!(dates, vec![ymd(2025, 3, 3), ymd(2025, 3, 5), ymd(2025, 3, 7)]);
    assert!(output
        .items_for("swim")
        .iter()
        .all(|item| item.duration_minutes() == 45));
    Ok(())
}

#[test]
fn counted_recurrence_stops_inside_the_week() -> PlannerResult<()> {
    let monday = ymd(2025, 3, 3);
    let task = Task::new("pill", "Antibiotics")
        .with_start(TimePlan::at(monday.and_hms_opt(12, 0, 0).expect("time")))
        .with_duration(5)
        .with_recurrence(RecurrencePlan::new(RecurrenceFrequency::Daily).with_occurrences(2)?);

    let output = GeneratePlanUseCase::new().invoke(
        PlannerInput::new(vec![task], monday.and_hms_opt(7, 30, 0).expect("time"))
            .with_scope(ScheduleScope::ThisWeek),
    )?;
    assert_eq!(output.items_for("pill").len(), 2);
    Ok(())
}
