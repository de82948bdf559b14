use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use taskplan_core::services::settings_service::{
    load_settings, parse_settings, save_settings, PlannerSettingsUpdate, SettingsService,
};
use taskplan_core::utils::logger::init_logging;
use taskplan_core::{
    DayOrganization, GeneratePlanUseCase, PlacementTuning, PlannerError, PlannerInput,
    PlannerSettings, Priority, RecurrenceFrequency, RecurrencePlan, ScheduleScope, Subtask, Task,
    TimePlan, WorkHours, MAX_TASK_MINUTES,
};
use tempfile::tempdir;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 3)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

fn run(input: PlannerInput) -> Result<(), PlannerError> {
    GeneratePlanUseCase::new().invoke(input).map(|_| ())
}

#[test]
fn recurrence_with_count_and_until_is_rejected() {
    let until_then_count = RecurrencePlan::new(RecurrenceFrequency::Daily)
        .with_end_date(NaiveDate::from_ymd_opt(2025, 4, 1).expect("date"))
        .and_then(|plan| plan.with_occurrences(3));
    assert!(matches!(until_then_count, Err(PlannerError::Configuration { .. })));

    let from_text = RecurrencePlan::from_rrule("FREQ=DAILY;COUNT=3;UNTIL=20250401");
    assert!(matches!(from_text, Err(PlannerError::Configuration { .. })));
}

#[test]
fn zero_interval_is_rejected_on_every_path() {
    assert!(matches!(
        RecurrencePlan::new(RecurrenceFrequency::Weekly).with_interval(0),
        Err(PlannerError::Configuration { .. })
    ));
    assert!(RecurrencePlan::from_rrule("FREQ=WEEKLY;INTERVAL=0").is_err());

    // Deserialized plans skip the builder and are caught by input validation.
    let plan: RecurrencePlan = serde_json::from_value(json!({
        "frequency": "DAILY",
        "interval": 0,
        "intervalUnit": "DAY"
    }))
    .expect("plan deserializes");
    let task = Task::new("r", "repeat")
        .with_start(TimePlan::at(at(9, 0)))
        .with_recurrence(plan);
    let err = run(PlannerInput::new(vec![task], at(8, 0))).expect_err("invalid interval");
    assert!(matches!(err, PlannerError::Configuration { .. }));
}

#[test]
fn malformed_rrules_are_validation_errors() {
    for raw in ["", "FREQ=HOURLY", "INTERVAL=2", "FREQ=DAILY;BYDAY=MO", "FREQ=WEEKLY;BYDAY=2MO"] {
        let result = RecurrencePlan::from_rrule(raw);
        assert!(
            matches!(result, Err(PlannerError::Validation { .. })),
            "{raw:?} should fail validation, got {result:?}"
        );
    }
}

#[test]
fn start_after_end_aborts_the_run() {
    let task = Task::new("backwards", "Backwards")
        .with_start(TimePlan::at(at(12, 0)))
        .with_end(TimePlan::at(at(11, 0)));
    let err = run(PlannerInput::new(vec![task], at(8, 0))).expect_err("start after end");
    assert!(matches!(err, PlannerError::Configuration { .. }));
    assert!(err.is_configuration() && !err.is_invariant_violation());
    assert!(err.to_string().contains("backwards"));
}

#[test]
fn invalid_planner_input_is_rejected_before_planning() {
    let negative = Task::new("neg", "Negative").with_duration(-10);
    assert!(run(PlannerInput::new(vec![negative], at(8, 0))).is_err());

    let duplicates = vec![
        Task::new("same", "first").with_duration(10),
        Task::new("same", "second").with_duration(10),
    ];
    let err = run(PlannerInput::new(duplicates, at(8, 0))).expect_err("duplicate ids");
    assert!(err.to_string().contains("duplicate"));

    let bad_hours =
        PlannerInput::new(Vec::new(), at(8, 0)).with_work_hours(WorkHours::new(9 * 60, 24 * 60));
    assert!(matches!(run(bad_hours), Err(PlannerError::Configuration { .. })));

    let bad_tuning = PlannerInput::new(Vec::new(), at(8, 0)).with_tuning(PlacementTuning {
        break_minutes: -1,
        ..PlacementTuning::default()
    });
    assert!(run(bad_tuning).is_err());
}

#[test]
fn oversized_durations_and_tuning_are_configuration_errors() {
    let fixed = Task::new("eon", "Eon")
        .with_start(TimePlan::at(at(9, 0)))
        .with_duration(1_000_000_000_000);
    let err = run(PlannerInput::new(vec![fixed], at(8, 0))).expect_err("duration too large");
    assert!(matches!(err, PlannerError::Configuration { .. }));
    assert!(err.to_string().contains("eon"));

    let flexible = Task::new("long", "Long").with_duration(MAX_TASK_MINUTES + 1);
    assert!(matches!(
        run(PlannerInput::new(vec![flexible], at(8, 0))),
        Err(PlannerError::Configuration { .. })
    ));

    let estimate = |minutes: i64| Subtask {
        id: format!("s{minutes}"),
        name: "step".into(),
        estimated_minutes: Some(minutes),
        is_completed: false,
    };
    let huge_estimate = Task::new("huge", "Huge").with_subtasks(vec![estimate(i64::MAX)]);
    assert!(matches!(
        run(PlannerInput::new(vec![huge_estimate], at(8, 0))),
        Err(PlannerError::Configuration { .. })
    ));
    let summed = Task::new("sum", "Sum")
        .with_subtasks(vec![estimate(MAX_TASK_MINUTES), estimate(MAX_TASK_MINUTES - 1)]);
    assert!(matches!(
        run(PlannerInput::new(vec![summed], at(8, 0))),
        Err(PlannerError::Configuration { .. })
    ));

    let urgent = Task::new("soon", "Soon")
        .with_priority(Priority::High)
        .with_duration(30);
    let far_horizon = PlannerInput::new(vec![urgent], at(8, 0))
        .with_day_organization(DayOrganization::FocusUrgentBuffer)
        .with_tuning(PlacementTuning {
            urgent_horizon_hours: i64::MAX / 2,
            ..PlacementTuning::default()
        });
    assert!(matches!(run(far_horizon), Err(PlannerError::Configuration { .. })));

    let long_break = parse_settings(&format!("{{\"breakMinutes\": {}}}", i64::MAX));
    assert!(matches!(long_break, Err(PlannerError::Configuration { .. })));

    let at_limit = Task::new("year", "Year").with_duration(MAX_TASK_MINUTES);
    let output = GeneratePlanUseCase::new()
        .invoke(PlannerInput::new(vec![at_limit], at(8, 0)))
        .expect("largest allowed duration still plans");
    assert_eq!(output.unresolved_conflicts.len(), 1);
}

#[test]
fn scheduling_failures_are_reported_not_raised() {
    let too_long = Task::new("marathon", "Marathon").with_duration(24 * 60);
    let output = GeneratePlanUseCase::new()
        .invoke(PlannerInput::new(vec![too_long], at(8, 0)))
        .expect("run succeeds");
    assert_eq!(output.unresolved_conflicts.len(), 1);
}

#[test]
fn malformed_settings_document_has_details() {
    match parse_settings("{\"breakMinutes\": \"ten\"}") {
        Err(PlannerError::Validation {
            details: Some(details),
            ..
        }) => assert!(details.get("error").is_some()),
        other => panic!("expected validation error, got {other:?}"),
    }

    let negative = parse_settings("{\"urgentBufferMinutes\": -5}");
    assert!(matches!(negative, Err(PlannerError::Configuration { .. })));
}

#[test]
fn partial_settings_document_fills_defaults() {
    let settings = parse_settings(
        r#"{"workHours": {"startMinute": 480, "endMinute": 1020}, "scheduleScope": "THIS_WEEK"}"#,
    )
    .expect("settings parse");
    assert_eq!(settings.work_hours, WorkHours::new(480, 1020));
    assert_eq!(settings.schedule_scope, ScheduleScope::ThisWeek);
    assert_eq!(settings.break_minutes, PlannerSettings::default().break_minutes);
}

#[test]
fn missing_settings_file_means_defaults() {
    let dir = tempdir().expect("temp dir");
    let settings = load_settings(&dir.path().join("absent.json")).expect("defaults");
    assert_eq!(settings, PlannerSettings::default());
}

#[test]
fn settings_round_trip_through_disk() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("settings.json");

    let settings = PlannerSettings {
        allow_splitting: true,
        min_split_minutes: 20,
        ..PlannerSettings::default()
    };
    save_settings(&path, &settings).expect("save");
    assert_eq!(load_settings(&path).expect("load"), settings);

    std::fs::write(&path, "not json").expect("overwrite");
    assert!(matches!(
        load_settings(&path),
        Err(PlannerError::Validation { .. })
    ));
}

#[test]
fn settings_service_persists_updates_and_refuses_bad_ones() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("settings.json");
    let service = SettingsService::new(&path);

    assert_eq!(service.get().expect("defaults"), PlannerSettings::default());

    let updated = service
        .update(PlannerSettingsUpdate {
            work_start_minute: Some(22 * 60),
            work_end_minute: Some(6 * 60),
            schedule_scope: Some(ScheduleScope::Tomorrow),
            ..Default::default()
        })
        .expect("update");
    assert!(updated.work_hours.wraps_midnight());

    let reloaded = SettingsService::new(&path).get().expect("reload");
    assert_eq!(reloaded, updated);

    let rejected = service.update(PlannerSettingsUpdate {
        min_split_minutes: Some(-1),
        ..Default::default()
    });
    assert!(rejected.is_err());
    assert_eq!(service.get().expect("cached"), updated);
    assert_eq!(load_settings(&path).expect("on disk"), updated);
}

#[test]
fn settings_drive_the_planner_input() {
    let settings = PlannerSettings {
        work_hours: WorkHours::new(8 * 60, 12 * 60),
        ..PlannerSettings::default()
    };
    let task = Task::new("early", "Early").with_duration(30);
    let output = GeneratePlanUseCase::new()
        .invoke(PlannerInput::from_settings(vec![task], at(7, 0), &settings))
        .expect("run succeeds");
    assert_eq!(output.items_for("early")[0].start, at(8, 0));
}

#[test]
fn logging_initializes_once() {
    let dir = tempdir().expect("temp dir");
    init_logging(dir.path()).expect("first init");
    init_logging(dir.path()).expect("second init is a no-op");
}
