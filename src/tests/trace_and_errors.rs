use super::*;

#[test]
fn trace_logs_are_empty_when_trace_is_disabled() -> Result<()> {
    let (runtime, queue) = setup();
    let deferred = runtime.defer();
    deferred.promise().then(None, None);
    deferred.resolve(Value::from(1))?;
    queue.run_until_idle()?;
    assert!(runtime.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_logs_capture_promise_lifecycle_and_tasks() -> Result<()> {
    let (runtime, queue) = setup();
    runtime.enable_trace(true);
    let deferred = runtime.defer();
    let id = deferred.promise().id();
    deferred.promise().then(None, None);
    deferred.resolve(Value::from(5))?;
    queue.run_until_idle()?;

    let logs = runtime.take_trace_logs();
    assert!(logs.iter().any(|line| line == &format!("[promise] create #{id}")));
    assert!(logs.iter().any(|line| line.contains(&format!("[promise] then #{id} -> #"))));
    assert!(logs.iter().any(|line| line == &format!("[promise] #{id} fulfilled value=5")));
    assert!(logs.iter().any(|line| line.contains("[task] submit id=1 notify")));
    assert!(logs.iter().any(|line| line.contains("[task] run id=1 notify")));
    assert!(runtime.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_logs_record_adoption_and_assimilation() -> Result<()> {
    let (runtime, queue) = setup();
    runtime.enable_trace(true);
    let source = runtime.defer();
    let target = runtime.defer();
    target.resolve(Value::Promise(source.promise()))?;

    let assimilating = runtime.defer();
    let thenable = Value::object(vec![(
        "then".into(),
        Value::function("then", |_, args| {
            first(args).call(&Value::Undefined, &[Value::from("t")])?;
            Err(Value::from("after"))
        }),
    )]);
    assimilating.resolve(thenable)?;
    queue.run_until_idle()?;

    let logs = runtime.take_trace_logs();
    let adopts = format!(
        "[promise] #{} adopts #{}",
        target.promise().id(),
        source.promise().id()
    );
    assert!(logs.iter().any(|line| line == &adopts));
    assert!(logs.iter().any(|line| line.contains("assimilates thenable")));
    assert!(logs.iter().any(|line| line.contains("ignored throw after callback: after")));
    Ok(())
}

#[test]
fn trace_formats_self_containing_array_values() -> Result<()> {
    let (runtime, queue) = setup();
    runtime.enable_trace(true);
    let array = Value::array(vec![Value::from(1)]);
    if let Value::Array(values) = &array {
        values.borrow_mut().push(array.clone());
    }
    let deferred = runtime.defer();
    let outcome = observe(&deferred.promise());
    deferred.resolve(array.clone())?;
    queue.run_until_idle()?;

    let id = deferred.promise().id();
    let logs = runtime.take_trace_logs();
    assert!(logs.contains(&format!("[promise] #{id} fulfilled value=1,")));
    assert_eq!(*outcome.borrow(), Some(Ok(array)));
    Ok(())
}

#[test]
fn trace_categories_can_be_disabled() -> Result<()> {
    let (runtime, queue) = setup();
    runtime.enable_trace(true);
    runtime.set_trace_tasks(false);
    let deferred = runtime.defer();
    deferred.promise().then(None, None);
    deferred.resolve(Value::Null)?;
    queue.run_until_idle()?;
    let logs = runtime.take_trace_logs();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|line| line.starts_with("[promise]")));

    runtime.set_trace_tasks(true);
    runtime.set_trace_promises(false);
    let deferred = runtime.defer();
    deferred.promise().then(None, None);
    deferred.resolve(Value::Null)?;
    queue.run_until_idle()?;
    let logs = runtime.take_trace_logs();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|line| line.starts_with("[task]")));
    Ok(())
}

#[test]
fn trace_log_limit_keeps_latest_entries() -> Result<()> {
    let (runtime, _queue) = setup();
    runtime.enable_trace(true);
    runtime.set_trace_log_limit(2)?;
    let ids: Vec<usize> = (0..3).map(|_| runtime.defer().promise().id()).collect();

    let logs = runtime.take_trace_logs();
    assert_eq!(
        logs,
        vec![
            format!("[promise] create #{}", ids[1]),
            format!("[promise] create #{}", ids[2]),
        ]
    );
    Ok(())
}

#[test]
fn lowering_trace_log_limit_drops_oldest_entries() -> Result<()> {
    let (runtime, _queue) = setup();
    runtime.enable_trace(true);
    for _ in 0..4 {
        runtime.defer();
    }
    runtime.set_trace_log_limit(1)?;
    let logs = runtime.take_trace_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0], "[promise] create #4");
    Ok(())
}

#[test]
fn set_trace_log_limit_rejects_zero() {
    let (runtime, _queue) = setup();
    let err = runtime
        .set_trace_log_limit(0)
        .expect_err("zero trace log limit should be rejected");
    match err {
        Error::Config(msg) => {
            assert!(msg.contains("set_trace_log_limit requires at least 1 entry"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn errors_convert_into_script_reasons() {
    let reason = Error::SelfResolution { promise: 3 }.into_reason();
    assert_eq!(
        reason.to_string(),
        "TypeError: promise #3 cannot be resolved with itself"
    );

    let reason = Error::StepLimitExceeded { limit: 2, steps: 3 }.into_reason();
    match reason {
        Value::Error(error) => assert_eq!(error.kind, ErrorKind::RangeError),
        other => panic!("unexpected reason: {other:?}"),
    }
}

#[test]
fn runaway_continuations_hit_the_step_limit() -> Result<()> {
    fn spin(runtime: &PromiseRuntime) {
        let deferred = runtime.defer();
        let next_runtime = runtime.clone();
        deferred.promise().then(
            Some(Value::function("spin", move |_, _| {
                spin(&next_runtime);
                Ok(Value::Undefined)
            })),
            None,
        );
        deferred.resolve(Value::Undefined).ok();
    }

    let (runtime, queue) = setup();
    queue.set_step_limit(50)?;
    spin(&runtime);
    match queue.run_until_idle() {
        Err(Error::StepLimitExceeded { limit, .. }) => assert_eq!(limit, 50),
        other => panic!("expected step limit error, got: {other:?}"),
    }
    assert!(!queue.is_empty());
    Ok(())
}
