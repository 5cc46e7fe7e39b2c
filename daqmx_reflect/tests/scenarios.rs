/* Runtime scenarios over the sample catalog and a scripted native library */

mod common;

use common::{create_task, invoker, invoker_with, ScriptedLibrary, TASK_HANDLE};
use daqmx_reflect::{
    args, Args, Buffer, DaqmxError, InvokerConfig, NativeArg, Record, Scalar, Value, WarningPolicy,
};
use daqmx_types::AttributeKind;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn power_up_states(count: usize) -> Value {
    let states = [10_192, 10_214, 10_310];
    Value::List(
        (0..count)
            .map(|i| {
                let record: Record = args([
                    ("channelNames", Value::from(format!("Dev1/port0/line{}", i))),
                    ("state", Value::from(states[i % states.len()])),
                ]);
                Value::Record(record)
            })
            .collect(),
    )
}

#[test]
fn scalar_write_passes_null_reserved_slot() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    let outcome = invoker
        .call_on(
            &task,
            "WriteAnalogScalarF64",
            &args([("autoStart", Value::from(true)), ("timeout", Value::from(10.0)), ("value", Value::from(1.25))]),
        )
        .unwrap();
    assert!(outcome.warning.is_none());
    assert!(outcome.value.is_empty());

    let calls = library.calls_to("DAQmxWriteAnalogScalarF64");
    assert_eq!(
        calls,
        vec![vec![
            NativeArg::Handle(TASK_HANDLE),
            NativeArg::Scalar(Scalar::Int(1)),
            NativeArg::Scalar(Scalar::Float(10.0)),
            NativeArg::Scalar(Scalar::Float(1.25)),
            NativeArg::Null,
        ]]
    );
}

#[test]
fn len_derived_size_follows_buffer() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    library.on("DAQmxWriteAnalogF64", |args| {
        let written = args[1].as_i64().unwrap_or(0);
        args[6].store(Scalar::Int(written));
        0
    });

    let samples: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
    let outputs = invoker
        .call_on(
            &task,
            "WriteAnalogF64",
            &args([
                ("autoStart", Value::from(false)),
                ("timeout", Value::from(10.0)),
                ("dataLayout", Value::from(0)),
                ("writeArray", Value::from(samples.clone())),
            ]),
        )
        .unwrap()
        .strict()
        .unwrap();

    let call = &library.calls_to("DAQmxWriteAnalogF64")[0];
    assert_eq!(call[1], NativeArg::Scalar(Scalar::Int(100)));
    assert_eq!(call[5], NativeArg::Buffer(Buffer::Float64(samples)));
    assert_eq!(call[7], NativeArg::Null);
    assert_eq!(outputs["sampsPerChanWritten"], Value::Int(100));
}

#[test]
fn caller_sized_read_allocates_requested_length() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    library.on("DAQmxReadAnalogF64", |args| {
        if let Some(NativeArg::Buffer(Buffer::Float64(values))) = args.get_mut(4) {
            for (i, v) in values.iter_mut().enumerate() {
                *v = i as f64;
            }
        }
        args[6].store(Scalar::Int(4));
        0
    });

    let outputs = invoker
        .call_on(
            &task,
            "ReadAnalogF64",
            &args([
                ("numSampsPerChan", Value::from(4)),
                ("timeout", Value::from(1.0)),
                ("fillMode", Value::from(0)),
                ("arraySizeInSamps", Value::from(4u32)),
            ]),
        )
        .unwrap()
        .value;
    assert_eq!(outputs["readArray"], Value::from(vec![0.0, 1.0, 2.0, 3.0]));
    assert_eq!(outputs["sampsPerChanRead"], Value::Int(4));
}

#[test]
fn two_call_string_is_discovered_by_preflight() {
    const DEVICES: &str = "Dev1, Dev2, cDAQ1Mod1, cDAQ1Mod2, SimDev_01";
    let text: String = DEVICES.chars().take(41).collect();
    assert_eq!(text.len(), 41);

    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let written = text.clone();
    library.on("DAQmxGetSystemInfoAttribute", move |args| match args[1].as_buffer_mut() {
        None => 42,
        Some(buffer) => {
            buffer.write_text(&written);
            0
        }
    });

    let outcome = invoker
        .call("GetSystemInfoAttributeString", &args([("attribute", Value::from(6459))]))
        .unwrap();
    assert!(outcome.warning.is_none(), "preflight size must not surface as a warning");
    assert_eq!(outcome.value["value"], Value::Str(text));
    assert_eq!(outcome.value.len(), 1);

    let calls = library.calls_to("DAQmxGetSystemInfoAttribute");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0][1], NativeArg::Null);
    assert_eq!(calls[0][2], NativeArg::Scalar(Scalar::Int(0)));
    assert_eq!(calls[1][1].as_buffer().map(Buffer::len), Some(42));
    assert_eq!(calls[1][2], NativeArg::Scalar(Scalar::Int(42)));
}

#[test]
fn empty_two_call_result_skips_second_call() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);

    let outputs = invoker
        .call("GetSystemInfoAttributeString", &args([("attribute", Value::from(4711))]))
        .unwrap()
        .value;
    assert_eq!(outputs["value"], Value::Str(String::new()));
    assert_eq!(library.calls_to("DAQmxGetSystemInfoAttribute").len(), 1);
}

#[test]
fn computed_length_uses_hidden_size() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    library.on("DAQmxCalculateReversePolyCoeff", |args| {
        if let Some(NativeArg::Buffer(Buffer::Float64(reverse))) = args.get_mut(6) {
            reverse.iter_mut().for_each(|c| *c = 0.5);
        }
        0
    });

    let call = |order: i32| {
        invoker
            .call(
                "CalculateReversePolyCoeff",
                &args([
                    ("forwardCoeffs", Value::from(vec![0.0, 1.0, 0.25, 0.125])),
                    ("minValX", Value::from(-10.0)),
                    ("maxValX", Value::from(10.0)),
                    ("numPointsToCompute", Value::from(1000)),
                    ("reversePolyOrder", Value::from(order)),
                ]),
            )
            .unwrap()
            .value
    };

    let outputs = call(-1);
    assert_eq!(outputs["reverseCoeffs"], Value::from(vec![0.5; 4]));
    let native = &library.calls_to("DAQmxCalculateReversePolyCoeff")[0];
    assert_eq!(native[1], NativeArg::Scalar(Scalar::Int(4)));

    let outputs = call(2);
    assert_eq!(outputs["reverseCoeffs"].as_list().map(|l| l.len()), Some(3));
}

#[test]
fn compound_list_expands_into_column_groups() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);

    for count in [3, 4, 96] {
        invoker
            .call(
                "SetDigitalPowerUpStates",
                &args([("deviceName", Value::from("Dev1")), ("powerUpStates", power_up_states(count))]),
            )
            .unwrap();
        let calls = library.calls_to("DAQmxSetDigitalPowerUpStates");
        let last = calls.last().unwrap();
        assert_eq!(last.len(), 1 + 2 * 96);
        assert_eq!(last[0], NativeArg::Str("Dev1".into()));
        assert_eq!(last[1], NativeArg::Str("Dev1/port0/line0".into()));
        assert_eq!(last[2], NativeArg::Scalar(Scalar::Int(10_192)));
        assert_eq!(last[2 * count - 1], NativeArg::Str(format!("Dev1/port0/line{}", count - 1)));
        if count < 96 {
            assert_eq!(last[1 + 2 * count], NativeArg::Null);
            assert_eq!(last[2 + 2 * count], NativeArg::Scalar(Scalar::Int(0)));
        }
    }

    let err = invoker
        .call(
            "SetDigitalPowerUpStates",
            &args([("deviceName", Value::from("Dev1")), ("powerUpStates", power_up_states(97))]),
        )
        .unwrap_err();
    assert_eq!(
        err,
        DaqmxError::TooManyElements { function: "SetDigitalPowerUpStates".into(), max: 96, actual: 97 }
    );
    assert_eq!(library.calls_to("DAQmxSetDigitalPowerUpStates").len(), 3);
}

#[test]
fn compound_members_are_enum_checked() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let bad: Record = args([("channelNames", Value::from("Dev1/port0/line0")), ("state", Value::from(1))]);

    let err = invoker
        .call(
            "SetDigitalPowerUpStates",
            &args([("deviceName", Value::from("Dev1")), ("powerUpStates", Value::List(vec![Value::Record(bad)]))]),
        )
        .unwrap_err();
    assert_eq!(err.category(), "InvalidEnumValue");
    assert!(library.calls_to("DAQmxSetDigitalPowerUpStates").is_empty());
}

#[test]
fn stream_records_arrive_in_order_until_released() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    let registered: Arc<Mutex<Option<(daqmx_reflect::Callback, NativeArg)>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&registered);
    library.on("DAQmxRegisterEveryNSamplesEvent", move |args| {
        let mut registered = slot.lock();
        *registered = args[4].as_callback().map(|cb| (Arc::clone(cb), args[5].clone()));
        0
    });
    let fire = |n: u32| {
        let registered = registered.lock().clone();
        registered.map(|(callback, token)| {
            callback(&[NativeArg::Handle(TASK_HANDLE), NativeArg::Scalar(Scalar::Int(1)), NativeArg::Scalar(Scalar::Int(n as i64)), token])
        })
    };

    let mut subscription = invoker
        .subscribe(
            &task,
            "RegisterEveryNSamplesEvent",
            &args([("everyNSamplesEventType", Value::from(1)), ("nSamples", Value::from(1000u32))]),
        )
        .unwrap()
        .value;
    assert_eq!(subscription.record_name(), "EveryNSamplesEventRecord");

    assert_eq!(fire(1000), Some(0));
    assert_eq!(fire(2000), Some(0));
    let first = subscription.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(first["task"], Value::UInt(TASK_HANDLE));
    assert_eq!(
        first["everyNSamplesEventType"],
        Value::Enum { enum_name: "EveryNSamplesEventType".into(), value: 1 }
    );
    assert_eq!(first["nSamples"], Value::UInt(1000));
    assert_eq!(first.len(), 3);

    subscription.cancel().unwrap();
    assert!(!subscription.is_active());
    assert_eq!(fire(3000), None, "unregistration clears the native callback");

    let remaining = subscription.drain();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["nSamples"], Value::UInt(2000));

    let registrations = library.calls_to("DAQmxRegisterEveryNSamplesEvent");
    assert_eq!(registrations.len(), 2);
    assert_eq!(registrations[1][4], NativeArg::Null);
    assert_eq!(registrations[1][5], NativeArg::Null);
}

/* Registration handler that keeps every live callback with its token */
fn keep_registrations(library: &Arc<ScriptedLibrary>) -> Arc<Mutex<Vec<(daqmx_reflect::Callback, NativeArg)>>> {
    let kept: Arc<Mutex<Vec<(daqmx_reflect::Callback, NativeArg)>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = Arc::clone(&kept);
    library.on("DAQmxRegisterEveryNSamplesEvent", move |args| {
        if let Some(callback) = args[4].as_callback() {
            slot.lock().push((Arc::clone(callback), args[5].clone()));
        }
        0
    });
    kept
}

fn every_n_samples(n: i64, token: &NativeArg) -> Vec<NativeArg> {
    vec![NativeArg::Handle(TASK_HANDLE), NativeArg::Scalar(Scalar::Int(1)), NativeArg::Scalar(Scalar::Int(n)), token.clone()]
}

#[test]
fn delivery_failure_ends_the_stream() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    let kept = keep_registrations(&library);

    let subscription = invoker
        .subscribe(
            &task,
            "RegisterEveryNSamplesEvent",
            &args([("everyNSamplesEventType", Value::from(1)), ("nSamples", Value::from(5u32))]),
        )
        .unwrap()
        .value;
    let (callback, token) = kept.lock()[0].clone();

    assert_eq!(callback(&every_n_samples(5, &token)), 0);
    /* a callback missing its token argument cannot be decoded */
    assert_eq!(callback(&every_n_samples(10, &token)[..3]), -1);
    assert!(!subscription.is_active());
    assert_eq!(callback(&every_n_samples(15, &token)), 0);

    let queued = subscription.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(queued["nSamples"], Value::UInt(5));
    let err = subscription.recv_timeout(Duration::from_secs(1)).unwrap_err();
    assert_eq!(err.category(), "CallbackDelivery");
    assert_eq!(subscription.recv_timeout(Duration::from_millis(10)), Ok(None));
    assert!(subscription.drain().is_empty());
}

#[test]
fn delivery_failure_leaves_other_streams_alive() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    let kept = keep_registrations(&library);

    let subscribe = || {
        invoker
            .subscribe(
                &task,
                "RegisterEveryNSamplesEvent",
                &args([("everyNSamplesEventType", Value::from(1)), ("nSamples", Value::from(5u32))]),
            )
            .unwrap()
            .value
    };
    let broken = subscribe();
    let healthy = subscribe();
    assert_ne!(broken.token(), healthy.token());

    let registrations = kept.lock().clone();
    let (broken_cb, broken_token) = registrations[0].clone();
    let (healthy_cb, healthy_token) = registrations[1].clone();

    /* the healthy stream's token is foreign to the broken one */
    assert_eq!(broken_cb(&every_n_samples(1, &healthy_token)), -1);
    assert!(!broken.is_active());
    assert_eq!(broken_cb(&every_n_samples(2, &broken_token)), 0);

    assert!(healthy.is_active());
    assert_eq!(healthy_cb(&every_n_samples(3, &healthy_token)), 0);
    let record = healthy.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(record["nSamples"], Value::UInt(3));
    assert!(healthy.take_failure().is_none());

    assert_eq!(broken.recv_timeout(Duration::from_millis(10)).unwrap_err().category(), "CallbackDelivery");
    assert_eq!(broken.recv_timeout(Duration::from_millis(10)), Ok(None));
}

#[test]
fn records_after_release_are_dropped() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    /* a native side that keeps firing after unregistration */
    let kept: Arc<Mutex<Vec<(daqmx_reflect::Callback, NativeArg)>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = Arc::clone(&kept);
    library.on("DAQmxRegisterEveryNSamplesEvent", move |args| {
        if let Some(callback) = args[4].as_callback() {
            slot.lock().push((Arc::clone(callback), args[5].clone()));
        }
        0
    });

    let mut subscription = invoker
        .subscribe(
            &task,
            "RegisterEveryNSamplesEvent",
            &args([("everyNSamplesEventType", Value::from(1)), ("nSamples", Value::from(10u32))]),
        )
        .unwrap()
        .value;
    subscription.cancel().unwrap();

    let (callback, token) = kept.lock()[0].clone();
    let status = callback(&[NativeArg::Handle(TASK_HANDLE), NativeArg::Scalar(Scalar::Int(1)), NativeArg::Scalar(Scalar::Int(10)), token]);
    assert_eq!(status, 0);
    assert!(subscription.try_recv().is_none());
    assert!(subscription.take_failure().is_none());
}

#[test]
fn native_errors_carry_extended_error_info() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    library.error_info("Task specified is invalid or does not exist.");
    library.on("DAQmxStartTask", |_| -200_088);

    let err = invoker.call_on(&task, "StartTask", &Args::new()).unwrap_err();
    assert_eq!(
        err,
        DaqmxError::NativeError {
            function: "StartTask".into(),
            code: -200_088,
            message: "Task specified is invalid or does not exist.".into(),
        }
    );
    assert_eq!(err.code(), Some(-200_088));
}

#[test]
fn warnings_are_carried_or_promoted() {
    let library = ScriptedLibrary::new();
    library.error_info("Finite acquisition or generation has been stopped before the requested number of samples were acquired or generated.");
    library.on("DAQmxStopTask", |_| 200_010);

    let carry = invoker(&library);
    let task = create_task(&library, &carry);
    let outcome = carry.call_on(&task, "StopTask", &Args::new()).unwrap();
    let warning = outcome.warning.expect("positive status is a warning");
    assert_eq!(warning.category(), "NativeWarning");
    assert_eq!(warning.code(), Some(200_010));

    let promote = invoker_with(&library, InvokerConfig { warning_policy: WarningPolicy::Promote, fetch_error_info: true });
    let err = promote.call_on(&task, "StopTask", &Args::new()).unwrap_err();
    assert_eq!(err.category(), "NativeWarning");
}

#[test]
fn invalid_enum_values_never_reach_native() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    let err = invoker
        .call_on(
            &task,
            "CfgSampClkTiming",
            &args([("rate", Value::from(1000.0)), ("activeEdge", Value::from(42))]),
        )
        .unwrap_err();
    assert_eq!(
        err,
        DaqmxError::InvalidEnumValue { function: "CfgSampClkTiming".into(), enum_name: "Edge1".into(), value: 42 }
    );
    assert!(library.calls_to("DAQmxCfgSampClkTiming").is_empty());
}

#[test]
fn defaults_fill_optional_inputs() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    invoker.call_on(&task, "CfgSampClkTiming", &args([("rate", Value::from(1000.0))])).unwrap();
    let call = &library.calls_to("DAQmxCfgSampClkTiming")[0];
    assert_eq!(call[1], NativeArg::Str(String::new()));
    assert_eq!(call[3], NativeArg::Scalar(Scalar::Int(10_280)));
    assert_eq!(call[4], NativeArg::Scalar(Scalar::Int(10_178)));
    assert_eq!(call[5], NativeArg::Scalar(Scalar::UInt(1000)));
}

#[test]
fn adaptor_output_coalesces_channel_name() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    let outputs = invoker
        .call_on(&task, "CreateAIVoltageChan", &args([("physicalChannel", Value::from("Dev1/ai0"))]))
        .unwrap()
        .value;
    assert_eq!(
        outputs["channel"],
        Value::List(vec![Value::UInt(TASK_HANDLE), Value::from("Dev1/ai0")])
    );

    let outputs = invoker
        .call_on(
            &task,
            "CreateAIVoltageChan",
            &args([("physicalChannel", Value::from("Dev1/ai0")), ("nameToAssignToChannel", Value::from("probe"))]),
        )
        .unwrap()
        .value;
    assert_eq!(outputs["channel"], Value::List(vec![Value::UInt(TASK_HANDLE), Value::from("probe")]));
}

#[test]
fn coerced_buffers_follow_configured_policy() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    invoker
        .call_on(
            &task,
            "WriteBinaryI16",
            &args([
                ("autoStart", Value::from(false)),
                ("timeout", Value::from(1.0)),
                ("dataLayout", Value::from(0)),
                ("writeArray", Value::from(vec![1, 40_000, -40_000])),
            ]),
        )
        .unwrap();
    let call = &library.calls_to("DAQmxWriteBinaryI16")[0];
    assert_eq!(call[5], NativeArg::Buffer(Buffer::Int16(vec![1, i16::MAX, i16::MIN])));

    library.on("DAQmxReadBinaryU16", |args| {
        if let Some(NativeArg::Buffer(Buffer::UInt16(values))) = args.get_mut(4) {
            values.copy_from_slice(&[0, 65_535]);
        }
        0
    });
    let outputs = invoker
        .call_on(
            &task,
            "ReadBinaryU16",
            &args([
                ("numSampsPerChan", Value::from(2)),
                ("timeout", Value::from(1.0)),
                ("fillMode", Value::from(1)),
                ("arraySizeInSamps", Value::from(2u32)),
            ]),
        )
        .unwrap()
        .value;
    assert_eq!(outputs["readArray"], Value::List(vec![Value::UInt(0), Value::UInt(65_535)]));
}

fn channel_attribute(attribute: i32) -> Args {
    args([("channel", Value::from("Dev1/ai0")), ("attribute", Value::from(attribute))])
}

#[test]
fn attribute_reads_dispatch_by_kind() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    library.on("DAQmxGetChanAttribute", |args| {
        if args[3].store(Scalar::Float(10.0)) {
            return 0;
        }
        match args[3].as_buffer_mut() {
            Some(buffer) => {
                buffer.write_text("Dev1/ai0");
                0
            }
            None => 9,
        }
    });

    let max = invoker
        .get_attribute(Some(&task), "GetChanAttribute", AttributeKind::Double, &channel_attribute(6109))
        .unwrap()
        .value;
    assert_eq!(max, Value::Float(10.0));

    let name = invoker
        .get_attribute(Some(&task), "GetChanAttribute", AttributeKind::String, &channel_attribute(6389))
        .unwrap()
        .value;
    assert_eq!(name, Value::from("Dev1/ai0"));

    let calls = library.calls_to("DAQmxGetChanAttribute");
    assert_eq!(calls.len(), 3, "double once, string preflight and retrieve");
    assert_eq!(calls[0][4], NativeArg::Scalar(Scalar::Int(0)));
    assert_eq!(calls[1][3], NativeArg::Null);
    assert_eq!(calls[2][4], NativeArg::Scalar(Scalar::Int(9)));

    assert_eq!(
        invoker.attribute_kinds("GetChanAttribute").unwrap(),
        [AttributeKind::Bool, AttributeKind::Int32, AttributeKind::Double, AttributeKind::String]
    );
}

#[test]
fn attribute_writes_insert_the_value() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    invoker
        .set_attribute(Some(&task), "SetChanAttribute", AttributeKind::Int32, &channel_attribute(4247), Value::from(10_083))
        .unwrap();
    let call = &library.calls_to("DAQmxSetChanAttribute")[0];
    assert_eq!(call[0], NativeArg::Handle(TASK_HANDLE));
    assert_eq!(call[2], NativeArg::Scalar(Scalar::Int(4247)));
    assert_eq!(call[3], NativeArg::Scalar(Scalar::Int(10_083)));
}

#[test]
fn attribute_dispatch_rejects_mismatches() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);

    let missing = invoker
        .get_attribute(Some(&task), "GetChanAttribute", AttributeKind::Timestamp, &channel_attribute(6109))
        .unwrap_err();
    assert_eq!(missing.category(), "InvalidArgument");
    assert!(missing.to_string().contains("Double"), "{}", missing);

    let access = invoker
        .set_attribute(Some(&task), "GetChanAttribute", AttributeKind::Double, &channel_attribute(6109), Value::from(1.0))
        .unwrap_err();
    assert_eq!(access.category(), "WrongReceiver");

    let unknown = invoker
        .get_attribute(None, "GetScaleAttribute", AttributeKind::Double, &Args::new())
        .unwrap_err();
    assert_eq!(unknown, DaqmxError::UnknownFunction { function: "GetScaleAttribute".into() });
    assert!(library.calls_to("DAQmxGetChanAttribute").is_empty());
}

#[test]
fn receivers_are_checked() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);
    let task = create_task(&library, &invoker);
    let none = Args::new();

    assert_eq!(invoker.call("StartTask", &none).unwrap_err().category(), "WrongReceiver");
    assert_eq!(invoker.call_on(&task, "ClearTask", &none).unwrap_err().category(), "WrongReceiver");
    assert_eq!(
        invoker.call_on(&task, "RegisterEveryNSamplesEvent", &none).unwrap_err().category(),
        "WrongReceiver"
    );
    assert_eq!(invoker.call("CreateTask", &none).unwrap_err().category(), "WrongReceiver");
    assert_eq!(
        invoker.call("StartTaskNow", &none).unwrap_err(),
        DaqmxError::UnknownFunction { function: "StartTaskNow".into() }
    );
    assert_eq!(
        invoker.call_on(&task, "StartTask", &args([("timeout", Value::from(1.0))])).unwrap_err().category(),
        "InvalidArgument"
    );
    assert!(library.calls_to("DAQmxStartTask").is_empty());
}

#[test]
fn handles_release_once() {
    let library = ScriptedLibrary::new();
    let invoker = invoker(&library);

    let task = create_task(&library, &invoker);
    assert_eq!(task.raw(), TASK_HANDLE);
    assert_eq!(task.class(), "Task");
    invoker.release(task, "ClearTask", &Args::new()).unwrap();
    assert_eq!(library.calls_to("DAQmxClearTask"), vec![vec![NativeArg::Handle(TASK_HANDLE)]]);

    let dropped = create_task(&library, &invoker);
    drop(dropped);
    assert_eq!(library.calls_to("DAQmxClearTask").len(), 2);
}

#[test]
fn failed_release_still_ends_ownership() {
    let library = ScriptedLibrary::new();
    let invoker = invoker_with(&library, InvokerConfig { warning_policy: WarningPolicy::Carry, fetch_error_info: false });
    let task = create_task(&library, &invoker);
    library.on("DAQmxClearTask", |_| -200_088);

    let err = invoker.release(task, "ClearTask", &Args::new()).unwrap_err();
    assert_eq!(err.code(), Some(-200_088));
    assert_eq!(library.calls_to("DAQmxClearTask").len(), 1);
    assert!(library.calls_to("DAQmxGetExtendedErrorInfo").is_empty());
}
