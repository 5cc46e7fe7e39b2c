/* Stream responses.
 *
 * Registration hands the native library a callback and a fresh token. Every
 * callback invocation is decoded into one record and queued on an unbounded
 * channel in native invocation order. Cancelling closes the sink first, so no
 * record is queued after the token is released, then re-invokes the
 * registration with a null callback. Records already queued stay readable.
 * A callback that cannot be decoded terminates its own stream the same way,
 * leaving every other subscription untouched. */

use crate::errors::{DaqmxError, DaqmxResult, Outcome};
use crate::handle::TaskHandle;
use crate::invoker::{check_receiver, Invoker, Registration};
use crate::marshal::scalar_value;
use crate::native::{Callback, NativeArg};
use crate::value::{Args, Record, Value};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use daqmx_gen::StreamBinding;
use daqmx_types::{ScalarType, TypeToken};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) struct StreamSink {
    function: String,
    binding: StreamBinding,
    token: u64,
    sender: Mutex<Option<Sender<Record>>>,
    failure: Mutex<Option<DaqmxError>>,
}

impl StreamSink {
    fn new(function: &str, binding: StreamBinding, token: u64, sender: Sender<Record>) -> Self {
        Self {
            function: function.to_string(),
            binding,
            token,
            sender: Mutex::new(Some(sender)),
            failure: Mutex::new(None),
        }
    }

    /* Status returned to the native caller: 0 delivered or dropped after close, -1 failed */
    fn deliver(&self, args: &[NativeArg]) -> i32 {
        if !self.is_open() {
            debug!("{}: record after close dropped", self.function);
            return 0;
        }
        let record = match self.decode(args) {
            Ok(record) => record,
            Err(err) => return self.fail(err),
        };
        /* the lock is held across send so close() orders after any delivery in flight */
        let sent = {
            let sender = self.sender.lock();
            match sender.as_ref() {
                Some(sender) => sender.send(record).is_ok(),
                None => {
                    debug!("{}: record after close dropped", self.function);
                    return 0;
                }
            }
        };
        if sent {
            0
        } else {
            self.fail(DaqmxError::CallbackDelivery {
                function: self.function.clone(),
                reason: "subscriber is gone".into(),
            })
        }
    }

    /* A delivery failure terminates this stream only; queued records stay readable */
    fn fail(&self, err: DaqmxError) -> i32 {
        warn!("{}: stream terminated: {}", self.function, err);
        self.failure.lock().get_or_insert(err);
        self.close();
        -1
    }

    fn close(&self) {
        self.sender.lock().take();
    }

    fn is_open(&self) -> bool {
        self.sender.lock().is_some()
    }

    fn decode(&self, args: &[NativeArg]) -> DaqmxResult<Record> {
        let failure = |reason: String| DaqmxError::CallbackDelivery {
            function: self.function.clone(),
            reason,
        };
        if args.len() != self.binding.arguments.len() {
            return Err(failure(format!(
                "callback carries {} arguments, expected {}",
                args.len(),
                self.binding.arguments.len()
            )));
        }
        match &args[self.binding.token_index] {
            NativeArg::Token(token) if *token == self.token => {}
            other => return Err(failure(format!("foreign callback token {:?}", other))),
        }

        let mut record = Record::new();
        for (idx, field) in self.binding.arguments.iter().enumerate() {
            if idx == self.binding.token_index {
                continue;
            }
            let value = match (&field.ty, &args[idx]) {
                (TypeToken::Scalar(ScalarType::TaskHandle), NativeArg::Handle(raw)) => Value::UInt(*raw),
                (TypeToken::Scalar(ty), NativeArg::Scalar(scalar)) => {
                    scalar_value(&self.function, *ty, field.enum_name.as_deref(), *scalar)
                        .map_err(|err| failure(err.to_string()))?
                }
                (ty, NativeArg::Str(text)) if ty.is_string() => Value::Str(text.clone()),
                (ty, other) => {
                    return Err(failure(format!("argument '{}' is {:?}, expected {}", field.name, other, ty)));
                }
            };
            record.insert(field.name.clone(), value);
        }
        Ok(record)
    }
}

/// Live registration of a stream-response function. Records arrive in native
/// invocation order; dropping the subscription cancels it.
pub struct Subscription {
    invoker: Invoker,
    function: String,
    record: String,
    records: Receiver<Record>,
    sink: Arc<StreamSink>,
    unregister: Option<Vec<NativeArg>>,
}

impl Subscription {
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Record type name, e.g. `EveryNSamplesEventRecord`.
    pub fn record_name(&self) -> &str {
        &self.record
    }

    pub fn token(&self) -> u64 {
        self.sink.token
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_open()
    }

    pub fn try_recv(&self) -> Option<Record> {
        self.records.try_recv().ok()
    }

    /// Wait for the next record. Records queued before a delivery failure
    /// come first, then the failure, then `Ok(None)`. `Ok(None)` also on
    /// timeout or once the stream is cancelled and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> DaqmxResult<Option<Record>> {
        if let Ok(record) = self.records.try_recv() {
            return Ok(Some(record));
        }
        if let Some(err) = self.sink.failure.lock().take() {
            return Err(err);
        }
        match self.records.recv_timeout(timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Disconnected) => match self.sink.failure.lock().take() {
                Some(err) => Err(err),
                None => Ok(None),
            },
            Err(RecvTimeoutError::Timeout) => Ok(None),
        }
    }

    /// Every record queued so far.
    pub fn drain(&self) -> Vec<Record> {
        self.records.try_iter().collect()
    }

    /// First delivery failure since the last check.
    pub fn take_failure(&self) -> Option<DaqmxError> {
        self.sink.failure.lock().take()
    }

    /// Release the token. No record is queued after this returns.
    pub fn cancel(&mut self) -> DaqmxResult<Outcome<()>> {
        self.sink.close();
        let Some(mut args) = self.unregister.take() else {
            return Ok(Outcome::new(()));
        };
        let function = self.invoker.lookup(&self.function)?;
        let status = self.invoker.library().invoke(&function.native_symbol, &mut args);
        debug!("{} unregistered token {} with status {}", self.function, self.sink.token, status);
        let warning = self.invoker.check_status(function, status)?;
        Ok(Outcome { value: (), warning })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.unregister.is_some() {
            if let Err(err) = self.cancel() {
                warn!("{}: cancelling on drop failed: {}", self.function, err);
            }
        }
    }
}

impl Invoker {
    /// Register a stream-response function on `handle`.
    pub fn subscribe(&self, handle: &TaskHandle, function: &str, args: &Args) -> DaqmxResult<Outcome<Subscription>> {
        let surface_function = self.lookup(function)?;
        check_receiver(surface_function, handle)?;
        let binding = surface_function.stream.clone().ok_or_else(|| DaqmxError::WrongReceiver {
            function: function.to_string(),
            expected: "a stream-response function".into(),
            actual: "subscribe".into(),
        })?;

        let token = self.next_token();
        let (sender, records) = unbounded();
        let record = binding.record.clone();
        let callback_param = binding.callback_param.clone();
        let token_param = binding.token_param.clone();
        let sink = Arc::new(StreamSink::new(function, binding, token, sender));

        let callback: Callback = {
            let sink = Arc::clone(&sink);
            Arc::new(move |args: &[NativeArg]| sink.deliver(args))
        };
        let registration = Registration { callback, token };

        let outcome = self.execute(surface_function, Some(handle.raw()), args, Some(&registration))?;
        debug!("{} registered token {}", function, token);

        Ok(outcome.map(|execution| {
            let mut unregister = execution.native.args;
            for name in [&callback_param, &token_param] {
                if let Some(&idx) = execution.native.index.get(name) {
                    unregister[idx] = NativeArg::Null;
                }
            }
            Subscription {
                invoker: self.clone(),
                function: function.to_string(),
                record,
                records,
                sink,
                unregister: Some(unregister),
            }
        }))
    }
}
