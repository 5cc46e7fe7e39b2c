/* DAQmx Reflect - interprets the Surface Catalog at runtime.
 *
 * The executable form of the binding contract: calls are marshalled from named
 * surface values into native argument slots, dispatched through a
 * `NativeLibrary`, and read back into surface values. Handles are owned,
 * streams are channels of records and attribute shards dispatch by kind. */

pub mod attribute;
pub mod errors;
pub mod handle;
pub mod invoker;
pub mod marshal;
pub mod native;
pub mod stream;
pub mod time;
pub mod value;

pub use errors::{DaqmxError, DaqmxResult, Outcome, WarningPolicy};
pub use handle::TaskHandle;
pub use invoker::{Invoker, InvokerConfig};
pub use native::{Buffer, Callback, NativeArg, NativeLibrary, RawHandle, Scalar};
pub use stream::Subscription;
pub use time::CviTime;
pub use value::{args, Args, Outputs, Record, Value};
