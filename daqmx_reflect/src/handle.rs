/* Owned task handles.
 *
 * A handle is created by a factory or init method and belongs to exactly one
 * owner. It is never cloned. Passing it to the releasing function consumes it;
 * a handle dropped without that call is released on drop. */

use crate::native::{NativeArg, NativeLibrary, RawHandle};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct Releaser {
    pub library: Arc<dyn NativeLibrary>,
    pub function: String,
    pub symbol: String,
}

pub struct TaskHandle {
    raw: RawHandle,
    class: String,
    releaser: Option<Releaser>,
}

impl TaskHandle {
    pub(crate) fn new(raw: RawHandle, class: &str, releaser: Option<Releaser>) -> Self {
        Self {
            raw,
            class: class.to_string(),
            releaser,
        }
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Class the handle was created for, e.g. `Task`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /* The handle is gone once the releasing function has been invoked */
    pub(crate) fn disarm(&mut self) {
        self.releaser = None;
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("raw", &format_args!("{:#x}", self.raw))
            .field("class", &self.class)
            .finish()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        let Some(releaser) = self.releaser.take() else {
            return;
        };
        let mut args = [NativeArg::Handle(self.raw)];
        let status = releaser.library.invoke(&releaser.symbol, &mut args);
        if status < 0 {
            warn!(
                "{} handle {:#x} dropped; {} failed with status {}",
                self.class, self.raw, releaser.function, status
            );
        } else {
            debug!("{} handle {:#x} released on drop by {}", self.class, self.raw, releaser.function);
        }
    }
}
