use crate::error::SolverError;
use daqmx_types::FunctionEntry;
use serde_derive::{Deserialize, Serialize};

/* Where a function lands in the generated surface */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Placement {
    /// Free function in the default module
    Module,
    /// Method on a class; the handle slot is supplied by the receiver
    Instance { class: String, accessor: String },
    /// Class-level constructor returning a new owned handle
    Factory { class: String },
    /// Class-level function with no receiver
    Static { class: String },
}

impl Placement {
    pub fn class(&self) -> Option<&str> {
        match self {
            Placement::Module => None,
            Placement::Instance { class, .. } | Placement::Factory { class } | Placement::Static { class } => {
                Some(class)
            }
        }
    }

    pub fn has_receiver(&self) -> bool {
        matches!(self, Placement::Instance { .. })
    }
}

pub fn place(function: &str, entry: &FunctionEntry) -> Result<Placement, SolverError> {
    let invalid = |reason: &str| SolverError::InvalidPlacement { function: function.to_string(), reason: reason.to_string() };

    let Some(class) = entry.python_class_name.clone() else {
        if entry.is_python_factory {
            return Err(invalid("a factory needs a class"));
        }
        return Ok(Placement::Module);
    };

    if entry.is_python_factory {
        let handles = entry
            .parameters
            .iter()
            .filter(|p| p.is_out() && p.ty.is_handle())
            .count();
        if handles != 1 {
            return Err(invalid("a factory returns exactly one handle"));
        }
        if entry.releases_handle {
            return Err(invalid("a factory cannot release a handle"));
        }
        return Ok(Placement::Factory { class });
    }

    match &entry.handle_parameter {
        Some(handle) => Ok(Placement::Instance { class, accessor: handle.accessor.clone() }),
        None if entry.releases_handle => Err(invalid("releasing a handle requires a receiver")),
        None => Ok(Placement::Static { class }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> FunctionEntry {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn class_placement_follows_receiver_and_factory_flags() {
        let method = entry(
            r#"
calling_convention: StdCall
python_class_name: Task
handle_parameter: { cvi_name: taskHandle, accessor: self._handle }
returns: int32
parameters:
  - { name: task, cvi_name: taskHandle, direction: in, type: TaskHandle }
"#,
        );
        assert_eq!(
            place("StartTask", &method).unwrap(),
            Placement::Instance { class: "Task".into(), accessor: "self._handle".into() }
        );

        let factory = entry(
            r#"
calling_convention: StdCall
python_class_name: Task
is_python_factory: true
returns: int32
parameters:
  - { name: sessionName, direction: in, type: "const char[]" }
  - { name: task, direction: out, type: TaskHandle }
"#,
        );
        assert_eq!(place("CreateTask", &factory).unwrap(), Placement::Factory { class: "Task".into() });

        let free = entry("calling_convention: StdCall\nreturns: int32\nparameters: []\n");
        assert_eq!(place("ResetDevice", &free).unwrap(), Placement::Module);
    }

    #[test]
    fn factory_without_handle_output_is_rejected() {
        let factory = entry(
            r#"
calling_convention: StdCall
python_class_name: Task
is_python_factory: true
returns: int32
parameters:
  - { name: sessionName, direction: in, type: "const char[]" }
"#,
        );
        assert!(matches!(place("CreateTask", &factory), Err(SolverError::InvalidPlacement { .. })));
    }
}
