//! Work Unit Registry
//!
//! Worker processes are fresh executions of the same binary, so a unit cannot
//! be shipped to them as a closure. Units are registered at link time with
//! `#[serdebench::unit]` (via `inventory`) and addressed by id; arguments
//! travel as a serialized payload.

use crate::sampler::{SampleError, Sampler};
use serde::Serialize;

/// Boxed error returned by unit bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unit definition registered via `#[serdebench::unit]`
#[derive(Debug, Clone)]
pub struct UnitDef {
    /// Unique identifier
    pub id: &'static str,
    /// Function name
    pub name: &'static str,
    /// Group this unit belongs to (usually the format name)
    pub group: &'static str,
    /// Generated wrapper around the unit body
    pub runner_fn: fn(&mut Sampler) -> Result<(), BoxError>,
    /// Source file path
    pub file: &'static str,
    /// Source line number
    pub line: u32,
    /// Module path
    pub module_path: &'static str,
}

inventory::collect!(UnitDef);

/// Anchor to prevent LTO from stripping inventory entries
#[used]
#[doc(hidden)]
pub static REGISTRY_ANCHOR: fn() = || for _ in inventory::iter::<UnitDef> {};

/// What a unit body may return
pub trait UnitOutcome {
    /// Normalize into the registry's result type
    fn into_result(self) -> Result<(), BoxError>;
}

impl UnitOutcome for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> UnitOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Look up a registered unit by id
pub fn find_unit(id: &str) -> Option<&'static UnitDef> {
    inventory::iter::<UnitDef>.into_iter().find(|u| u.id == id)
}

/// All registered units in source order (file, then line)
pub fn registered_units() -> Vec<&'static UnitDef> {
    let mut units: Vec<_> = inventory::iter::<UnitDef>.into_iter().collect();
    units.sort_by(|a, b| (a.file, a.line, a.id).cmp(&(b.file, b.line, b.id)));
    units
}

/// A unit id plus the arguments every trial of it receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    id: String,
    payload: Vec<u8>,
}

impl WorkUnit {
    /// Address a registered unit, without arguments
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Vec::new(),
        }
    }

    /// Attach arguments; each worker decodes its own copy with `Sampler::args`
    pub fn with_args<T: Serialize + ?Sized>(mut self, args: &T) -> Result<Self, SampleError> {
        self.payload = serde_json::to_vec(args)?;
        Ok(self)
    }

    /// Unit id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Serialized arguments
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl From<&UnitDef> for WorkUnit {
    fn from(def: &UnitDef) -> Self {
        WorkUnit::new(def.id)
    }
}

/// Render an error with its `source()` chain: `outer: inner: root`
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(s: &mut Sampler) -> Result<(), BoxError> {
        s.measure(|| ());
        Ok(())
    }

    inventory::submit! {
        UnitDef {
            id: "core_registry_noop",
            name: "noop",
            group: "registry",
            runner_fn: noop,
            file: file!(),
            line: line!(),
            module_path: module_path!(),
        }
    }

    #[test]
    fn test_find_registered_unit() {
        let unit = find_unit("core_registry_noop").unwrap();
        assert_eq!(unit.group, "registry");
        assert!(find_unit("no_such_unit").is_none());
        assert!(registered_units().iter().any(|u| u.id == unit.id));
    }

    #[test]
    fn test_with_args_serializes_payload() {
        let unit = WorkUnit::new("save_csv")
            .with_args(&["a", "b"])
            .unwrap();
        assert_eq!(unit.id(), "save_csv");
        assert_eq!(unit.payload(), br#"["a","b"]"#);
    }

    #[test]
    fn test_outcomes_normalize() {
        assert!(().into_result().is_ok());

        let failed: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(failed.into_result().unwrap_err().to_string(), "disk full");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("saving flights")]
        struct Outer(#[source] std::io::Error);

        let error = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(error_chain(&error), "saving flights: disk full");
    }
}
