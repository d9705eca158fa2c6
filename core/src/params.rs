use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use thiserror::Error;

/// A typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    /// Index into the parameter's option list.
    Choice(u32),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
            ParamValue::Choice(_) => "choice",
        }
    }
}

/// The type, range and default of a parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ParamKind {
    Float { min: f32, max: f32, default: f32 },
    Bool { default: bool },
    Choice { options: Vec<String>, default: u32 },
}

impl ParamKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Float { .. } => "float",
            ParamKind::Bool { .. } => "bool",
            ParamKind::Choice { .. } => "choice",
        }
    }

    /// Checks the declaration itself. Returns a description of the problem.
    fn validate(&self) -> Result<(), &'static str> {
        match self {
            ParamKind::Float { min, max, default } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err("range bounds must be finite");
                }
                if min > max {
                    return Err("minimum is above the maximum");
                }
                if default.is_nan() {
                    return Err("default is NaN");
                }
                Ok(())
            }
            ParamKind::Bool { .. } => Ok(()),
            ParamKind::Choice { options, default } => {
                if options.is_empty() {
                    return Err("no options");
                }
                if *default as usize >= options.len() {
                    return Err("default is past the option list");
                }
                Ok(())
            }
        }
    }

    /// Must only be called on a validated kind.
    fn default_value(&self) -> ParamValue {
        match self {
            ParamKind::Float { min, max, default } => ParamValue::Float(default.clamp(*min, *max)),
            ParamKind::Bool { default } => ParamValue::Bool(*default),
            ParamKind::Choice { default, .. } => ParamValue::Choice(*default),
        }
    }

    /// Checks a value against the kind and returns what would be stored.
    fn accept(&self, id: &str, value: ParamValue) -> Result<ParamValue, ParameterError> {
        match (self, value) {
            (ParamKind::Float { min, max, .. }, ParamValue::Float(v)) => {
                if v.is_nan() {
                    return Err(ParameterError::OutOfRange { id: id.to_owned() });
                }
                Ok(ParamValue::Float(v.clamp(*min, *max)))
            }
            (ParamKind::Bool { .. }, ParamValue::Bool(v)) => Ok(ParamValue::Bool(v)),
            (ParamKind::Choice { options, .. }, ParamValue::Choice(v)) => {
                if v as usize >= options.len() {
                    return Err(ParameterError::OutOfRange { id: id.to_owned() });
                }
                Ok(ParamValue::Choice(v))
            }
            _ => Err(ParameterError::TypeMismatch {
                id: id.to_owned(),
                expected: self.type_name(),
                found: value.type_name(),
            }),
        }
    }

    fn decode(&self, bits: u32) -> ParamValue {
        match self {
            ParamKind::Float { .. } => ParamValue::Float(f32::from_bits(bits)),
            ParamKind::Bool { .. } => ParamValue::Bool(bits != 0),
            ParamKind::Choice { .. } => ParamValue::Choice(bits),
        }
    }
}

fn encode(value: ParamValue) -> u32 {
    match value {
        ParamValue::Float(v) => v.to_bits(),
        ParamValue::Bool(v) => v as u32,
        ParamValue::Choice(v) => v,
    }
}

/// A single parameter declaration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ParamInfo {
    pub id: String,
    pub kind: ParamKind,
}

/// The set of parameters a store is built with. Empty by default.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ParameterLayout {
    params: Vec<ParamInfo>,
}

impl ParameterLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_float(mut self, id: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        self.params.push(ParamInfo {
            id: id.into(),
            kind: ParamKind::Float { min, max, default },
        });
        self
    }

    pub fn with_bool(mut self, id: impl Into<String>, default: bool) -> Self {
        self.params.push(ParamInfo {
            id: id.into(),
            kind: ParamKind::Bool { default },
        });
        self
    }

    pub fn with_choice<S: Into<String>>(
        mut self,
        id: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        default: u32,
    ) -> Self {
        self.params.push(ParamInfo {
            id: id.into(),
            kind: ParamKind::Choice {
                options: options.into_iter().map(Into::into).collect(),
                default,
            },
        });
        self
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Errors returned when reading or writing a parameter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Unknown parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("Parameter \"{id}\" holds a {expected} value, got a {found}")]
    TypeMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Value out of range for parameter \"{id}\"")]
    OutOfRange { id: String },

    #[error("Invalid declaration of parameter \"{id}\": {reason}")]
    InvalidLayout { id: String, reason: &'static str },
}

/// A flat map of parameter id to value, as produced by
/// [`ParameterStore::snapshot`].
pub type ParameterSnapshot = BTreeMap<String, ParamValue>;

/// Parameter values shared between a control thread and the render thread.
///
/// Every value lives in its own atomic, so reads never block. Cloning the
/// store gives another handle to the same values.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    params: Arc<[ParamInfo]>,
    index: Arc<BTreeMap<String, usize>>,
    values: Arc<[AtomicU32]>,
    changes: Arc<AtomicU64>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self {
            params: Vec::new().into(),
            index: Arc::new(BTreeMap::new()),
            values: Vec::new().into(),
            changes: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ParameterStore {
    /// Creates a store holding the defaults of every declared parameter.
    /// Fails with `InvalidLayout` for a float range that is empty or not
    /// finite, or a choice without options or with its default past them.
    pub fn new(layout: ParameterLayout) -> Result<Self, ParameterError> {
        let mut params = Vec::with_capacity(layout.params.len());
        let mut index = BTreeMap::new();

        for info in layout.params {
            if let Err(reason) = info.kind.validate() {
                return Err(ParameterError::InvalidLayout {
                    id: info.id,
                    reason,
                });
            }
            if index.contains_key(&info.id) {
                log::warn!("Parameter \"{}\" is declared twice, keeping the first", info.id);
                continue;
            }
            index.insert(info.id.clone(), params.len());
            params.push(info);
        }

        let values = params
            .iter()
            .map(|info| AtomicU32::new(encode(info.kind.default_value())))
            .collect();

        log::debug!("Created parameter store with {} parameters", params.len());

        Ok(Self {
            params: params.into(),
            index: Arc::new(index),
            values,
            changes: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Position of a parameter, for use with [`ParameterReader::get`].
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn lookup(&self, id: &str) -> Result<usize, ParameterError> {
        self.index_of(id)
            .ok_or_else(|| ParameterError::UnknownParameter(id.to_owned()))
    }

    fn load(&self, index: usize) -> ParamValue {
        let bits = self.values[index].load(Ordering::Acquire);
        self.params[index].kind.decode(bits)
    }

    pub fn get(&self, id: &str) -> Result<ParamValue, ParameterError> {
        let index = self.lookup(id)?;
        Ok(self.load(index))
    }

    /// Stores a value and returns what was stored. Float values are clamped
    /// to the declared range.
    pub fn set(&self, id: &str, value: ParamValue) -> Result<ParamValue, ParameterError> {
        let index = self.lookup(id)?;
        let value = self.params[index].kind.accept(id, value)?;
        let previous = self.values[index].swap(encode(value), Ordering::AcqRel);
        if previous != encode(value) {
            self.changes.fetch_add(1, Ordering::AcqRel);
        }
        Ok(value)
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        self.params
            .iter()
            .enumerate()
            .map(|(i, info)| (info.id.clone(), self.load(i)))
            .collect()
    }

    /// Applies the values in a snapshot. Unknown ids and values that no
    /// longer fit their parameter are skipped.
    pub fn restore(&self, snapshot: &ParameterSnapshot) {
        for (id, value) in snapshot {
            match self.set(id, *value) {
                Ok(_) => {}
                Err(ParameterError::UnknownParameter(_)) => {
                    log::debug!("Skipping unknown parameter \"{}\" in snapshot", id);
                }
                Err(err) => log::warn!("Skipping parameter in snapshot: {}", err),
            }
        }
    }

    /// Number of value changes since the store was created.
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Acquire)
    }

    pub fn reader(&self) -> ParameterReader {
        ParameterReader {
            store: self.clone(),
        }
    }
}

/// Wait-free read access to a parameter store, for the render thread.
#[derive(Debug, Clone)]
pub struct ParameterReader {
    store: ParameterStore,
}

impl ParameterReader {
    pub fn get(&self, index: usize) -> Option<ParamValue> {
        if index < self.store.values.len() {
            Some(self.store.load(index))
        } else {
            None
        }
    }

    /// Compare against a previous value to know whether anything changed.
    pub fn changes(&self) -> u64 {
        self.store.changes()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ParameterStore {
        ParameterStore::new(
            ParameterLayout::new()
                .with_float("gain", 0.0, 2.0, 1.0)
                .with_bool("mute", false)
                .with_choice("mode", ["poly", "mono", "legato"], 0),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let store = store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("gain"), Ok(ParamValue::Float(1.0)));
        assert_eq!(store.get("mute"), Ok(ParamValue::Bool(false)));
        assert_eq!(store.get("mode"), Ok(ParamValue::Choice(0)));
        assert_eq!(store.changes(), 0);
    }

    #[test]
    fn test_empty_store() {
        let store = ParameterStore::default();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(
            store.get("gain"),
            Err(ParameterError::UnknownParameter("gain".to_owned()))
        );
    }

    #[test]
    fn test_set() {
        let store = store();
        assert_eq!(
            store.set("gain", ParamValue::Float(0.5)),
            Ok(ParamValue::Float(0.5))
        );
        assert_eq!(store.get("gain"), Ok(ParamValue::Float(0.5)));

        store.set("mute", ParamValue::Bool(true)).unwrap();
        assert_eq!(store.get("mute"), Ok(ParamValue::Bool(true)));

        store.set("mode", ParamValue::Choice(2)).unwrap();
        assert_eq!(store.get("mode"), Ok(ParamValue::Choice(2)));
        assert_eq!(store.changes(), 3);

        // Same value again isn't a change
        store.set("mode", ParamValue::Choice(2)).unwrap();
        assert_eq!(store.changes(), 3);
    }

    #[test]
    fn test_set_errors() {
        let store = store();
        assert_eq!(
            store.set("volume", ParamValue::Float(0.5)),
            Err(ParameterError::UnknownParameter("volume".to_owned()))
        );
        assert!(matches!(
            store.set("gain", ParamValue::Bool(true)),
            Err(ParameterError::TypeMismatch {
                expected: "float",
                found: "bool",
                ..
            })
        ));
        assert!(matches!(
            store.set("mode", ParamValue::Choice(3)),
            Err(ParameterError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.set("gain", ParamValue::Float(f32::NAN)),
            Err(ParameterError::OutOfRange { .. })
        ));
        assert_eq!(store.changes(), 0);
        assert_eq!(store.get("gain"), Ok(ParamValue::Float(1.0)));
    }

    #[test]
    fn test_float_clamping() {
        let store = store();
        assert_eq!(
            store.set("gain", ParamValue::Float(5.0)),
            Ok(ParamValue::Float(2.0))
        );
        assert_eq!(
            store.set("gain", ParamValue::Float(f32::NEG_INFINITY)),
            Ok(ParamValue::Float(0.0))
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let store = store();
        store.set("gain", ParamValue::Float(0.25)).unwrap();
        store.set("mode", ParamValue::Choice(1)).unwrap();

        let snapshot = store.snapshot();
        let changes = store.changes();
        store.restore(&snapshot);
        assert_eq!(store.snapshot(), snapshot);
        assert_eq!(store.changes(), changes);

        let other = self::store();
        other.restore(&snapshot);
        assert_eq!(other.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_skips_bad_entries() {
        let store = store();
        let mut snapshot = ParameterSnapshot::new();
        snapshot.insert("volume".to_owned(), ParamValue::Float(0.1));
        snapshot.insert("mute".to_owned(), ParamValue::Float(1.0));
        snapshot.insert("mode".to_owned(), ParamValue::Choice(9));
        snapshot.insert("gain".to_owned(), ParamValue::Float(0.75));

        store.restore(&snapshot);
        assert_eq!(store.get("gain"), Ok(ParamValue::Float(0.75)));
        assert_eq!(store.get("mute"), Ok(ParamValue::Bool(false)));
        assert_eq!(store.get("mode"), Ok(ParamValue::Choice(0)));
        assert!(store.get("volume").is_err());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let store = ParameterStore::new(
            ParameterLayout::new()
                .with_bool("flag", true)
                .with_float("flag", 0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("flag"), Ok(ParamValue::Bool(true)));
    }

    #[test]
    fn test_invalid_layouts() {
        let layouts = [
            ("inverted", ParameterLayout::new().with_float("gain", 1.0, 0.0, 0.5)),
            ("nan bound", ParameterLayout::new().with_float("gain", f32::NAN, 1.0, 0.5)),
            ("infinite", ParameterLayout::new().with_float("gain", 0.0, f32::INFINITY, 0.5)),
            ("nan default", ParameterLayout::new().with_float("gain", 0.0, 1.0, f32::NAN)),
            ("no options", ParameterLayout::new().with_choice("mode", Vec::<String>::new(), 0)),
            ("bad default", ParameterLayout::new().with_choice("mode", ["a", "b"], 2)),
        ];

        for (name, layout) in layouts {
            assert!(
                matches!(
                    ParameterStore::new(layout),
                    Err(ParameterError::InvalidLayout { .. })
                ),
                "{} layout was accepted",
                name
            );
        }

        // A default outside a valid range is clamped, not rejected
        let store =
            ParameterStore::new(ParameterLayout::new().with_float("gain", 0.0, 1.0, 3.0)).unwrap();
        assert_eq!(store.get("gain"), Ok(ParamValue::Float(1.0)));
    }

    #[test]
    fn test_reader() {
        let store = store();
        let reader = store.reader();
        let gain = store.index_of("gain").unwrap();

        assert_eq!(reader.get(gain), Some(ParamValue::Float(1.0)));
        assert_eq!(reader.get(10), None);

        let before = reader.changes();
        store.set("gain", ParamValue::Float(1.5)).unwrap();
        assert_eq!(reader.get(gain), Some(ParamValue::Float(1.5)));
        assert!(reader.changes() > before);
    }
}
