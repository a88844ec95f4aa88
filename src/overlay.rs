//! Overlay axes.
//!
//! An overlay is an `(axis, value)` pair. A value names a subdirectory to
//! search under every root; a `None` value means the root itself. Several
//! entries may share an axis. Definition order is precedence order: later
//! overlays win on conflicting keys.

use crate::error::{ConfigError, Result};
use std::fmt;
use std::sync::Arc;

/// Separator used for combined overlay axis names and values.
pub const COMBINED_SEPARATOR: &str = "_";

/// Producer for overlay values that are only known at resolution time.
///
/// One deferred entry may expand to several overlays on its axis, or to
/// none when the producer returns an empty list.
pub type OverlayFn = Arc<dyn Fn() -> Vec<Option<String>> + Send + Sync>;

/// Value side of an overlay.
#[derive(Clone)]
pub enum OverlayValue {
    /// Fixed value. `None` searches the root directory itself.
    Fixed(Option<String>),
    /// Evaluated each time the search path is built.
    Deferred(OverlayFn),
}

impl OverlayValue {
    pub fn resolve(&self) -> Vec<Option<String>> {
        match self {
            OverlayValue::Fixed(value) => vec![value.clone()],
            OverlayValue::Deferred(produce) => produce(),
        }
    }
}

impl fmt::Debug for OverlayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayValue::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            OverlayValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A single overlay entry.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub axis: String,
    pub value: OverlayValue,
}

impl Overlay {
    pub fn new(axis: impl Into<String>, value: Option<String>) -> Self {
        Self {
            axis: axis.into(),
            value: OverlayValue::Fixed(value),
        }
    }
}

/// Ordered overlay definitions.
#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    overlays: Vec<Overlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an overlay. `None` means "the root itself".
    pub fn define(&mut self, axis: &str, value: Option<&str>) {
        self.overlays
            .push(Overlay::new(axis, value.map(str::to_string)));
    }

    /// Append one overlay per value, all on the same axis.
    pub fn define_values<I, S>(&mut self, axis: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.overlays.push(Overlay::new(axis, Some(value.into())));
        }
    }

    /// Append an overlay whose value is produced when the search path is built.
    pub fn define_deferred<F>(&mut self, axis: &str, produce: F)
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.push_deferred(axis, Arc::new(move || vec![produce()]));
    }

    /// Like [`define_deferred`](Self::define_deferred), but the producer
    /// yields any number of values, each searched as its own overlay.
    pub fn define_deferred_values<F>(&mut self, axis: &str, produce: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.push_deferred(
            axis,
            Arc::new(move || produce().into_iter().map(Some).collect()),
        );
    }

    fn push_deferred(&mut self, axis: &str, produce: OverlayFn) {
        self.overlays.push(Overlay {
            axis: axis.to_string(),
            value: OverlayValue::Deferred(produce),
        });
    }

    /// Append the cross product of two axes' current values.
    ///
    /// The new axis is named `first_second` and each value is the pair joined
    /// with [`COMBINED_SEPARATOR`], e.g. `prod` x `US` gives `prod_US`. The
    /// product is taken now; later changes to either axis are not reflected.
    /// A `None` side contributes nothing to the join, so (`None`, `US`) gives
    /// `US` and (`None`, `None`) stays the root. Such an entry names the same
    /// directory as the plain `US` overlay, so the search path keeps only the
    /// earlier one and the combined entry disappears.
    pub fn define_combined(&mut self, first: &str, second: &str) -> Result<()> {
        let firsts = self.values_of(first)?;
        let seconds = self.values_of(second)?;
        let axis = [first, second].join(COMBINED_SEPARATOR);

        for a in &firsts {
            for b in &seconds {
                let joined: Vec<&str> = [a.as_deref(), b.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                let value = (!joined.is_empty()).then(|| joined.join(COMBINED_SEPARATOR));
                self.overlays.push(Overlay::new(axis.clone(), value));
            }
        }
        Ok(())
    }

    /// Current values of every overlay on `axis`, in definition order.
    ///
    /// Deferred entries are expanded, so the result may be empty for an
    /// axis that exists.
    pub fn values_of(&self, axis: &str) -> Result<Vec<Option<String>>> {
        if !self.overlays.iter().any(|o| o.axis == axis) {
            return Err(ConfigError::unknown_overlay(axis));
        }
        Ok(self
            .overlays
            .iter()
            .filter(|o| o.axis == axis)
            .flat_map(|o| o.value.resolve())
            .collect())
    }

    /// Current values of all overlays, in definition order.
    pub fn values(&self) -> Vec<Option<String>> {
        self.overlays
            .iter()
            .flat_map(|o| o.value.resolve())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}
