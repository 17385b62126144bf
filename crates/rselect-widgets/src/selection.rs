#![forbid(unsafe_code)]

//! Selection binding between a form value and a remote option list.
//!
//! The bound value belongs to the owning form. The binding never drops it
//! because the current page of options happens not to contain it: such a
//! value is rendered as a pinned row so the field always shows what is
//! selected.
//!
//! # Events
//!
//! Every user pick ([`pick`](SelectionBinding::pick),
//! [`clear`](SelectionBinding::clear), a multi-select
//! [`toggle`](MultiSelectionBinding::toggle)) produces exactly one change
//! event, returned to the caller and delivered to the optional callback.
//! Re-binding from the form ([`sync_external`](SelectionBinding::sync_external))
//! produces none.
//!
//! # Example
//!
//! ```
//! use rselect_widgets::selection::SelectionBinding;
//!
//! let mut binding: SelectionBinding<String> = SelectionBinding::new(None);
//! let event = binding.pick("rust".to_string());
//! assert_eq!(event.value.as_deref(), Some("rust"));
//! assert!(binding.is_selected(&"rust".to_string()));
//! ```

use std::fmt;

use rselect_core::identity::{Identified, IdentityFn, Labeled};
use rselect_runtime::controller::ControllerState;

use crate::rows::OptionRow;

/// Emitted once per single-select pick or clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged<T> {
    /// Full entity, or `None` when cleared.
    pub value: Option<T>,
}

/// Emitted once per multi-select change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelectionChanged<T> {
    /// Full selection after the change, in pick order.
    pub values: Vec<T>,
}

type OnChange<E> = Box<dyn FnMut(&E) + Send>;

/// Single-value binding.
pub struct SelectionBinding<T> {
    selected: Option<T>,
    identity: IdentityFn<T>,
    on_change: Option<OnChange<SelectionChanged<T>>>,
    emitted: u64,
}

impl<T: fmt::Debug> fmt::Debug for SelectionBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionBinding")
            .field("selected", &self.selected)
            .field("has_on_change", &self.on_change.is_some())
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl<T: Identified + Clone + 'static> SelectionBinding<T> {
    /// Bind to the form's initial value.
    #[must_use]
    pub fn new(initial: Option<T>) -> Self {
        Self::with_identity(initial, IdentityFn::of_identified())
    }
}

impl<T: Clone> SelectionBinding<T> {
    /// Bind with a custom identity extractor.
    #[must_use]
    pub fn with_identity(initial: Option<T>, identity: IdentityFn<T>) -> Self {
        Self {
            selected: initial,
            identity,
            on_change: None,
            emitted: 0,
        }
    }

    /// Register the change callback.
    #[must_use]
    pub fn with_on_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&SelectionChanged<T>) + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// The bound value.
    #[inline]
    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    /// Identity key of the bound value.
    #[must_use]
    pub fn selected_key(&self) -> Option<String> {
        self.selected.as_ref().map(|v| self.identity.key_of(v))
    }

    /// Whether `item` is the bound value (identity equality).
    #[must_use]
    pub fn is_selected(&self, item: &T) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|v| self.identity.same(v, item))
    }

    /// User picked `value`.
    pub fn pick(&mut self, value: T) -> SelectionChanged<T> {
        rselect_core::debug!(
            target: "rselect.selection",
            key = %self.identity.key_of(&value),
            "option picked"
        );
        self.selected = Some(value);
        self.emit()
    }

    /// User picked the option at `index` of the controller's list.
    ///
    /// Out-of-range indices do nothing and emit nothing.
    pub fn pick_index(
        &mut self,
        state: &ControllerState<T>,
        index: usize,
    ) -> Option<SelectionChanged<T>> {
        let value = state.options().get(index)?.clone();
        Some(self.pick(value))
    }

    /// User cleared the field.
    pub fn clear(&mut self) -> SelectionChanged<T> {
        rselect_core::debug!(target: "rselect.selection", "selection cleared");
        self.selected = None;
        self.emit()
    }

    /// The form changed the value; re-bind without emitting.
    pub fn sync_external(&mut self, value: Option<T>) {
        self.selected = value;
    }

    /// Change events emitted so far.
    #[inline]
    pub fn events_emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self) -> SelectionChanged<T> {
        let event = SelectionChanged {
            value: self.selected.clone(),
        };
        self.emitted += 1;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&event);
        }
        event
    }
}

impl<T: Clone + Labeled> SelectionBinding<T> {
    /// Label for the closed field.
    ///
    /// Prefers the matching entity from `state` so that a renamed entity
    /// shows its current label.
    #[must_use]
    pub fn display_label(&self, state: &ControllerState<T>) -> Option<String> {
        let selected = self.selected.as_ref()?;
        let fresh = state
            .options()
            .iter()
            .find(|o| self.identity.same(o, selected));
        Some(fresh.unwrap_or(selected).label())
    }

    /// Rows for the open dropdown; the bound value is pinned first when
    /// the options do not contain it.
    #[must_use]
    pub fn rows(&self, state: &ControllerState<T>) -> Vec<OptionRow> {
        let selected_key = self.selected_key();
        let mut rows = Vec::with_capacity(state.options().len() + 1);

        if let Some(selected) = &self.selected {
            let present = state
                .options()
                .iter()
                .any(|o| self.identity.same(o, selected));
            if !present {
                rows.push(
                    OptionRow::new(self.identity.key_of(selected), selected.label())
                        .selected(true)
                        .pinned(true),
                );
            }
        }

        rows.extend(state.options().iter().map(|o| {
            let key = self.identity.key_of(o);
            let selected = selected_key.as_deref() == Some(key.as_str());
            OptionRow::new(key, o.label()).selected(selected)
        }));
        rows
    }
}

/// Multi-value binding.
pub struct MultiSelectionBinding<T> {
    selected: Vec<T>,
    identity: IdentityFn<T>,
    on_change: Option<OnChange<MultiSelectionChanged<T>>>,
    emitted: u64,
}

impl<T: fmt::Debug> fmt::Debug for MultiSelectionBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiSelectionBinding")
            .field("selected", &self.selected)
            .field("has_on_change", &self.on_change.is_some())
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl<T: Identified + Clone + 'static> MultiSelectionBinding<T> {
    /// Bind to the form's initial values.
    #[must_use]
    pub fn new(initial: Vec<T>) -> Self {
        Self::with_identity(initial, IdentityFn::of_identified())
    }
}

impl<T: Clone> MultiSelectionBinding<T> {
    /// Bind with a custom identity extractor. Duplicate keys in `initial`
    /// are dropped.
    #[must_use]
    pub fn with_identity(initial: Vec<T>, identity: IdentityFn<T>) -> Self {
        let mut binding = Self {
            selected: Vec::new(),
            identity,
            on_change: None,
            emitted: 0,
        };
        binding.sync_external(initial);
        binding
    }

    /// Register the change callback.
    #[must_use]
    pub fn with_on_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&MultiSelectionChanged<T>) + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Bound values in pick order.
    #[inline]
    pub fn selected(&self) -> &[T] {
        &self.selected
    }

    /// Number of bound values.
    #[inline]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether `item` is among the bound values.
    #[must_use]
    pub fn is_selected(&self, item: &T) -> bool {
        self.position(item).is_some()
    }

    /// User toggled `value`: add it if absent, remove it if present.
    pub fn toggle(&mut self, value: T) -> MultiSelectionChanged<T> {
        match self.position(&value) {
            Some(i) => {
                self.selected.remove(i);
            }
            None => self.selected.push(value),
        }
        self.emit()
    }

    /// User removed the value with identity `key` (chip close button).
    ///
    /// Unknown keys emit nothing.
    pub fn remove(&mut self, key: &str) -> Option<MultiSelectionChanged<T>> {
        let index = self
            .selected
            .iter()
            .position(|v| self.identity.key_of(v) == key)?;
        self.selected.remove(index);
        Some(self.emit())
    }

    /// User cleared every value.
    pub fn clear(&mut self) -> MultiSelectionChanged<T> {
        self.selected.clear();
        self.emit()
    }

    /// The form changed the values; re-bind without emitting.
    pub fn sync_external(&mut self, values: Vec<T>) {
        self.selected.clear();
        for value in values {
            if self.position(&value).is_none() {
                self.selected.push(value);
            }
        }
    }

    /// Change events emitted so far.
    #[inline]
    pub fn events_emitted(&self) -> u64 {
        self.emitted
    }

    fn position(&self, item: &T) -> Option<usize> {
        let key = self.identity.key_of(item);
        self.selected
            .iter()
            .position(|v| self.identity.key_of(v) == key)
    }

    fn emit(&mut self) -> MultiSelectionChanged<T> {
        let event = MultiSelectionChanged {
            values: self.selected.clone(),
        };
        self.emitted += 1;
        rselect_core::debug!(
            target: "rselect.selection",
            count = event.values.len(),
            "multi-selection changed"
        );
        if let Some(callback) = self.on_change.as_mut() {
            callback(&event);
        }
        event
    }
}

impl<T: Clone + Labeled> MultiSelectionBinding<T> {
    /// Rows for the open dropdown; bound values missing from the options
    /// are pinned first, in pick order.
    #[must_use]
    pub fn rows(&self, state: &ControllerState<T>) -> Vec<OptionRow> {
        let option_keys: Vec<String> = state
            .options()
            .iter()
            .map(|o| self.identity.key_of(o))
            .collect();
        let selected_keys: Vec<String> = self
            .selected
            .iter()
            .map(|v| self.identity.key_of(v))
            .collect();

        let pinned = self
            .selected
            .iter()
            .zip(&selected_keys)
            .filter(|(_, key)| !option_keys.contains(*key))
            .map(|(v, key)| {
                OptionRow::new(key.clone(), v.label())
                    .selected(true)
                    .pinned(true)
            });
        let listed = state.options().iter().zip(option_keys.iter()).map(|(o, key)| {
            OptionRow::new(key.clone(), o.label()).selected(selected_keys.contains(key))
        });
        pinned.chain(listed).collect()
    }
}
