//! Custom snapshot protocol for types that define their own captured state.

/// Types that can capture a snapshot of their state and later restore it.
///
/// Implement this when cloning the whole value is wasteful or wrong, or when
/// only part of the value should participate in change detection. The scope
/// compares captured states with `PartialEq` to decide whether a target
/// changed, and calls [`restore`](Restorable::restore) only when it did.
///
/// # Example
///
/// ```
/// use snapguard::Restorable;
/// use std::collections::BTreeMap;
///
/// struct Cache {
///     entries: BTreeMap<String, u64>,
///     hits: u64, // bookkeeping, not part of the tracked state
/// }
///
/// impl Restorable for Cache {
///     type State = BTreeMap<String, u64>;
///
///     fn capture(&self) -> Self::State {
///         self.entries.clone()
///     }
///
///     fn restore(&mut self, state: &Self::State) {
///         self.entries = state.clone();
///     }
/// }
///
/// let mut cache = Cache { entries: BTreeMap::new(), hits: 0 };
/// let snapshot = cache.capture();
///
/// cache.entries.insert("k".to_string(), 1);
/// cache.hits += 1;
///
/// cache.restore(&snapshot);
/// assert!(cache.entries.is_empty());
/// assert_eq!(cache.hits, 1); // untouched by restore
/// ```
pub trait Restorable {
    /// The captured representation of this type's state.
    type State: PartialEq;

    /// Capture the current state.
    fn capture(&self) -> Self::State;

    /// Restore a previously captured state.
    fn restore(&mut self, state: &Self::State);
}
