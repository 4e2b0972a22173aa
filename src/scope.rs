//! Scoped tracking and rollback of shared values.

use crate::error::{FailedRestore, ScopeError, ScopeResult};
use crate::restore::Restorable;
use crate::slot::Slot;
use similar::{ChangeTag, TextDiff};
use std::fmt;
use tracing::{debug, info, warn};

/// Unchanged lines kept around each change in diff output.
const DEFAULT_DIFF_CONTEXT: usize = 3;

/// A tracked target: its name, its snapshot, and how to compare and restore.
trait Tracker {
    fn name(&self) -> &str;

    fn accepted(&self) -> bool;

    fn set_accepted(&mut self, accepted: bool);

    /// Whether the current value differs from the snapshot.
    fn is_changed(&self) -> ScopeResult<bool>;

    /// Restore the snapshot if the value changed. Returns `true` if a
    /// restoration write happened, `false` if the value was already equal.
    fn restore(&mut self) -> ScopeResult<bool>;

    /// Render the snapshot and the current value for diffing.
    fn render(&self) -> ScopeResult<(String, String)>;
}

/// Tracks a target by cloning its value and comparing with `PartialEq`.
struct CloneTracker<T> {
    name: String,
    slot: Slot<T>,
    snapshot: T,
    accepted: bool,
}

impl<T> Tracker for CloneTracker<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted(&self) -> bool {
        self.accepted
    }

    fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    fn is_changed(&self) -> ScopeResult<bool> {
        let current = self
            .slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        Ok(*current != self.snapshot)
    }

    fn restore(&mut self) -> ScopeResult<bool> {
        // Compare first so unchanged targets never take a mutable borrow.
        if !self.is_changed()? {
            return Ok(false);
        }
        let mut current = self
            .slot
            .try_borrow_mut()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        current.clone_from(&self.snapshot);
        Ok(true)
    }

    fn render(&self) -> ScopeResult<(String, String)> {
        let current = self
            .slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        Ok((format!("{:#?}", self.snapshot), format!("{:#?}", *current)))
    }
}

/// Tracks a target through its [`Restorable`] captured state.
struct StateTracker<T: Restorable> {
    name: String,
    slot: Slot<T>,
    snapshot: T::State,
    accepted: bool,
}

impl<T> Tracker for StateTracker<T>
where
    T: Restorable,
    T::State: fmt::Debug,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted(&self) -> bool {
        self.accepted
    }

    fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    fn is_changed(&self) -> ScopeResult<bool> {
        let current = self
            .slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        Ok(current.capture() != self.snapshot)
    }

    fn restore(&mut self) -> ScopeResult<bool> {
        if !self.is_changed()? {
            return Ok(false);
        }
        let mut current = self
            .slot
            .try_borrow_mut()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        current.restore(&self.snapshot);
        Ok(true)
    }

    fn render(&self) -> ScopeResult<(String, String)> {
        let current = self
            .slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(self.name.as_str()))?;
        Ok((
            format!("{:#?}", self.snapshot),
            format!("{:#?}", current.capture()),
        ))
    }
}

/// Tracks snapshots of [`Slot`] values and restores them at scope exit.
///
/// Targets are registered with [`track`](Self::track) (snapshot by clone) or
/// [`track_restorable`](Self::track_restorable) (snapshot by captured state).
/// When the scope exits, every target whose current value differs from its
/// snapshot is restored, most recently tracked first. Individual targets
/// survive rollback after [`accept`](Self::accept); [`commit`](Self::commit)
/// keeps everything.
///
/// Change detection is by value equality, so reassigning an equal value does
/// not count as a change and no restoration write happens for it.
///
/// Dropping a scope rolls it back as well, so tracked targets are restored on
/// early returns, `?` propagation, and panics. Failures during a drop-time
/// rollback are logged; call [`exit`](Self::exit) to observe them as an error.
///
/// # Example
///
/// ```
/// use snapguard::{Scope, ScopeResult, Slot};
///
/// fn main() -> ScopeResult<()> {
///     let items = Slot::new(vec![1, 2, 3]);
///     let limit = Slot::new(10);
///
///     let mut scope = Scope::new();
///     scope.track("items", &items)?;
///     scope.track("limit", &limit)?;
///
///     items.borrow_mut().push(4);
///     limit.set(99);
///     scope.accept("limit")?;
///
///     scope.exit()?;
///     assert_eq!(items.get(), vec![1, 2, 3]); // rolled back
///     assert_eq!(limit.get(), 99); // accepted
///     Ok(())
/// }
/// ```
pub struct Scope {
    label: Option<String>,
    targets: Vec<Box<dyn Tracker>>,
    diff_context: usize,
    finished: bool,
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self {
            label: None,
            targets: Vec::new(),
            diff_context: DEFAULT_DIFF_CONTEXT,
            finished: false,
        }
    }

    /// Create an empty scope with a label used in log output.
    pub fn named(label: impl Into<String>) -> Self {
        let mut scope = Self::new();
        scope.label = Some(label.into());
        scope
    }

    /// Set how many unchanged lines surround each change in
    /// [`diff`](Self::diff) output.
    pub fn with_diff_context(mut self, context: usize) -> Self {
        self.diff_context = context;
        self
    }

    /// Snapshot `slot` by cloning its current value and track it as `name`.
    ///
    /// The same slot may be tracked under several names; each name keeps the
    /// snapshot taken at its own `track` call. Names must be unique within
    /// the scope.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateTarget`] if `name` is already tracked
    /// and [`ScopeError::TargetBusy`] if the slot is mutably borrowed.
    pub fn track<T>(&mut self, name: impl Into<String>, slot: &Slot<T>) -> ScopeResult<()>
    where
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        let name = name.into();
        self.check_new_name(&name)?;
        let snapshot = slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(name.as_str()))?
            .clone();
        debug!(scope = self.label(), name = %name, snapshot = ?snapshot, "tracking target");
        self.targets.push(Box::new(CloneTracker {
            name,
            slot: slot.clone(),
            snapshot,
            accepted: false,
        }));
        Ok(())
    }

    /// Snapshot `slot` through its [`Restorable`] implementation and track it
    /// as `name`.
    ///
    /// Change detection compares captured states, so fields outside the
    /// captured state neither trigger rollback nor get restored.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateTarget`] if `name` is already tracked
    /// and [`ScopeError::TargetBusy`] if the slot is mutably borrowed.
    pub fn track_restorable<T>(
        &mut self,
        name: impl Into<String>,
        slot: &Slot<T>,
    ) -> ScopeResult<()>
    where
        T: Restorable + 'static,
        T::State: fmt::Debug,
    {
        let name = name.into();
        self.check_new_name(&name)?;
        let snapshot = slot
            .try_borrow()
            .map_err(|_| ScopeError::target_busy(name.as_str()))?
            .capture();
        debug!(scope = self.label(), name = %name, state = ?snapshot, "tracking target state");
        self.targets.push(Box::new(StateTracker {
            name,
            slot: slot.clone(),
            snapshot,
            accepted: false,
        }));
        Ok(())
    }

    /// Whether the target tracked as `name` currently differs from its
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::UnknownTarget`] if `name` is not tracked and
    /// [`ScopeError::TargetBusy`] if the slot is mutably borrowed.
    pub fn is_changed(&self, name: &str) -> ScopeResult<bool> {
        self.find(name)?.is_changed()
    }

    /// Names of all targets that currently differ from their snapshots, in
    /// tracking order.
    pub fn changed(&self) -> ScopeResult<Vec<&str>> {
        let mut changed = Vec::new();
        for target in &self.targets {
            if target.is_changed()? {
                changed.push(target.name());
            }
        }
        Ok(changed)
    }

    /// Let the target tracked as `name` keep its current value at exit.
    pub fn accept(&mut self, name: &str) -> ScopeResult<()> {
        self.find_mut(name)?.set_accepted(true);
        debug!(scope = self.label(), name = %name, "accepted target");
        Ok(())
    }

    /// Undo a previous [`accept`](Self::accept); the target will be restored
    /// at exit again.
    pub fn unaccept(&mut self, name: &str) -> ScopeResult<()> {
        self.find_mut(name)?.set_accepted(false);
        debug!(scope = self.label(), name = %name, "unaccepted target");
        Ok(())
    }

    /// Accept every tracked target.
    ///
    /// Unlike [`commit`](Self::commit) this keeps the scope alive, so targets
    /// can still be unaccepted or tracked afterwards.
    pub fn accept_all(&mut self) {
        for target in &mut self.targets {
            target.set_accepted(true);
        }
        debug!(
            scope = self.label(),
            targets = self.targets.len(),
            "accepted all targets"
        );
    }

    /// Render a unified diff between the snapshot and the current value of
    /// the target tracked as `name`.
    ///
    /// Values are rendered with their `Debug` representation. Returns an
    /// empty string when nothing differs.
    pub fn diff(&self, name: &str) -> ScopeResult<String> {
        let target = self.find(name)?;
        let (snapshot, current) = target.render()?;
        Ok(render_diff(
            target.name(),
            &snapshot,
            &current,
            self.diff_context,
        ))
    }

    /// Names of all tracked targets, in tracking order.
    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name()).collect()
    }

    /// Number of tracked targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the scope tracks no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Exit the scope, restoring every changed, unaccepted target.
    ///
    /// Restoration is best-effort: a target that cannot be restored is
    /// recorded and the remaining targets are still attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::RollbackIncomplete`] listing the targets that
    /// could not be restored.
    pub fn exit(mut self) -> ScopeResult<()> {
        self.finished = true;
        let failures = self.rollback();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::RollbackIncomplete(failures))
        }
    }

    /// Finish the scope keeping the current value of every target.
    pub fn commit(mut self) {
        self.finished = true;
        info!(
            scope = self.label(),
            targets = self.targets.len(),
            "scope committed"
        );
    }

    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("scope")
    }

    fn check_new_name(&self, name: &str) -> ScopeResult<()> {
        if self.targets.iter().any(|t| t.name() == name) {
            return Err(ScopeError::duplicate_target(name));
        }
        Ok(())
    }

    fn find(&self, name: &str) -> ScopeResult<&dyn Tracker> {
        self.targets
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
            .ok_or_else(|| ScopeError::unknown_target(name))
    }

    fn find_mut(&mut self, name: &str) -> ScopeResult<&mut Box<dyn Tracker>> {
        self.targets
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| ScopeError::unknown_target(name))
    }

    /// Restore targets in reverse tracking order, collecting failures.
    fn rollback(&mut self) -> Vec<FailedRestore> {
        let scope = self.label().to_string();
        let mut failures = Vec::new();
        let mut restored = 0usize;
        let mut skipped = 0usize;

        for target in self.targets.iter_mut().rev() {
            if target.accepted() {
                debug!(scope = %scope, name = %target.name(), "target accepted, keeping value");
                skipped += 1;
                continue;
            }
            match target.restore() {
                Ok(true) => {
                    debug!(scope = %scope, name = %target.name(), "restored snapshot");
                    restored += 1;
                }
                Ok(false) => {
                    skipped += 1;
                }
                Err(err) => {
                    warn!(scope = %scope, name = %target.name(), error = %err, "failed to restore target");
                    failures.push(FailedRestore {
                        name: target.name().to_string(),
                        error: Box::new(err),
                    });
                }
            }
        }

        if !self.targets.is_empty() {
            info!(
                scope = %scope,
                restored,
                skipped,
                failed = failures.len(),
                "scope exited"
            );
        }
        failures
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("label", &self.label)
            .field("targets", &self.names())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let failures = self.rollback();
        if !failures.is_empty() {
            warn!(
                scope = self.label(),
                failed = failures.len(),
                "scope dropped with unrestored targets"
            );
        }
    }
}

/// Run `body` with a fresh [`Scope`], rolling back tracked targets afterwards.
///
/// The scope exits whether `body` succeeds or fails. When `body` fails, its
/// error is propagated and a rollback failure is only logged; when `body`
/// succeeds, a rollback failure surfaces as the returned error.
///
/// # Example
///
/// ```
/// use snapguard::{scoped, ScopeError, Slot};
///
/// let items = Slot::new(vec![1, 2]);
/// let len: Result<usize, ScopeError> = scoped(|scope| {
///     scope.track("items", &items)?;
///     items.borrow_mut().push(3);
///     Ok(items.with(|v| v.len()))
/// });
/// assert_eq!(len.unwrap(), 3);
/// assert_eq!(items.get(), vec![1, 2]); // rolled back
/// ```
pub fn scoped<T, E, F>(body: F) -> Result<T, E>
where
    F: FnOnce(&mut Scope) -> Result<T, E>,
    E: From<ScopeError>,
{
    let mut scope = Scope::new();
    match body(&mut scope) {
        Ok(value) => {
            scope.exit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(restore_err) = scope.exit() {
                warn!(error = %restore_err, "rollback incomplete while propagating body error");
            }
            Err(err)
        }
    }
}

/// Generate a unified diff between a snapshot and a current rendering.
fn render_diff(name: &str, snapshot: &str, current: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(snapshot, current);
    let groups = diff.grouped_ops(context);
    if groups.is_empty() {
        return String::new();
    }

    let mut output = String::new();
    output.push_str(&format!("--- {name} (snapshot)\n"));
    output.push_str(&format!("+++ {name} (current)\n"));

    for (idx, group) in groups.iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }

        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };

                output.push_str(sign);
                output.push_str(change.value());
                if !change.value().ends_with('\n') {
                    output.push('\n');
                }
            }
        }
    }

    output
}
