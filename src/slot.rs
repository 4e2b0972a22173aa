//! Shared mutable cells that scopes can snapshot and restore.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A shared, mutable cell holding a value a [`Scope`](crate::Scope) can track.
///
/// Cloning a `Slot` is cheap and produces another handle to the same cell,
/// so the caller and the scope both see every mutation. Borrow rules are
/// checked at runtime: at most one mutable borrow, or any number of shared
/// borrows, may be live at a time.
///
/// `Slot` is intentionally not `Send`; scopes and their targets live on a
/// single thread.
///
/// # Example
///
/// ```
/// use snapguard::Slot;
///
/// let numbers = Slot::new(vec![1, 2, 3]);
/// let alias = numbers.clone();
///
/// alias.borrow_mut().push(4);
/// assert_eq!(numbers.get(), vec![1, 2, 3, 4]);
/// ```
pub struct Slot<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Slot<T> {
    /// Create a new slot holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Replace the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }

    /// Overwrite the value.
    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }

    /// Borrow the value immutably.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently borrowed mutably. Use
    /// [`try_borrow`](Self::try_borrow) for a fallible variant.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Borrow the value mutably.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently borrowed. Use
    /// [`try_borrow_mut`](Self::try_borrow_mut) for a fallible variant.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Borrow the value immutably, failing if a mutable borrow is live.
    pub fn try_borrow(&self) -> Result<Ref<'_, T>, std::cell::BorrowError> {
        self.inner.try_borrow()
    }

    /// Borrow the value mutably, failing if any borrow is live.
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, std::cell::BorrowMutError> {
        self.inner.try_borrow_mut()
    }

    /// Run `f` with a shared borrow of the value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with a mutable borrow of the value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }
}

impl<T: Clone> Slot<T> {
    /// Return a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    /// Clone the handle, not the value. Both handles alias the same cell.
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => write!(f, "Slot({value:?})"),
            Err(_) => write!(f, "Slot(<borrowed>)"),
        }
    }
}

impl<T: PartialEq> PartialEq for Slot<T> {
    /// Slots compare by value, not by cell identity.
    ///
    /// # Panics
    ///
    /// Panics if the value in either slot is currently mutably borrowed.
    fn eq(&self, other: &Self) -> bool {
        *self.inner.borrow() == *other.inner.borrow()
    }
}
