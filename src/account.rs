use std::sync::Arc;

use crate::Counter;

impl Counter {
    /// Accounts one unit until the returned guard is dropped.
    ///
    /// The unit is given back on every way out of the enclosing scope,
    /// including early returns through `?` and panics.
    ///
    /// ```
    /// use wait_counter::Counter;
    ///
    /// let in_flight = Counter::default();
    /// {
    ///     let _unit = in_flight.account();
    ///     assert_eq!(in_flight.value(), 1);
    /// }
    /// assert_eq!(in_flight.value(), 0);
    /// ```
    #[must_use = "the unit is given back as soon as the guard is dropped"]
    pub fn account(&self) -> Account<'_> {
        self.increment();
        Account { counter: self }
    }

    /// Same as [`Counter::account`] but keeps the counter alive, so the guard
    /// may be moved into a spawned thread.
    #[must_use = "the unit is given back as soon as the guard is dropped"]
    pub fn account_owned(self: &Arc<Self>) -> OwnedAccount {
        self.increment();
        OwnedAccount {
            counter: Arc::clone(self),
        }
    }

    /// Runs `f` while one unit is accounted.
    pub fn scope<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _unit = self.account();
        f()
    }
}

/// Decrements on drop
#[derive(Debug)]
pub struct Account<'a> {
    counter: &'a Counter,
}

impl Account<'_> {
    pub fn counter(&self) -> &Counter {
        self.counter
    }
}

impl Drop for Account<'_> {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}

/// Decrements on drop
#[derive(Debug)]
pub struct OwnedAccount {
    counter: Arc<Counter>,
}

impl OwnedAccount {
    pub fn counter(&self) -> &Arc<Counter> {
        &self.counter
    }
}

impl Drop for OwnedAccount {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}
