//! Resolution stack bookkeeping for cycle detection.

use std::cell::RefCell;

use crate::error::DiError;

/// Pops the entry it pushed when dropped, on every exit path.
pub(crate) struct StackGuard<'s, T> {
    stack: &'s RefCell<Vec<T>>,
}

impl<'s, T> StackGuard<'s, T> {
    pub(crate) fn push(stack: &'s RefCell<Vec<T>>, entry: T) -> Self {
        stack.borrow_mut().push(entry);
        Self { stack }
    }
}

impl<T> Drop for StackGuard<'_, T> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// Builds the error for a cycle that re-enters `repeated`, reporting the
/// path from its first occurrence back to itself, e.g. `a -> b -> c -> a`.
pub(crate) fn circular_path<'a, I>(stack: I, repeated: &str) -> DiError
where
    I: IntoIterator<Item = &'a str>,
{
    let mut path: Vec<String> = stack
        .into_iter()
        .skip_while(|entry| *entry != repeated)
        .map(str::to_string)
        .collect();
    path.push(repeated.to_string());
    DiError::CircularDependency { path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_pops_on_drop() {
        let stack = RefCell::new(vec!["root"]);
        {
            let _guard = StackGuard::push(&stack, "child");
            assert_eq!(stack.borrow().len(), 2);
        }
        assert_eq!(*stack.borrow(), vec!["root"]);
    }

    #[test]
    fn path_starts_at_first_occurrence() {
        let error = circular_path(["root", "a", "b", "c"], "a");
        assert_eq!(error.to_string(), "Circular dependency: a -> b -> c -> a");
    }
}
