//! Stack Module
//!
//! A plain LIFO stack over a `Vec`, with bulk pops that return elements in
//! either storage order or pop order.

use std::fmt;

// == Stack ==
/// Last-in, first-out stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Returns the top element without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Places `item` on top.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Removes and returns the top element.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    // == Bulk Pops ==
    /// Empties the stack, returning elements bottom first.
    pub fn pop_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Removes every element from position `index` up to the top, returning
    /// them bottom first. With five elements and `index == 2`, three are taken.
    ///
    /// An `index` past the top takes nothing.
    pub fn pop_from(&mut self, index: usize) -> Vec<T> {
        let index = index.min(self.items.len());
        self.items.drain(index..).collect()
    }

    /// Empties the stack, returning elements top first.
    pub fn pop_all_reverse(&mut self) -> Vec<T> {
        self.items.drain(..).rev().collect()
    }

    /// Like [`Stack::pop_from`], returning elements top first.
    pub fn pop_from_reverse(&mut self, index: usize) -> Vec<T> {
        let index = index.min(self.items.len());
        self.items.drain(index..).rev().collect()
    }
}

impl<T> Extend<T> for Stack<T> {
    /// Pushes every item in order, so the last one ends on top.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> FromIterator<T> for Stack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Stack (len {}, cap {})",
            self.items.len(),
            self.items.capacity()
        )?;
        writeln!(f, "=====")?;
        for (index, item) in self.items.iter().enumerate().rev() {
            writeln!(f, "{}: {}", index, item)?;
        }
        writeln!(f, "=====")
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Stack<i32> {
        (0..6).collect()
    }

    #[test]
    fn test_push_pop_peek() {
        let mut stack = Stack::new();
        assert_eq!(stack.peek(), None);
        assert_eq!(stack.pop(), None);

        stack.push(1);
        stack.extend([2, 3, 4]);
        assert_eq!(stack.len(), 4);
        assert_eq!(stack.peek(), Some(&4));
        assert_eq!(stack.pop(), Some(4));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_pop_all() {
        let mut stack = filled();
        assert_eq!(stack.pop_all(), vec![0, 1, 2, 3, 4, 5]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_all_reverse() {
        let mut stack = filled();
        assert_eq!(stack.pop_all_reverse(), vec![5, 4, 3, 2, 1, 0]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_from() {
        let mut stack = filled();
        assert_eq!(stack.pop_from(2), vec![2, 3, 4, 5]);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek(), Some(&1));
    }

    #[test]
    fn test_pop_from_reverse() {
        let mut stack = filled();
        assert_eq!(stack.pop_from_reverse(2), vec![5, 4, 3, 2]);
        assert_eq!(stack.pop_all(), vec![0, 1]);
    }

    #[test]
    fn test_pop_from_past_top_takes_nothing() {
        let mut stack = filled();
        assert!(stack.pop_from(10).is_empty());
        assert!(stack.pop_from_reverse(6).is_empty());
        assert_eq!(stack.len(), 6);
    }

    #[test]
    fn test_display_lists_top_first() {
        let mut stack = Stack::with_capacity(4);
        stack.extend(["a", "b"]);

        let rendered = stack.to_string();
        assert!(rendered.starts_with("Stack (len 2, cap 4)\n=====\n1: b\n0: a\n"));
        assert!(rendered.ends_with("=====\n"));
    }
}
