//! Knuth–Morris–Pratt search for argument delimiters.
//!
//! Delimited macro arguments end at the first occurrence of the delimiter tokens.
//! The tokens arrive one at a time from the input,
//!     so the search must be incremental and may not back up.
//! A [Matcher] is built once, when the macro is defined,
//!     and a fresh [Search] is started for every argument scanned.

/// Precomputed data for finding one delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher<T> {
    delimiter: Vec<T>,
    prefix_fn: Vec<usize>,
}

impl<T: PartialEq> Matcher<T> {
    /// Returns [None] if the delimiter is empty.
    pub fn new(delimiter: Vec<T>) -> Option<Matcher<T>> {
        if delimiter.is_empty() {
            return None;
        }
        let mut prefix_fn = Vec::with_capacity(delimiter.len());
        prefix_fn.push(0);
        let mut k = 0;
        for i in 1..delimiter.len() {
            while k > 0 && delimiter[k] != delimiter[i] {
                k = prefix_fn[k - 1];
            }
            if delimiter[k] == delimiter[i] {
                k += 1;
            }
            prefix_fn.push(k);
        }
        Some(Matcher {
            delimiter,
            prefix_fn,
        })
    }

    pub fn start(&self) -> Search<'_, T> {
        Search {
            matcher: self,
            matched: 0,
        }
    }

    pub fn delimiter(&self) -> &[T] {
        &self.delimiter
    }
}

/// An in-progress search.
pub struct Search<'a, T> {
    matcher: &'a Matcher<T>,
    matched: usize,
}

impl<'a, T: PartialEq> Search<'a, T> {
    /// Feeds the next element; returns true if the delimiter ends at this element.
    pub fn next(&mut self, tail: &T) -> bool {
        let delimiter = &self.matcher.delimiter;
        while self.matched > 0 && &delimiter[self.matched] != tail {
            self.matched = self.matcher.prefix_fn[self.matched - 1];
        }
        if &delimiter[self.matched] == tail {
            self.matched += 1;
        }
        if self.matched == delimiter.len() {
            self.matched = self.matcher.prefix_fn[self.matched - 1];
            return true;
        }
        false
    }

    /// Abandons any partial match.
    pub fn reset(&mut self) {
        self.matched = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(delimiter: &str, input: &str) -> Vec<usize> {
        let matcher = Matcher::new(delimiter.chars().collect()).unwrap();
        let mut search = matcher.start();
        input
            .chars()
            .enumerate()
            .filter(|(_, c)| search.next(c))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn empty_delimiter() {
        assert_eq!(Matcher::<char>::new(vec![]), None);
    }

    #[test]
    fn single_element() {
        assert_eq!(run("x", "axbxx"), vec![1, 3, 4]);
    }

    #[test]
    fn overlapping_matches() {
        assert_eq!(run("aba", "ababa"), vec![2, 4]);
    }

    #[test]
    fn backs_up_after_partial_match() {
        assert_eq!(run("aab", "aaab"), vec![3]);
        assert_eq!(run("abac", "ababac"), vec![5]);
    }

    #[test]
    fn reset_forgets_partial_match() {
        let matcher = Matcher::new(vec!['a', 'b']).unwrap();
        let mut search = matcher.start();
        assert!(!search.next(&'a'));
        search.reset();
        assert!(!search.next(&'b'));
    }
}
