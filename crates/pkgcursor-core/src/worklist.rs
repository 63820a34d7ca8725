/// Ordered list of path arguments, edited in place by manifest expansion.
///
/// A slot is taken out while its manifest is parsed; it is either restored
/// verbatim or replaced by the manifest's entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worklist {
    items: Vec<String>,
}

impl Worklist {
    /// Wrap `items`.
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slot `i`, if present.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.items.get(i).map(String::as_str)
    }

    /// Remove the content of slot `i`, leaving an empty placeholder.
    pub fn take(&mut self, i: usize) -> Option<String> {
        self.items.get_mut(i).map(std::mem::take)
    }

    /// Put `item` back into slot `i`.
    pub fn restore(&mut self, i: usize, item: String) {
        if let Some(slot) = self.items.get_mut(i) {
            *slot = item;
        }
    }

    /// Replace slot `i` by `entries`, shifting later slots back.
    pub fn splice(&mut self, i: usize, entries: Vec<String>) {
        if i < self.items.len() {
            self.items.splice(i..=i, entries);
        }
    }

    /// Current slots.
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Worklist {
        Worklist::new(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_take_and_restore() {
        let mut wl = list(&["a", "m", "c"]);
        let taken = wl.take(1).unwrap();
        assert_eq!(wl.get(1), Some(""));
        wl.restore(1, taken);
        assert_eq!(wl, list(&["a", "m", "c"]));
    }

    #[test]
    fn test_splice() {
        let mut wl = list(&["a", "m", "c"]);
        wl.take(1);
        wl.splice(1, vec!["x".into(), "y".into()]);
        assert_eq!(wl.as_slice(), ["a", "x", "y", "c"]);

        wl.splice(9, vec!["z".into()]);
        assert_eq!(wl.len(), 4);
    }
}
