use std::collections::BTreeSet;
use std::fmt;

/// Absolute frame indices at which a known identity was matched.
///
/// Set semantics: duplicates collapse and insertion order is irrelevant.
/// Iteration is always ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HitIndexSet {
    indices: BTreeSet<usize>,
}

impl HitIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the index was not already present.
    pub fn insert(&mut self, index: usize) -> bool {
        self.indices.insert(index)
    }

    /// Moves every index of `other` into `self`.
    pub fn union(&mut self, other: HitIndexSet) {
        self.indices.extend(other.indices);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Largest index in the set.
    pub fn last(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

/// `[20, 25, 70]`, ascending.
impl fmt::Display for HitIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "]")
    }
}

impl FromIterator<usize> for HitIndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

impl Extend<usize> for HitIndexSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.indices.extend(iter);
    }
}
