//! Buffer distance selection.

/// Buffer distances, in metres, offered for selection.
pub const CURATED_DISTANCES: [u32; 5] = [10, 50, 100, 200, 250];

/// Ordered, duplicate-free list of buffer distances in metres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDistances(Vec<u32>);

impl BufferDistances {
    /// Combine the primary `selected` distance with `additional` comparison
    /// distances. The primary distance comes first; later duplicates are
    /// dropped while keeping first-seen order.
    ///
    /// # Examples
    /// ```
    /// use corridor_data::BufferDistances;
    ///
    /// let distances = BufferDistances::from_selection(50, &[10, 50, 200, 10]);
    /// assert_eq!(distances.as_slice(), &[50, 10, 200]);
    /// ```
    #[must_use]
    pub fn from_selection(selected: u32, additional: &[u32]) -> Self {
        let mut distances = Vec::with_capacity(additional.len() + 1);
        for distance in std::iter::once(selected).chain(additional.iter().copied()) {
            if !distances.contains(&distance) {
                distances.push(distance);
            }
        }
        Self(distances)
    }

    /// Distances in processing order.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of distances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for values built by [`BufferDistances::from_selection`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Report whether `distance` is one of [`CURATED_DISTANCES`].
#[must_use]
pub fn is_curated(distance: u32) -> bool {
    CURATED_DISTANCES.contains(&distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, &[], &[100])]
    #[case(10, &[50, 100], &[10, 50, 100])]
    #[case(50, &[50, 50], &[50])]
    #[case(250, &[10, 250, 10, 200], &[250, 10, 200])]
    fn selection_keeps_primary_first_without_duplicates(
        #[case] selected: u32,
        #[case] additional: &[u32],
        #[case] expected: &[u32],
    ) {
        let distances = BufferDistances::from_selection(selected, additional);
        assert_eq!(distances.as_slice(), expected);
        assert_eq!(distances.len(), expected.len());
        assert!(!distances.is_empty());
    }

    #[rstest]
    #[case(10, true)]
    #[case(250, true)]
    #[case(75, false)]
    #[case(0, false)]
    fn curated_membership(#[case] distance: u32, #[case] expected: bool) {
        assert_eq!(is_curated(distance), expected);
    }
}
