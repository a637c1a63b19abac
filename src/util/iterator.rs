/// An iterator that counts up until it reaches max, at which point it saturates
///
/// This is an endless iterator.
#[inline]
pub fn saturating_counter() -> impl Iterator<Item = usize> {
    (0..usize::MAX).chain(std::iter::repeat(usize::MAX))
}

/// Union-find over `0..n`, used to group overlapping disks.
///
/// Roots are always the smallest index of their set, so the partition it
/// produces does not depend on the order in which edges are added.
pub(crate) struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            // path halving
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }

    /// Groups of indices, each sorted, ordered by their smallest member.
    pub fn groups(mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut slot = vec![usize::MAX; n];
        let mut groups: Vec<Vec<usize>> = vec![];
        for i in 0..n {
            let r = self.find(i);
            if slot[r] == usize::MAX {
                slot[r] = groups.len();
                groups.push(vec![]);
            }
            groups[slot[r]].push(i);
        }
        groups
    }
}
