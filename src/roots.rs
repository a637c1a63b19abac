//! The frozen result of a solve.

use std::fmt;

use num::Complex;

use crate::{
    precision::{BigFloat, Dpe},
    util::complex::complex_fmt,
};

/// What is known about one approximation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RootStatus {
    /// No inclusion information, the solve stopped before any analysis.
    Unrefined,
    /// Isolated, and its radius meets the requested relative accuracy.
    Approximated,
    /// Its disk contains exactly one root, but the radius does not meet the
    /// requested accuracy.
    Isolated,
    /// Its disk overlaps others; `multiplicity` roots lie in the union of the
    /// disks of [`RootSet::clusters`]`[cluster]`.
    ClusterMember { cluster: usize, multiplicity: usize },
    /// Member of a cluster tight enough to be reported as a root of
    /// multiplicity `multiplicity`.
    Multiple { cluster: usize, multiplicity: usize },
}

/// Position of an inclusion disk relative to the search region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Inclusion {
    Inside,
    Outside,
    Uncertain,
}

/// A root approximation and the disk guaranteed to contain a root.
#[derive(Clone, Debug)]
pub struct Root {
    value: Complex<BigFloat>,
    radius: Dpe,
    status: RootStatus,
    inclusion: Inclusion,
    guaranteed: bool,
}

impl Root {
    pub(crate) const fn new(
        value: Complex<BigFloat>,
        radius: Dpe,
        status: RootStatus,
        inclusion: Inclusion,
        guaranteed: bool,
    ) -> Self {
        Self {
            value,
            radius,
            status,
            inclusion,
            guaranteed,
        }
    }

    /// The approximation, exactly as the engine held it.
    #[must_use]
    pub const fn value(&self) -> &Complex<BigFloat> {
        &self.value
    }

    /// The approximation rounded to `f64`.
    #[must_use]
    pub fn value_f64(&self) -> Complex<f64> {
        Complex::new(self.value.re.to_f64(), self.value.im.to_f64())
    }

    /// Radius of the inclusion disk around [`Root::value`]. Infinite when
    /// nothing is known.
    #[must_use]
    pub const fn radius(&self) -> Dpe {
        self.radius
    }

    #[must_use]
    pub const fn status(&self) -> RootStatus {
        self.status
    }

    #[must_use]
    pub const fn inclusion(&self) -> Inclusion {
        self.inclusion
    }

    /// Whether this root meets the requested goal.
    #[must_use]
    pub const fn is_guaranteed(&self) -> bool {
        self.guaranteed
    }

    /// Whether `z` lies in the inclusion disk, up to the rounding of the
    /// distance computation.
    #[must_use]
    pub fn contains(&self, z: Complex<f64>) -> bool {
        let re = self.value.re.clone() - BigFloat::from_f64(z.re);
        let im = self.value.im.clone() - BigFloat::from_f64(z.im);
        let dist = (re.clone() * re + im.clone() * im).sqrt().to_dpe();
        dist <= self.radius
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = Complex::new(self.value.re.to_dpe(), self.value.im.to_dpe());
        write!(
            f,
            "{} ± {:.2} [{:?}]",
            complex_fmt(&value),
            self.radius,
            self.status
        )
    }
}

/// Indices of roots whose inclusion disks overlap transitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    members: Vec<usize>,
    verified: bool,
}

impl Cluster {
    pub(crate) const fn new(members: Vec<usize>, verified: bool) -> Self {
        Self { members, verified }
    }

    /// Indices into the [`RootSet`], in increasing order.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    #[must_use]
    pub fn multiplicity(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster is tight enough to count as a multiple root.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified
    }
}

/// All `n` root approximations of a degree `n` equation.
#[derive(Clone, Debug, Default)]
pub struct RootSet {
    roots: Vec<Root>,
    clusters: Vec<Cluster>,
}

impl RootSet {
    pub(crate) const fn new(roots: Vec<Root>, clusters: Vec<Cluster>) -> Self {
        Self { roots, clusters }
    }

    pub(crate) fn into_parts(self) -> (Vec<Root>, Vec<Cluster>) {
        (self.roots, self.clusters)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Root> {
        self.roots.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Root> {
        self.roots.iter()
    }

    #[must_use]
    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    /// Clusters of two or more roots, referenced by [`RootStatus`].
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// All approximations rounded to `f64`.
    #[must_use]
    pub fn values_f64(&self) -> Vec<Complex<f64>> {
        self.roots.iter().map(Root::value_f64).collect()
    }

    /// Whether every root meets the requested goal.
    #[must_use]
    pub fn all_guaranteed(&self) -> bool {
        self.roots.iter().all(Root::is_guaranteed)
    }
}

impl<'a> IntoIterator for &'a RootSet {
    type Item = &'a Root;
    type IntoIter = std::slice::Iter<'a, Root>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.iter()
    }
}

impl fmt::Display for RootSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            writeln!(f, "{root}")?;
        }
        Ok(())
    }
}
