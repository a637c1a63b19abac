use itertools::Itertools;

use crate::{
    precision::Dpe,
    roots::{Cluster, Inclusion, RootStatus},
    solver::{
        cluster::{within_tolerance, Analysis},
        context::Goal,
    },
};

/// Verdict on one root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub status: RootStatus,
    pub inclusion: Inclusion,
    pub guaranteed: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Assessment {
    pub verdicts: Vec<Verdict>,
    /// Components of two or more roots, indexed by [`RootStatus`].
    pub clusters: Vec<Cluster>,
}

impl Assessment {
    pub fn satisfied(&self) -> bool {
        self.verdicts.iter().all(|v| v.guaranteed)
    }
}

/// Exact roots at the origin, factored out before iterating. They follow
/// the iterated roots in the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Origin {
    pub multiplicity: usize,
    pub inclusion: Inclusion,
}

impl Origin {
    pub const NONE: Self = Self {
        multiplicity: 0,
        inclusion: Inclusion::Inside,
    };

    /// Status of the roots at the origin when no other disk reaches it, and
    /// the cluster they form, numbered `cluster`.
    pub fn alone(self, cluster: usize, first: usize) -> (RootStatus, Option<Cluster>) {
        if self.multiplicity <= 1 {
            return (RootStatus::Approximated, None);
        }
        let members = (first..first + self.multiplicity).collect();
        let status = RootStatus::Multiple {
            cluster,
            multiplicity: self.multiplicity,
        };
        (status, Some(Cluster::new(members, true)))
    }

    /// Whether the roots at the origin meet `goal`.
    pub fn met(self, goal: Goal, isolated: bool) -> bool {
        match goal {
            Goal::Count => self.inclusion != Inclusion::Uncertain,
            _ if self.inclusion == Inclusion::Outside => true,
            Goal::Approximate => true,
            Goal::Isolate => isolated,
        }
    }
}

/// Decides which roots meet `goal`.
///
/// A root certainly outside the search region needs nothing more for the
/// approximate and isolate goals. A root marked `ambiguous` is never
/// guaranteed. The roots at `origin` get verdicts after the analyzed ones;
/// components whose disks reach the origin are merged with them into one
/// cluster that is not isolated.
pub(crate) fn assess(
    analysis: &Analysis,
    goal: Goal,
    tolerance: Dpe,
    ambiguous: &[bool],
    origin: Origin,
) -> Assessment {
    let n = analysis.radii.len();
    let reaches_origin: Vec<bool> = analysis
        .components
        .iter()
        .map(|c| origin.multiplicity > 0 && c.members.iter().any(|&i| analysis.covers_origin(i)))
        .collect();

    let mut verdicts = Vec::with_capacity(n + origin.multiplicity);
    let mut clusters = vec![];
    let mut cluster_of_component = vec![None; analysis.components.len()];
    for (c, component) in analysis.components.iter().enumerate() {
        if component.is_cluster() && !reaches_origin[c] {
            cluster_of_component[c] = Some(clusters.len());
            clusters.push(Cluster::new(component.members.clone(), component.verified));
        }
    }

    let at_origin: Vec<usize> = analysis
        .components
        .iter()
        .zip(&reaches_origin)
        .filter(|(_, reaches)| **reaches)
        .flat_map(|(c, _)| c.members.iter().copied())
        .sorted_unstable()
        .chain(n..n + origin.multiplicity)
        .collect();
    let origin_isolated = at_origin.len() == origin.multiplicity;
    let origin_status = if origin_isolated {
        let (status, cluster) = origin.alone(clusters.len(), n);
        clusters.extend(cluster);
        status
    } else {
        clusters.push(Cluster::new(at_origin.clone(), false));
        RootStatus::ClusterMember {
            cluster: clusters.len() - 1,
            multiplicity: at_origin.len(),
        }
    };

    for i in 0..n {
        let c = analysis.component_of[i];
        let component = &analysis.components[c];
        let radius = analysis.radii[i];
        let accurate = within_tolerance(radius, tolerance, analysis.moduli[i]);
        let status = match cluster_of_component[c] {
            _ if !radius.is_finite() => RootStatus::Unrefined,
            _ if reaches_origin[c] => origin_status,
            None if accurate => RootStatus::Approximated,
            None => RootStatus::Isolated,
            Some(cluster) if component.verified => RootStatus::Multiple {
                cluster,
                multiplicity: component.members.len(),
            },
            Some(cluster) => RootStatus::ClusterMember {
                cluster,
                multiplicity: component.members.len(),
            },
        };
        let inclusion = component.inclusion;
        let met = match goal {
            Goal::Count => inclusion != Inclusion::Uncertain,
            _ if inclusion == Inclusion::Outside => true,
            Goal::Approximate => accurate,
            Goal::Isolate => !reaches_origin[c] && (!component.is_cluster() || component.verified),
        };
        verdicts.push(Verdict {
            status,
            inclusion,
            guaranteed: met && !ambiguous[i],
        });
    }

    let origin_met = origin.met(goal, origin_isolated);
    verdicts.extend((0..origin.multiplicity).map(|_| Verdict {
        status: origin_status,
        inclusion: origin.inclusion,
        guaranteed: origin_met,
    }));

    Assessment { verdicts, clusters }
}

#[cfg(test)]
mod test {
    use super::{assess, Origin};
    use crate::{
        precision::Dpe,
        roots::{Inclusion, RootStatus},
        solver::{
            cluster::{Analysis, Component},
            context::Goal,
        },
    };

    /// Roots 0 and 1 form a cluster, root 2 is alone.
    fn analysis(radii: [f64; 3], verified: bool, inclusion: [Inclusion; 2]) -> Analysis {
        Analysis {
            radii: radii.iter().map(|&r| Dpe::from_f64(r)).collect(),
            moduli: vec![Dpe::ONE; 3],
            components: vec![
                Component {
                    members: vec![0, 1],
                    verified,
                    inclusion: inclusion[0],
                },
                Component {
                    members: vec![2],
                    verified: false,
                    inclusion: inclusion[1],
                },
            ],
            component_of: vec![0, 0, 1],
        }
    }

    #[test]
    fn approximate() {
        let a = analysis([1e-12, 1e-12, 1e-3], true, [Inclusion::Inside; 2]);
        let out = assess(&a, Goal::Approximate, Dpe::exp10(-10), &[false; 3], Origin::NONE);
        assert!(!out.satisfied());
        assert_eq!(out.verdicts[2].status, RootStatus::Isolated);
        assert!(!out.verdicts[2].guaranteed);
        assert_eq!(
            out.verdicts[0].status,
            RootStatus::Multiple { cluster: 0, multiplicity: 2 }
        );
        assert!(out.verdicts[0].guaranteed);
        assert_eq!(out.clusters.len(), 1);
        assert_eq!(out.clusters[0].members(), &[0, 1]);
    }

    #[test]
    fn outside_roots_are_exempt() {
        let a = analysis([1e-12, 1e-12, 1e-3], true, [Inclusion::Inside, Inclusion::Outside]);
        let out = assess(&a, Goal::Approximate, Dpe::exp10(-10), &[false; 3], Origin::NONE);
        assert!(out.satisfied());
    }

    #[test]
    fn isolate() {
        let a = analysis([1e-3, 1e-3, 1e-3], false, [Inclusion::Inside; 2]);
        let out = assess(&a, Goal::Isolate, Dpe::exp10(-10), &[false; 3], Origin::NONE);
        assert_eq!(
            out.verdicts[1].status,
            RootStatus::ClusterMember { cluster: 0, multiplicity: 2 }
        );
        assert!(!out.verdicts[0].guaranteed);
        assert!(out.verdicts[2].guaranteed);
    }

    #[test]
    fn count() {
        let a = analysis([1e-3, 1e-3, 1e-3], false, [Inclusion::Outside, Inclusion::Uncertain]);
        let out = assess(&a, Goal::Count, Dpe::exp10(-10), &[false; 3], Origin::NONE);
        assert!(out.verdicts[0].guaranteed);
        assert!(!out.verdicts[2].guaranteed);
    }

    #[test]
    fn ambiguous_and_unrefined() {
        let mut a = analysis([1e-12, 1e-12, 1e-12], true, [Inclusion::Inside; 2]);
        a.radii[2] = Dpe::INFINITY;
        let out = assess(&a, Goal::Approximate, Dpe::exp10(-10), &[true, false, false], Origin::NONE);
        assert!(!out.verdicts[0].guaranteed);
        assert!(out.verdicts[1].guaranteed);
        assert_eq!(out.verdicts[2].status, RootStatus::Unrefined);
        assert!(!out.verdicts[2].guaranteed);
    }

    #[test]
    fn approximation_at_zero() {
        let mut a = analysis([1e-300, 1e-12, 1e-3], true, [Inclusion::Inside; 2]);
        a.moduli[0] = Dpe::ZERO;
        a.moduli[2] = Dpe::ZERO;
        let out = assess(&a, Goal::Approximate, Dpe::exp10(-10), &[false; 3], Origin::NONE);
        assert!(out.verdicts[0].guaranteed);
        assert_eq!(out.verdicts[2].status, RootStatus::Isolated);
        assert!(!out.verdicts[2].guaranteed);
    }

    #[test]
    fn roots_at_the_origin() {
        let a = analysis([1e-12, 1e-12, 1e-3], true, [Inclusion::Inside; 2]);
        let origin = Origin {
            multiplicity: 2,
            inclusion: Inclusion::Inside,
        };
        let out = assess(&a, Goal::Isolate, Dpe::exp10(-10), &[false; 3], origin);
        assert_eq!(out.verdicts.len(), 5);
        assert!(out.satisfied());
        assert_eq!(
            out.verdicts[3].status,
            RootStatus::Multiple { cluster: 1, multiplicity: 2 }
        );
        assert_eq!(out.clusters[1].members(), &[3, 4]);
        assert!(out.clusters[1].is_verified());
    }

    #[test]
    fn disk_over_the_origin() {
        let a = analysis([1e-12, 1e-12, 2.0], true, [Inclusion::Inside; 2]);
        let origin = Origin {
            multiplicity: 1,
            inclusion: Inclusion::Inside,
        };
        let out = assess(&a, Goal::Isolate, Dpe::exp10(-10), &[false; 3], origin);
        assert!(!out.satisfied());
        assert_eq!(out.clusters.len(), 2);
        assert_eq!(out.clusters[1].members(), &[2, 3]);
        assert!(!out.clusters[1].is_verified());
        for v in &out.verdicts[2..] {
            assert_eq!(v.status, RootStatus::ClusterMember { cluster: 1, multiplicity: 2 });
            assert!(!v.guaranteed);
        }
        assert!(out.verdicts[0].guaranteed);

        let out = assess(&a, Goal::Approximate, Dpe::exp10(-10), &[false; 3], origin);
        assert!(!out.verdicts[2].guaranteed);
        assert!(out.verdicts[3].guaranteed);
    }
}
