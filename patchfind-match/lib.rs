//! Nearest-neighbour descriptor matching with a ratio test.

pub mod distance;
pub mod kdforest;

use log::debug;
use patchfind_core::{Correspondence, Descriptors, MatchConfig, MatchStrategy};
use rayon::prelude::*;

use crate::distance::{squared_distance_bounded, Nearest2};
use crate::kdforest::{KdForest, Visited};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    DimensionMismatch { target: usize, scene: usize },
    InvalidDimension(usize),
    InvalidRatio(f32),
    InvalidSearchParams { trees: usize, checks: usize },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::DimensionMismatch { target, scene } => {
                write!(f, "Descriptor length mismatch: target {}, scene {}", target, scene)
            }
            MatchError::InvalidDimension(d) => {
                write!(f, "Invalid descriptor length: {} (must be a positive multiple of 4)", d)
            }
            MatchError::InvalidRatio(r) => {
                write!(f, "Invalid ratio threshold: {} (must be in (0, 1])", r)
            }
            MatchError::InvalidSearchParams { trees, checks } => {
                write!(f, "Invalid k-d forest parameters: {} trees, {} checks (both must be >= 1)", trees, checks)
            }
        }
    }
}

impl std::error::Error for MatchError {}

pub type MatchResult<T> = Result<T, MatchError>;

#[derive(Debug, Clone)]
pub struct DescriptorMatcher {
    cfg: MatchConfig,
}

impl DescriptorMatcher {
    pub fn new(cfg: MatchConfig) -> MatchResult<Self> {
        if !(cfg.ratio > 0.0 && cfg.ratio <= 1.0) {
            return Err(MatchError::InvalidRatio(cfg.ratio));
        }
        if cfg.strategy == MatchStrategy::KdForest && (cfg.trees == 0 || cfg.checks == 0) {
            return Err(MatchError::InvalidSearchParams {
                trees: cfg.trees,
                checks: cfg.checks,
            });
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Correspondences `(target, scene)` whose nearest scene descriptor is
    /// closer than `ratio` times the second nearest, in target order.
    ///
    /// Distances are summed squared differences, so the ratio applies to
    /// squared lengths.
    pub fn match_descriptors(&self, target: &Descriptors, scene: &Descriptors) -> MatchResult<Vec<Correspondence>> {
        if target.dim() != scene.dim() {
            return Err(MatchError::DimensionMismatch {
                target: target.dim(),
                scene: scene.dim(),
            });
        }
        let dim = target.dim();
        if dim == 0 || dim % 4 != 0 {
            return Err(MatchError::InvalidDimension(dim));
        }
        if target.is_empty() || scene.len() < 2 {
            debug!(
                "Nothing to match: {} target vs {} scene descriptors",
                target.len(),
                scene.len()
            );
            return Ok(Vec::new());
        }

        let neighbours: Vec<Nearest2> = match self.cfg.strategy {
            MatchStrategy::KdForest => {
                let forest = KdForest::build(scene, self.cfg.trees, self.cfg.seed);
                target
                    .rows()
                    .collect::<Vec<_>>()
                    .par_iter()
                    .map_init(Visited::default, |visited, q| {
                        forest.nearest_two_with(q, self.cfg.checks, visited)
                    })
                    .collect()
            }
            MatchStrategy::BruteForce => target
                .rows()
                .collect::<Vec<_>>()
                .par_iter()
                .map(|q| exhaustive(scene, q))
                .collect(),
        };

        let matches: Vec<Correspondence> = neighbours
            .iter()
            .enumerate()
            .filter_map(|(t, n)| {
                let ((s1, d1), (_, d2)) = n.pair()?;
                (d1 < self.cfg.ratio * d2).then_some(Correspondence { target: t, scene: s1 })
            })
            .collect();

        debug!(
            "{:?} matching kept {} of {} target descriptors",
            self.cfg.strategy,
            matches.len(),
            target.len()
        );
        Ok(matches)
    }
}

fn exhaustive(scene: &Descriptors, query: &[f32]) -> Nearest2 {
    let mut best = Nearest2::default();
    for (i, row) in scene.rows().enumerate() {
        let d = squared_distance_bounded(query, row, best.worst());
        best.offer(i, d);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn table(rows: &[Vec<f32>]) -> Descriptors {
        let mut d = Descriptors::new(rows[0].len());
        rows.iter().for_each(|r| assert!(d.push(r)));
        d
    }

    fn matcher(strategy: MatchStrategy) -> DescriptorMatcher {
        DescriptorMatcher::new(MatchConfig {
            strategy,
            ..MatchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn exact_copy_is_accepted() {
        let target = table(&[vec![0.1, 0.2, 0.3, 0.4]]);
        let scene = table(&[
            vec![5.0, 5.0, 5.0, 5.0],
            vec![0.1, 0.2, 0.3, 0.4],
            vec![-4.0, 3.0, 9.0, 1.0],
        ]);
        for s in [MatchStrategy::KdForest, MatchStrategy::BruteForce] {
            let m = matcher(s).match_descriptors(&target, &scene).unwrap();
            assert_eq!(m, vec![Correspondence { target: 0, scene: 1 }]);
        }
    }

    #[test]
    fn equidistant_near_copies_are_rejected() {
        let target = table(&[vec![1.0, 1.0, 1.0, 1.0]]);
        let scene = table(&[
            vec![1.1, 1.0, 1.0, 1.0],
            vec![1.0, 0.9, 1.0, 1.0],
            vec![9.0, 9.0, 9.0, 9.0],
        ]);
        for s in [MatchStrategy::KdForest, MatchStrategy::BruteForce] {
            assert!(matcher(s).match_descriptors(&target, &scene).unwrap().is_empty());
        }
    }

    #[test]
    fn single_scene_descriptor_yields_nothing() {
        let target = table(&[vec![0.0; 4]]);
        let scene = table(&[vec![0.0; 4]]);
        let m = matcher(MatchStrategy::BruteForce).match_descriptors(&target, &scene).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn output_follows_target_order() {
        let scene = table(&[
            vec![0.0, 0.0, 0.0, 0.0],
            vec![10.0, 0.0, 0.0, 0.0],
            vec![0.0, 10.0, 0.0, 0.0],
        ]);
        let target = table(&[vec![0.0, 10.0, 0.0, 0.0], vec![0.0; 4], vec![10.0, 0.0, 0.0, 0.0]]);
        let m = matcher(MatchStrategy::BruteForce).match_descriptors(&target, &scene).unwrap();
        let pairs: Vec<(usize, usize)> = m.iter().map(|c| (c.target, c.scene)).collect();
        assert_eq!(pairs, vec![(0, 2), (1, 0), (2, 1)]);
    }

    #[test]
    fn validation_errors() {
        assert_eq!(
            DescriptorMatcher::new(MatchConfig {
                ratio: 0.0,
                ..MatchConfig::default()
            })
            .err(),
            Some(MatchError::InvalidRatio(0.0))
        );
        let m = matcher(MatchStrategy::BruteForce);
        let a = Descriptors::new(8);
        let b = Descriptors::new(4);
        assert!(matches!(
            m.match_descriptors(&a, &b),
            Err(MatchError::DimensionMismatch { target: 8, scene: 4 })
        ));
        let odd = Descriptors::new(6);
        assert_eq!(m.match_descriptors(&odd, &odd), Err(MatchError::InvalidDimension(6)));
    }

    #[test]
    fn forest_agrees_with_brute_force_on_separated_data() {
        let mut rng = StdRng::seed_from_u64(2024);
        let dim = 64;
        let scene_rows: Vec<Vec<f32>> = (0..400)
            .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect())
            .collect();
        // planted copies with a little noise
        let mut target_rows: Vec<Vec<f32>> = (0..400)
            .step_by(9)
            .map(|i| scene_rows[i].iter().map(|v| v + rng.random_range(-0.002f32..0.002)).collect())
            .collect();
        // distant queries see every scene row at nearly the same distance
        target_rows.extend((0..20).map(|_| (0..dim).map(|_| 10.0 + rng.random::<f32>()).collect::<Vec<f32>>()));

        let (scene, target) = (table(&scene_rows), table(&target_rows));
        let approx = matcher(MatchStrategy::KdForest).match_descriptors(&target, &scene).unwrap();
        let exact = matcher(MatchStrategy::BruteForce).match_descriptors(&target, &scene).unwrap();
        assert_eq!(approx, exact);
        let planted: Vec<Correspondence> = (0..45).map(|t| Correspondence { target: t, scene: t * 9 }).collect();
        assert_eq!(exact, planted);
    }
}
