//! Subset search over route removals.
//!
//! # Algorithm
//!
//! For k = 1..=N, every k-combination of route ids (lexicographic in input
//! order) is tried from the untouched initial state: each member is handed
//! to the planner in listed order and the successes are counted. The trial
//! with the most removals wins; among equals the first one enumerated is
//! kept. Trials share nothing mutable, so a round of combinations may be
//! evaluated in parallel and reduced by (removals, enumeration index).
//!
//! # Complexity
//!
//! O(2^N × N) planner calls. Meant for the handful of routes that meet at
//! one hub; `max_subset_size` and `max_combinations` bound larger inputs.

use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;

use super::greedy::greedy_merge;
use super::{try_merge_route, CanonicalOrder, MergeContext};
use crate::config::{MergeConfig, SearchStrategy};
use crate::distance::DistanceOracle;
use crate::error::Result;
use crate::ledger::{MergeLedger, RouteRemoval};
use crate::models::{MergeInput, RouteId, RouteState, StopId};

/// Result of one consolidation run.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Surviving routes, same shape as the input routes.
    pub final_routes: IndexMap<RouteId, Vec<StopId>>,
    /// Per-route demand ledger of the surviving routes.
    pub final_demands: IndexMap<RouteId, IndexMap<StopId, f64>>,
    pub ledger: MergeLedger,
}

impl MergeOutcome {
    pub fn num_removed(&self) -> usize {
        self.ledger.num_removed_routes()
    }

    /// Rebuilds the working state of the surviving routes.
    pub fn final_state(&self) -> RouteState {
        RouteState::from_parts(self.final_routes.clone(), self.final_demands.clone())
    }
}

/// A state reached by a sequence of accepted removals.
#[derive(Debug, Clone)]
pub(crate) struct Trial {
    pub(crate) state: RouteState,
    pub(crate) removals: Vec<RouteRemoval>,
}

impl Trial {
    pub(crate) fn unchanged(state: RouteState) -> Self {
        Self {
            state,
            removals: Vec::new(),
        }
    }

    pub(crate) fn removed(&self) -> usize {
        self.removals.len()
    }
}

/// Consolidates the routes of `input`, eliminating as many as the planner
/// allows.
///
/// Runs the exhaustive subset search or the greedy scan depending on
/// `config.strategy`. When nothing can be removed the original routes and
/// demand ledger are returned unchanged.
///
/// # Errors
///
/// Invalid config or input, and any distance missing from `oracle`.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use u_consolidate::config::MergeConfig;
/// use u_consolidate::distance::DistanceMatrix;
/// use u_consolidate::merge::merge_routes;
/// use u_consolidate::models::MergeInput;
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["p".to_string(), "q".to_string()]);
/// routes.insert("B".to_string(), vec!["r".to_string()]);
/// let input = MergeInput::new(routes, "H").with_route_stop_demands(IndexMap::from([
///     ("A".to_string(), IndexMap::from([("p".to_string(), 1.0), ("q".to_string(), 1.0)])),
///     ("B".to_string(), IndexMap::from([("r".to_string(), 50.0)])),
/// ]));
///
/// let mut dm = DistanceMatrix::new(["p", "q", "r", "H"]);
/// for (a, b, d) in [("p", "H", 4.0), ("q", "H", 2.0), ("r", "H", 1.0),
///                   ("p", "q", 2.0), ("p", "r", 5.0), ("q", "r", 3.0)] {
///     dm.set_symmetric(a, b, d).unwrap();
/// }
///
/// let config = MergeConfig::default()
///     .with_ignore_threshold(2.0)
///     .with_max_ignored_demand(2.0);
/// let outcome = merge_routes(&input, &dm, &config).unwrap();
///
/// assert_eq!(outcome.final_routes.len(), 1);
/// assert_eq!(outcome.final_routes["B"], ["r"]);
/// assert_eq!(outcome.ledger.removed_routes[0].route_id, "A");
/// ```
pub fn merge_routes(
    input: &MergeInput,
    oracle: &dyn DistanceOracle,
    config: &MergeConfig,
) -> Result<MergeOutcome> {
    config.validate()?;
    let original = input.initial_state()?;

    let mut ledger = MergeLedger::new();
    ledger.record_initial_state(&original);

    if original.is_empty() {
        ledger.record_final_state(&original);
        return Ok(MergeOutcome {
            final_routes: IndexMap::new(),
            final_demands: IndexMap::new(),
            ledger,
        });
    }

    let canonical = CanonicalOrder::from_routes(&input.routes);
    let ctx = MergeContext::new(oracle, &input.hub, &input.faculty_stops, &canonical, config);

    let best = match config.strategy {
        SearchStrategy::Exhaustive => subset_search(&original, &ctx)?,
        SearchStrategy::Greedy => greedy_merge(&original, &ctx)?,
    };

    let final_state = if best.removed() == 0 {
        warn!("no routes could be merged; keeping the original routes");
        original
    } else {
        info!(
            "removed {} of {} routes: {}",
            best.removed(),
            original.num_routes(),
            best.removals.iter().map(|r| r.route_id.as_str()).join(", ")
        );
        for removal in best.removals {
            ledger.record_removal(removal);
        }
        best.state
    };

    ledger.record_final_state(&final_state);
    let (final_routes, final_demands) = final_state.into_parts();
    Ok(MergeOutcome {
        final_routes,
        final_demands,
        ledger,
    })
}

/// Tries every removal subset of `original` and returns the best trial.
pub(crate) fn subset_search(original: &RouteState, ctx: &MergeContext<'_>) -> Result<Trial> {
    let config = ctx.config();
    let ids: Vec<RouteId> = original.route_ids().cloned().collect();
    let n = ids.len();
    let max_k = config.max_subset_size.map_or(n, |k| k.min(n));
    let mut budget = config.max_combinations.unwrap_or(usize::MAX);

    info!(
        "subset search over {n} routes (k <= {max_k}{})",
        config
            .max_combinations
            .map(|c| format!(", at most {c} combinations"))
            .unwrap_or_default()
    );

    let mut best = Trial::unchanged(original.clone());
    for k in 1..=max_k {
        if budget == 0 || best.removed() == n {
            break;
        }
        let combos: Vec<Vec<usize>> = (0..n).combinations(k).take(budget).collect();
        budget -= combos.len();

        let round = if config.parallel {
            combos
                .par_iter()
                .enumerate()
                .map(|(i, combo)| run_trial(original, &ids, combo, ctx).map(|t| (i, t)))
                .try_reduce_with(|a, b| Ok(first_best(a, b)))
                .transpose()?
        } else {
            let mut round: Option<(usize, Trial)> = None;
            for (i, combo) in combos.iter().enumerate() {
                let trial = run_trial(original, &ids, combo, ctx)?;
                round = Some(match round {
                    Some(incumbent) => first_best(incumbent, (i, trial)),
                    None => (i, trial),
                });
            }
            round
        };

        if let Some((_, trial)) = round {
            if trial.removed() > best.removed() {
                info!("k = {k}: best so far removes {} routes", trial.removed());
                best = trial;
            }
        }
    }

    Ok(best)
}

/// Removes the routes of `combo`, in order, from a copy of `original`.
fn run_trial(
    original: &RouteState,
    ids: &[RouteId],
    combo: &[usize],
    ctx: &MergeContext<'_>,
) -> Result<Trial> {
    let mut trial = Trial::unchanged(original.clone());
    for &i in combo {
        if let Some(attempt) = try_merge_route(&ids[i], &trial.state, ctx)? {
            let (state, removal) = attempt.into_parts();
            trial.state = state;
            trial.removals.push(removal);
        }
    }
    Ok(trial)
}

/// More removals wins; equal removals go to the lower enumeration index.
fn first_best(a: (usize, Trial), b: (usize, Trial)) -> (usize, Trial) {
    let b_wins = b.1.removed() > a.1.removed() || (b.1.removed() == a.1.removed() && b.0 < a.0);
    if b_wins {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::error::Error;
    use crate::evaluation::MergeValidator;
    use proptest::prelude::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn line(points: &[(&str, f64)]) -> DistanceMatrix {
        let mut all: Vec<(&str, f64)> = points.to_vec();
        all.push(("H", 0.0));
        let mut dm = DistanceMatrix::new(all.iter().map(|(s, _)| *s));
        for &(a, x) in &all {
            for &(b, y) in &all {
                dm.set(a, b, (x - y).abs()).expect("known stops");
            }
        }
        dm
    }

    fn input(routes: &[(&str, &[(&str, f64)])]) -> MergeInput {
        let mut r = IndexMap::new();
        let mut d = IndexMap::new();
        for (id, stops) in routes {
            r.insert(
                id.to_string(),
                stops.iter().map(|(s, _)| s.to_string()).collect::<Vec<_>>(),
            );
            d.insert(
                id.to_string(),
                stops
                    .iter()
                    .map(|(s, q)| (s.to_string(), *q))
                    .collect::<IndexMap<_, _>>(),
            );
        }
        MergeInput::new(r, "H").with_route_stop_demands(d)
    }

    fn example() -> (MergeInput, DistanceMatrix) {
        let inp = input(&[("A", &[("p", 1.0), ("q", 1.0)]), ("B", &[("r", 50.0)])]);
        let mut dm = DistanceMatrix::new(["p", "q", "r", "H"]);
        for (a, b, d) in [
            ("p", "H", 4.0),
            ("q", "H", 2.0),
            ("r", "H", 1.0),
            ("p", "q", 2.0),
            ("p", "r", 5.0),
            ("q", "r", 3.0),
        ] {
            dm.set_symmetric(a, b, d).expect("known stops");
        }
        (inp, dm)
    }

    #[test]
    fn test_worked_example() {
        init_logger();
        let (inp, dm) = example();
        let config = MergeConfig::default()
            .with_capacity_limit(60.0)
            .with_detour_threshold(3.0)
            .with_ignore_threshold(2.0)
            .with_max_ignored_demand(2.0);
        let outcome = merge_routes(&inp, &dm, &config).expect("valid");

        assert_eq!(outcome.final_routes.len(), 1);
        assert_eq!(outcome.final_routes["B"], ["r"]);
        assert_eq!(outcome.final_state().total_demand("B"), 50.0);

        let removed = &outcome.ledger.removed_routes;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].route_id, "A");
        assert!(removed[0].stops_assigned.is_empty());
        assert_eq!(removed[0].ignored_demand(), 2.0);
        assert!(outcome.ledger.merge_operations.is_empty());
        assert_eq!(outcome.ledger.final_routes["B"].total_demand, 50.0);
        assert_eq!(outcome.ledger.initial_routes["A"].total_demand, 2.0);
    }

    #[test]
    fn test_reverts_when_nothing_removable() {
        let (inp, dm) = example();
        // r fits behind q with detour 2
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(outcome.num_removed(), 1);
        assert_eq!(outcome.ledger.removed_routes[0].route_id, "B");

        let strict = MergeConfig::default().with_detour_threshold(1.0);
        let outcome = merge_routes(&inp, &dm, &strict).expect("valid");
        assert_eq!(outcome.num_removed(), 0);
        assert_eq!(outcome.final_routes, inp.routes);
        assert_eq!(outcome.final_demands, inp.resolved_route_stop_demands());
        assert!(outcome.ledger.merge_operations.is_empty());
        assert_eq!(outcome.ledger.num_final_routes(), 2);
    }

    #[test]
    fn test_empty_input() {
        let dm = DistanceMatrix::new(["H"]);
        let inp = MergeInput::new(IndexMap::new(), "H");
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert!(outcome.final_routes.is_empty());
        assert!(outcome.ledger.initial_routes.is_empty());
        assert!(outcome.ledger.removed_routes.is_empty());
        assert!(outcome.ledger.final_routes.is_empty());
    }

    #[test]
    fn test_finds_largest_removable_subset() {
        // A cannot be absorbed by anyone; B and C both fold into A.
        let dm = line(&[("a", 9.0), ("z", 1.0), ("b", 6.0), ("c", 3.0), ("y", 7.0)]);
        let inp = input(&[
            ("A", &[("a", 10.0), ("z", 10.0)]),
            ("B", &[("y", 10.0), ("b", 10.0)]),
            ("C", &[("c", 10.0)]),
        ]);
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(outcome.num_removed(), 2);
        assert_eq!(
            outcome.final_routes.keys().collect::<Vec<_>>(),
            vec!["A"]
        );
        assert_eq!(outcome.final_routes["A"], ["a", "y", "b", "c", "z"]);
    }

    #[test]
    fn test_outbound_route_survives() {
        let dm = line(&[("a", 5.0), ("b", 3.0)]);
        let inp = input(&[("A", &[("a", 1.0)]), ("B", &[("b", 1.0)])]);
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(outcome.num_removed(), 1);
        assert_eq!(outcome.ledger.removed_routes[0].route_id, "B");
        assert_eq!(outcome.final_routes["A"], ["a", "b"]);
    }

    #[test]
    fn test_first_achiever_wins_ties() {
        // Both routes visit s, so either can join the other; only one may go.
        let dm = line(&[("s", 3.0)]);
        let inp = input(&[("A", &[("s", 1.0)]), ("B", &[("s", 2.0)])]);
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(outcome.num_removed(), 1);
        assert_eq!(outcome.ledger.removed_routes[0].route_id, "A");
        assert_eq!(outcome.final_routes["B"], ["s"]);
        assert_eq!(outcome.final_demands["B"]["s"], 3.0);
        assert!(outcome.ledger.removed_routes[0].stops_assigned[0].joined_existing);
    }

    #[test]
    fn test_equidistant_stops_never_move() {
        let dm = line(&[("a", 5.0), ("b", 5.0), ("c", 3.0)]);
        let inp = input(&[
            ("A", &[("a", 1.0), ("c", 1.0)]),
            ("B", &[("b", 1.0), ("c", 1.0)]),
        ]);
        let outcome = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(outcome.num_removed(), 0);
    }

    #[test]
    fn test_max_subset_size_limits_search() {
        let dm = line(&[("a", 9.0), ("z", 1.0), ("b", 6.0), ("c", 3.0), ("y", 7.0)]);
        let inp = input(&[
            ("A", &[("a", 10.0), ("z", 10.0)]),
            ("B", &[("y", 10.0), ("b", 10.0)]),
            ("C", &[("c", 10.0)]),
        ]);
        let config = MergeConfig::default().with_max_subset_size(1);
        let outcome = merge_routes(&inp, &dm, &config).expect("valid");
        assert_eq!(outcome.num_removed(), 1);
    }

    #[test]
    fn test_max_combinations_limits_search() {
        let dm = line(&[("a", 9.0), ("z", 1.0), ("b", 6.0), ("c", 3.0), ("y", 7.0)]);
        let inp = input(&[
            ("A", &[("a", 10.0), ("z", 10.0)]),
            ("B", &[("y", 10.0), ("b", 10.0)]),
            ("C", &[("c", 10.0)]),
        ]);
        // the three singletons only
        let config = MergeConfig::default().with_max_combinations(3);
        let outcome = merge_routes(&inp, &dm, &config).expect("valid");
        assert_eq!(outcome.num_removed(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dm = line(&[("a", 9.0), ("z", 1.0), ("b", 6.0), ("c", 3.0), ("y", 7.0)]);
        let inp = input(&[
            ("A", &[("a", 10.0), ("z", 10.0)]),
            ("B", &[("y", 10.0), ("b", 10.0)]),
            ("C", &[("c", 10.0)]),
        ]);
        let seq = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        let par = merge_routes(&inp, &dm, &MergeConfig::default().with_parallel(true))
            .expect("valid");
        assert_eq!(seq.final_routes, par.final_routes);
        assert_eq!(seq.final_demands, par.final_demands);
        assert!(seq.ledger.same_content(&par.ledger));
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let inp = input(&[("A", &[("a", 1.0)]), ("B", &[("b", 1.0)])]);
        let mut dm = DistanceMatrix::new(["a", "b", "H"]);
        dm.set("a", "H", 2.0).expect("known");
        let err = merge_routes(&inp, &dm, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, Error::LookupFailure { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (inp, dm) = example();
        let config = MergeConfig::default().with_capacity_limit(f64::NAN);
        assert!(matches!(
            merge_routes(&inp, &dm, &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let dm = line(&[("a", 9.0), ("z", 1.0), ("b", 6.0), ("c", 3.0), ("y", 7.0)]);
        let inp = input(&[
            ("A", &[("a", 10.0), ("z", 10.0)]),
            ("B", &[("y", 10.0), ("b", 10.0)]),
            ("C", &[("c", 10.0)]),
        ]);
        let first = merge_routes(&inp, &dm, &MergeConfig::default()).expect("valid");
        let again = MergeInput::new(first.final_routes.clone(), "H")
            .with_route_stop_demands(first.final_demands.clone());
        let second = merge_routes(&again, &dm, &MergeConfig::default()).expect("valid");
        assert_eq!(second.num_removed(), 0);
        assert_eq!(second.final_routes, first.final_routes);
    }

    /// Routes over stops on a line, each running inbound and within capacity.
    fn line_instance() -> impl Strategy<Value = (MergeInput, DistanceMatrix, MergeConfig)> {
        (
            prop::collection::vec((1u32..100, 0u32..12), 2..10),
            2usize..5,
            0u32..3,
        )
            .prop_map(|(stops, n_routes, ignore)| {
                let mut points: Vec<(String, f64)> = Vec::new();
                let mut routes: IndexMap<RouteId, Vec<StopId>> = IndexMap::new();
                let mut demands: IndexMap<RouteId, IndexMap<StopId, f64>> = IndexMap::new();
                for (i, &(x, _)) in stops.iter().enumerate() {
                    points.push((format!("s{i}"), x as f64));
                }
                for r in 0..n_routes {
                    let id = format!("R{r}");
                    let mut members: Vec<usize> =
                        (0..stops.len()).filter(|i| i % n_routes == r).collect();
                    members.sort_by(|&a, &b| stops[b].0.cmp(&stops[a].0));
                    routes.insert(id.clone(), members.iter().map(|&i| format!("s{i}")).collect());
                    demands.insert(
                        id,
                        members
                            .iter()
                            .map(|&i| (format!("s{i}"), stops[i].1 as f64))
                            .collect(),
                    );
                }
                let mut all: Vec<(&str, f64)> =
                    points.iter().map(|(s, x)| (s.as_str(), *x)).collect();
                all.push(("H", 0.0));
                let mut dm = DistanceMatrix::new(all.iter().map(|(s, _)| *s));
                for &(a, x) in &all {
                    for &(b, y) in &all {
                        dm.set(a, b, (x - y).abs()).expect("known stops");
                    }
                }
                let config = MergeConfig::default()
                    .with_capacity_limit(60.0)
                    .with_ignore_threshold(ignore as f64)
                    .with_max_ignored_demand(3.0);
                let input = MergeInput::new(routes, "H").with_route_stop_demands(demands);
                (input, dm, config)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_outcome_respects_invariants((inp, dm, config) in line_instance()) {
            let outcome = merge_routes(&inp, &dm, &config).expect("valid instance");
            let validator = MergeValidator::new(&dm, &inp.hub, &config);
            let violations = validator.check_outcome(&outcome).expect("lookups succeed");
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }

        #[test]
        fn prop_search_is_deterministic((inp, dm, config) in line_instance()) {
            let a = merge_routes(&inp, &dm, &config).expect("valid instance");
            let b = merge_routes(&inp, &dm, &config.clone().with_parallel(true))
                .expect("valid instance");
            prop_assert_eq!(&a.final_routes, &b.final_routes);
            prop_assert!(a.ledger.same_content(&b.ledger));
        }

        #[test]
        fn prop_greedy_respects_invariants((inp, dm, config) in line_instance()) {
            let config = config.with_strategy(SearchStrategy::Greedy);
            let outcome = merge_routes(&inp, &dm, &config).expect("valid instance");
            let validator = MergeValidator::new(&dm, &inp.hub, &config);
            let violations = validator.check_outcome(&outcome).expect("lookups succeed");
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
