//! Constrained-dominance comparisons over fitness vectors laid out as
//! `[objective, equality-constraint-violations..., inequality-constraint-violations...]`
//! (pagmo convention, see [`crate::problem::Problem::get_nf`]).

use crate::individual::{broadcast_tolerance, Individual};

/// The aggregated constraint violation of `f`, given `nec` equality and `nic` inequality
/// constraints starting right after the `nobj` objective slots. Equality constraints are
/// measured by absolute value, inequality constraints by their positive part; both are clamped
/// against the matching tolerance before being summed, so a violation within tolerance
/// contributes zero.
fn constraint_violation(f: &[f64], nobj: usize, nec: usize, nic: usize, tol: &[f64]) -> f64 {
    let mut violation = 0.0;
    for i in 0..nec {
        let v = f[nobj + i].abs();
        violation += (v - tol[i]).max(0.0);
    }
    for i in 0..nic {
        let v = f[nobj + nec + i];
        violation += (v - tol[nec + i]).max(0.0);
    }
    violation
}

fn is_feasible(f: &[f64], nobj: usize, nec: usize, nic: usize, tol: &[f64]) -> bool {
    constraint_violation(f, nobj, nec, nic, tol) == 0.0
}

/// `true` if `a` is strictly preferred to `b` under the standard constrained ordering:
/// feasible beats infeasible; among feasible individuals the lower objective wins; among
/// infeasible individuals the lower aggregated constraint violation wins.
pub(crate) fn better_single_objective(
    a: &Individual,
    b: &Individual,
    nec: usize,
    nic: usize,
    tol: &[f64],
) -> bool {
    let va = constraint_violation(&a.f, 1, nec, nic, tol);
    let vb = constraint_violation(&b.f, 1, nec, nic, tol);
    if va == 0.0 && vb == 0.0 {
        a.f[0] < b.f[0]
    } else if va == 0.0 {
        true
    } else if vb == 0.0 {
        false
    } else {
        va < vb
    }
}

/// `true` if `a` constrained-dominates `b` over the first `nobj` fitness components. Feasibility
/// is decided first (a feasible individual always dominates an infeasible one; between two
/// infeasible individuals, the lower violation dominates); between two feasible individuals,
/// standard Pareto dominance over the objectives applies.
pub(crate) fn constrained_dominates(
    a: &Individual,
    b: &Individual,
    nobj: usize,
    nec: usize,
    nic: usize,
    tol: &[f64],
) -> bool {
    let a_feasible = is_feasible(&a.f, nobj, nec, nic, tol);
    let b_feasible = is_feasible(&b.f, nobj, nec, nic, tol);
    if a_feasible != b_feasible {
        return a_feasible;
    }
    if !a_feasible {
        let va = constraint_violation(&a.f, nobj, nec, nic, tol);
        let vb = constraint_violation(&b.f, nobj, nec, nic, tol);
        return va < vb;
    }

    let mut at_least_as_good = true;
    let mut strictly_better = false;
    for i in 0..nobj {
        if a.f[i] > b.f[i] {
            at_least_as_good = false;
            break;
        }
        if a.f[i] < b.f[i] {
            strictly_better = true;
        }
    }
    at_least_as_good && strictly_better
}

/// Partition `individuals` into non-dominated fronts (front 0 is non-dominated by anything in
/// the set, front 1 is non-dominated once front 0 is removed, and so on). Returns, for each
/// front, the indices of the individuals it contains, in ascending front order.
pub(crate) fn fast_non_dominated_sort(
    individuals: &[Individual],
    nobj: usize,
    nec: usize,
    nic: usize,
    tol: &[f64],
) -> Vec<Vec<usize>> {
    let n = individuals.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count: Vec<usize> = vec![0; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for p in 0..n {
        for q in 0..n {
            if p == q {
                continue;
            }
            if constrained_dominates(&individuals[p], &individuals[q], nobj, nec, nic, tol) {
                dominated_by[p].push(q);
            } else if constrained_dominates(&individuals[q], &individuals[p], nobj, nec, nic, tol) {
                domination_count[p] += 1;
            }
        }
        if domination_count[p] == 0 {
            fronts[0].push(p);
        }
    }

    let mut i = 0;
    while !fronts[i].is_empty() {
        let mut next_front = Vec::new();
        for &p in &fronts[i] {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next_front.push(q);
                }
            }
        }
        i += 1;
        fronts.push(next_front);
    }
    fronts.pop();
    fronts
}

/// Convenience wrapper broadcasting a scalar or per-constraint tolerance before sorting.
pub(crate) fn fast_non_dominated_sort_broadcast(
    individuals: &[Individual],
    nobj: usize,
    nec: usize,
    nic: usize,
    tol: &[f64],
) -> Vec<Vec<usize>> {
    let tol = broadcast_tolerance(tol, nec + nic);
    fast_non_dominated_sort(individuals, nobj, nec, nic, &tol)
}
