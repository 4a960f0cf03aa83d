//! One-dimensional track solver.
//!
//! A track is anything that takes up extent along one axis: a child of a
//! linear container, or a column/row of a grid. [`solve_tracks`] distributes
//! an available extent over tracks in four stages:
//!
//! 1. **Fixed** tracks take their preferred extent (clamped to bounds).
//! 2. **Feasibility**: fixed extents + every other track's minimum + spacing
//!    must fit, otherwise a [`Shortfall`] is returned.
//! 3. **Unweighted** tracks (weight 0) grow from minimum toward preferred,
//!    sharing the slack in proportion to their `preferred - min` gap.
//! 4. **Weighted** tracks split what remains in proportion to weight. A
//!    track whose share falls outside its bounds is frozen at the violated
//!    bound and the rest is redistributed. Which side gets frozen follows
//!    the sign of the total violation, so each round freezes at least one
//!    track and the loop ends after at most `n` rounds.
//!
//! Real-valued shares are rounded with [`round_layout_stable`], so the
//! integer sizes sum exactly to the extent handed out. Whatever no track can
//! absorb is returned as `slack`.

use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Solver input for one track. Extents are device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Track {
    pub min: u32,
    pub preferred: u32,
    /// `None` = unbounded.
    pub max: Option<u32>,
    pub weight: f32,
    pub fixed: bool,
}

impl Track {
    /// A flexible track.
    pub const fn new(min: u32, preferred: u32, max: Option<u32>, weight: f32) -> Self {
        Self {
            min,
            preferred,
            max,
            weight,
            fixed: false,
        }
    }

    /// A track pinned to `size`.
    pub const fn fixed(size: u32) -> Self {
        Self {
            min: size,
            preferred: size,
            max: Some(size),
            weight: 0.0,
            fixed: true,
        }
    }

    #[inline]
    fn upper(&self) -> u32 {
        self.max.unwrap_or(u32::MAX).max(self.min)
    }

    #[inline]
    fn target(&self) -> u32 {
        self.preferred.clamp(self.min, self.upper())
    }

    #[inline]
    fn is_weighted(&self) -> bool {
        !self.fixed && self.weight > 0.0
    }
}

/// How the solver treated an item on its last pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Disposition {
    /// Pinned to its preferred extent.
    Fixed,
    /// Weight 0: sized between minimum and preferred.
    Unweighted,
    /// Received its proportional share.
    Weighted,
    /// Share fell below the minimum; frozen at the minimum.
    TooSmall,
    /// Share exceeded the maximum; frozen at the maximum.
    TooLarge,
}

/// Result of [`solve_tracks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSolution {
    pub sizes: Vec<u32>,
    pub dispositions: Vec<Disposition>,
    /// Extent no track could absorb.
    pub slack: u32,
}

impl TrackSolution {
    /// Sum of all track sizes.
    pub fn used(&self) -> u64 {
        self.sizes.iter().map(|&s| u64::from(s)).sum()
    }
}

/// Minimum requirements exceed the available extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub required: u64,
    pub available: u32,
}

/// Distribute `available` over `tracks`, reserving `spacing` for gaps.
///
/// `prev` is the previous allocation for the same tracks (if any); it only
/// breaks rounding ties so that small resizes do not make items jitter.
///
/// On success `used() + spacing + slack == available`.
pub fn solve_tracks(
    tracks: &[Track],
    available: u32,
    spacing: u64,
    prev: Option<&[u32]>,
) -> Result<TrackSolution, Shortfall> {
    let n = tracks.len();
    let mut sizes = vec![0u32; n];
    let mut dispositions = vec![Disposition::Unweighted; n];

    // Stage 1 + 2: fixed extents and feasibility.
    let mut required = spacing;
    for (i, track) in tracks.iter().enumerate() {
        if track.fixed {
            sizes[i] = track.target();
            dispositions[i] = Disposition::Fixed;
        } else {
            sizes[i] = track.min;
        }
        required += u64::from(sizes[i]);
    }
    if required > u64::from(available) {
        return Err(Shortfall {
            required,
            available,
        });
    }
    let mut slack = u64::from(available) - required;

    // Stage 3: unweighted tracks grow toward preferred.
    let unweighted: Vec<usize> = (0..n)
        .filter(|&i| !tracks[i].fixed && !tracks[i].is_weighted())
        .collect();
    let wanted: u64 = unweighted
        .iter()
        .map(|&i| u64::from(tracks[i].target() - tracks[i].min))
        .sum();
    if wanted > 0 && slack > 0 {
        if slack >= wanted {
            for &i in &unweighted {
                sizes[i] = tracks[i].target();
            }
            slack -= wanted;
        } else {
            // slack < wanted <= u32::MAX * n, but slack itself fits in u32.
            let give = slack as u32;
            let targets: Vec<f64> = unweighted
                .iter()
                .map(|&i| {
                    f64::from(tracks[i].target() - tracks[i].min) * slack as f64 / wanted as f64
                })
                .collect();
            let prev_gaps = prev.map(|p| {
                unweighted
                    .iter()
                    .map(|&i| p.get(i).copied().unwrap_or(0).saturating_sub(tracks[i].min))
                    .collect::<Vec<u32>>()
            });
            let grants = round_layout_stable(&targets, give, prev_gaps.as_deref());
            for (&i, grant) in unweighted.iter().zip(grants) {
                sizes[i] += grant;
            }
            slack = 0;
        }
    }

    // Stage 4: weighted relaxation.
    let weighted: Vec<usize> = (0..n).filter(|&i| tracks[i].is_weighted()).collect();
    if !weighted.is_empty() {
        for &i in &weighted {
            dispositions[i] = Disposition::Weighted;
        }
        let pool: u64 = slack + weighted.iter().map(|&i| u64::from(tracks[i].min)).sum::<u64>();
        let shares = relax_weighted(tracks, &weighted, pool, &mut dispositions);

        let frozen_sum: u64 = weighted
            .iter()
            .zip(&shares)
            .filter(|(i, _)| dispositions[**i] != Disposition::Weighted)
            .map(|(_, s)| *s as u64)
            .sum();
        let free: Vec<(usize, f64)> = weighted
            .iter()
            .zip(&shares)
            .filter(|(i, _)| dispositions[**i] == Disposition::Weighted)
            .map(|(i, s)| (*i, *s))
            .collect();

        for (&i, &share) in weighted.iter().zip(&shares) {
            if dispositions[i] != Disposition::Weighted {
                sizes[i] = share as u32;
            }
        }

        if free.is_empty() {
            slack = pool - frozen_sum;
        } else {
            let free_total = (pool - frozen_sum) as u32;
            let targets: Vec<f64> = free.iter().map(|&(_, s)| s).collect();
            let prev_free = prev.map(|p| {
                free.iter()
                    .map(|&(i, _)| p.get(i).copied().unwrap_or(0))
                    .collect::<Vec<u32>>()
            });
            let mut rounded = round_layout_stable(&targets, free_total, prev_free.as_deref());
            let bounds: Vec<(u32, u32)> = free
                .iter()
                .map(|&(i, _)| (tracks[i].min, tracks[i].upper()))
                .collect();
            settle_within_bounds(&mut rounded, &bounds);
            for (&(i, _), size) in free.iter().zip(rounded) {
                sizes[i] = size;
            }
            slack = 0;
        }
    }

    Ok(TrackSolution {
        sizes,
        dispositions,
        slack: slack as u32,
    })
}

/// Real-valued shares for the weighted tracks, freezing violators.
///
/// Frozen tracks get `TooSmall`/`TooLarge` written into `dispositions` and an
/// integral share; the others keep `Weighted`.
fn relax_weighted(
    tracks: &[Track],
    weighted: &[usize],
    pool: u64,
    dispositions: &mut [Disposition],
) -> Vec<f64> {
    const EPSILON: f64 = 1e-9;

    let mut shares = vec![0.0f64; weighted.len()];
    let mut frozen = vec![false; weighted.len()];

    loop {
        let unfrozen: Vec<usize> = (0..weighted.len()).filter(|&k| !frozen[k]).collect();
        if unfrozen.is_empty() {
            break;
        }
        let frozen_total: f64 = (0..weighted.len())
            .filter(|&k| frozen[k])
            .map(|k| shares[k])
            .sum();
        let remaining = (pool as f64 - frozen_total).max(0.0);
        let weight_total: f64 = unfrozen
            .iter()
            .map(|&k| f64::from(tracks[weighted[k]].weight))
            .sum();

        let mut violation = 0.0f64;
        for &k in &unfrozen {
            let track = &tracks[weighted[k]];
            let target = remaining * f64::from(track.weight) / weight_total;
            let clamped = target.clamp(f64::from(track.min), f64::from(track.upper()));
            violation += clamped - target;
            shares[k] = target;
        }

        if violation.abs() <= EPSILON {
            // Opposite violations can cancel out; clamp them and record
            // which bound each hit. Float noise is settled silently.
            for &k in &unfrozen {
                let i = weighted[k];
                let track = &tracks[i];
                let (lo, hi) = (f64::from(track.min), f64::from(track.upper()));
                if shares[k] < lo {
                    if lo - shares[k] > EPSILON {
                        dispositions[i] = Disposition::TooSmall;
                    }
                    shares[k] = lo;
                } else if shares[k] > hi {
                    if shares[k] - hi > EPSILON {
                        dispositions[i] = Disposition::TooLarge;
                    }
                    shares[k] = hi;
                }
            }
            break;
        }

        for &k in &unfrozen {
            let i = weighted[k];
            let track = &tracks[i];
            if violation > 0.0 && shares[k] < f64::from(track.min) {
                shares[k] = f64::from(track.min);
                frozen[k] = true;
                dispositions[i] = Disposition::TooSmall;
            } else if violation < 0.0 && shares[k] > f64::from(track.upper()) {
                shares[k] = f64::from(track.upper());
                frozen[k] = true;
                dispositions[i] = Disposition::TooLarge;
            }
        }
    }

    shares
}

/// Nudge rounded sizes back inside `[min, max]`, preserving the sum.
///
/// Only needed when float error pushed a share that sat exactly on a bound
/// one pixel past it.
fn settle_within_bounds(sizes: &mut [u32], bounds: &[(u32, u32)]) {
    let mut excess: i64 = 0;
    for (size, &(lo, hi)) in sizes.iter_mut().zip(bounds) {
        if *size > hi {
            excess += i64::from(*size - hi);
            *size = hi;
        } else if *size < lo {
            excess -= i64::from(lo - *size);
            *size = lo;
        }
    }
    for (size, &(lo, hi)) in sizes.iter_mut().zip(bounds) {
        if excess > 0 && *size < hi {
            let room = i64::from(hi - *size).min(excess);
            *size += room as u32;
            excess -= room;
        } else if excess < 0 && *size > lo {
            let room = i64::from(*size - lo).min(-excess);
            *size -= room as u32;
            excess += room;
        }
    }
}

// ---------------------------------------------------------------------------
// Stable rounding: largest remainder with temporal tie-breaking
// ---------------------------------------------------------------------------

/// Round real-valued targets to integer pixels with exact sum conservation.
///
/// Largest Remainder (Hamilton) method:
///
/// 1. Floor every target.
/// 2. `D = total - Σ floor` pixels are left over.
/// 3. Rank targets by fractional remainder, descending. Ties prefer the
///    element whose previous allocation was the ceiling, then the lower
///    index.
/// 4. The top `D` elements get one extra pixel.
///
/// Every result is `floor(r)` or `ceil(r)`, the sum equals `total`, and the
/// same inputs always give the same output.
///
/// # Example
///
/// ```
/// use tessel_layout::round_layout_stable;
///
/// let result = round_layout_stable(&[10.4, 20.6, 9.0], 40, None);
/// assert_eq!(result, vec![10, 21, 9]);
/// ```
pub fn round_layout_stable(targets: &[f64], total: u32, prev: Option<&[u32]>) -> Vec<u32> {
    let n = targets.len();
    if n == 0 {
        return Vec::new();
    }

    let floors: Vec<u32> = targets
        .iter()
        .map(|&r| (r.max(0.0).floor()).min(f64::from(u32::MAX)) as u32)
        .collect();
    let floor_sum: u64 = floors.iter().map(|&f| u64::from(f)).sum();

    if floor_sum >= u64::from(total) {
        if floor_sum > u64::from(total) {
            return redistribute_overflow(&floors, total);
        }
        return floors;
    }
    let deficit = u64::from(total) - floor_sum;

    let mut priority: Vec<(usize, f64, bool)> = targets
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let remainder = r - f64::from(floors[i]);
            let ceil_val = floors[i].saturating_add(1);
            let prev_used_ceil = prev.is_some_and(|p| p.get(i).copied() == Some(ceil_val));
            (i, remainder, prev_used_ceil)
        })
        .collect();

    priority.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut result = floors;
    let distribute = (deficit as usize).min(n);
    for &(i, _, _) in priority.iter().take(distribute) {
        result[i] = result[i].saturating_add(1);
    }

    result
}

/// Floors exceeded the total (tiny totals, many items): shave the largest
/// items one pixel at a time.
fn redistribute_overflow(floors: &[u32], total: u32) -> Vec<u32> {
    let mut result = floors.to_vec();
    let mut current: u64 = result.iter().map(|&v| u64::from(v)).sum();

    while current > u64::from(total) {
        let Some((idx, _)) = result
            .iter()
            .enumerate()
            .filter(|item| *item.1 > 0)
            .max_by_key(|item| *item.1)
        else {
            break;
        };
        result[idx] -= 1;
        current -= 1;
    }

    result
}
