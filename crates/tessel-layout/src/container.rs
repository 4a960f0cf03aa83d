//! Containers: linear and grid arrangement of child items.
//!
//! A [`Container`] only carries arrangement properties. Children live in the
//! [`LayoutTree`](crate::LayoutTree), which hands their device-pixel sizing
//! to [`Container::arrange`] and [`Container::aggregate`].

use tessel_core::geometry::{Rect, Sides, Size};

use crate::config::LayoutContext;
use crate::error::LayoutError;
use crate::item::{ItemFlags, ItemId, ItemSizing, SizeHint, Weight};
use crate::solver::{Disposition, Shortfall, Track, TrackSolution, solve_tracks};
use crate::{Alignment, CrossAlignment, Direction};

/// How a container places its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arrangement {
    /// One row or column.
    Linear(Direction),
    /// Row-major cells, `columns` per row.
    Grid { columns: u32 },
}

/// Arrangement properties of a container.
///
/// Spacing and margin are logical units; `None` falls back to the
/// [`LayoutConfig`](crate::LayoutConfig) defaults at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container {
    arrangement: Arrangement,
    spacing: Option<u32>,
    margin: Option<Sides>,
    alignment: Alignment,
    cross_alignment: CrossAlignment,
}

impl Default for Container {
    fn default() -> Self {
        Self::vertical()
    }
}

impl Container {
    /// Children stacked top to bottom.
    pub fn vertical() -> Self {
        Self::with_arrangement(Arrangement::Linear(Direction::Vertical))
    }

    /// Children placed left to right.
    pub fn horizontal() -> Self {
        Self::with_arrangement(Arrangement::Linear(Direction::Horizontal))
    }

    /// Row-major grid. A column count of 0 is treated as 1.
    pub fn grid(columns: u32) -> Self {
        Self::with_arrangement(Arrangement::Grid {
            columns: columns.max(1),
        })
    }

    fn with_arrangement(arrangement: Arrangement) -> Self {
        Self {
            arrangement,
            spacing: None,
            margin: None,
            alignment: Alignment::default(),
            cross_alignment: CrossAlignment::default(),
        }
    }

    /// Switch to a linear arrangement along `direction`.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.arrangement = Arrangement::Linear(direction);
        self
    }

    /// Gap between adjacent items (and grid rows/columns).
    #[must_use]
    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Space between the container edge and its items.
    #[must_use]
    pub fn margin(mut self, margin: Sides) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Placement of main-axis slack.
    #[must_use]
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Placement across the layout axis (both axes within grid cells).
    #[must_use]
    pub fn cross_alignment(mut self, cross_alignment: CrossAlignment) -> Self {
        self.cross_alignment = cross_alignment;
        self
    }

    pub fn arrangement(&self) -> Arrangement {
        self.arrangement
    }

    pub fn alignment_value(&self) -> Alignment {
        self.alignment
    }

    pub fn cross_alignment_value(&self) -> CrossAlignment {
        self.cross_alignment
    }

    /// Spacing in device pixels.
    pub fn resolved_spacing(&self, ctx: &LayoutContext) -> u32 {
        ctx.scale
            .apply(self.spacing.unwrap_or(ctx.config.default_spacing))
    }

    /// Margin in device pixels.
    pub fn resolved_margin(&self, ctx: &LayoutContext) -> Sides {
        ctx.scale
            .apply_sides(self.margin.unwrap_or(Sides::all(ctx.config.default_margin)))
    }

    /// Aggregate sizing of this container from its children's sizing.
    ///
    /// Along each axis the container needs the sum of its tracks plus spacing
    /// and margin; across it needs the largest child. Weight is the largest
    /// child weight per axis. Result is device pixels.
    pub fn aggregate(&self, children: &[ChildSpec], ctx: &LayoutContext) -> ItemSizing {
        let spacing = self.resolved_spacing(ctx);
        let margin = self.resolved_margin(ctx);
        let visible: Vec<&ChildSpec> = children.iter().filter(|c| c.is_visible()).collect();

        let (width, height) = match self.arrangement {
            Arrangement::Linear(direction) => {
                let along: Vec<Track> = visible.iter().map(|c| c.track(direction)).collect();
                let across: Vec<Track> = visible.iter().map(|c| c.track(direction.cross())).collect();
                let main = sum_tracks(&along, spacing);
                let cross = max_tracks(&across);
                match direction {
                    Direction::Horizontal => (main, cross),
                    Direction::Vertical => (cross, main),
                }
            }
            Arrangement::Grid { columns } => {
                let (cols, rows) = grid_tracks(&visible, columns);
                (sum_tracks(&cols, spacing), sum_tracks(&rows, spacing))
            }
        };

        let weight = visible
            .iter()
            .fold(Weight::NONE, |acc, c| acc.max(c.sizing.weight));

        ItemSizing {
            width: pad(width, margin.horizontal_sum()),
            height: pad(height, margin.vertical_sum()),
            weight,
        }
    }

    /// Place children inside `area`.
    ///
    /// `prev` holds the previous track allocation per axis, used only for
    /// rounding tie-breaks.
    pub fn arrange(
        &self,
        id: ItemId,
        area: Rect,
        children: &[ChildSpec],
        ctx: &LayoutContext,
        prev: &Allocation,
    ) -> Result<Placement, LayoutError> {
        let spacing = self.resolved_spacing(ctx);
        let inner = area.inner(self.resolved_margin(ctx));
        match self.arrangement {
            Arrangement::Linear(direction) => {
                self.arrange_linear(id, direction, inner, children, spacing, prev)
            }
            Arrangement::Grid { columns } => {
                self.arrange_grid(id, columns, inner, children, spacing, prev)
            }
        }
    }

    fn arrange_linear(
        &self,
        id: ItemId,
        direction: Direction,
        inner: Rect,
        children: &[ChildSpec],
        spacing: u32,
        prev: &Allocation,
    ) -> Result<Placement, LayoutError> {
        let cross = direction.cross();
        let visible: Vec<usize> = (0..children.len())
            .filter(|&i| children[i].is_visible())
            .collect();
        let tracks: Vec<Track> = visible.iter().map(|&i| children[i].track(direction)).collect();
        let spacing_total = gaps(visible.len(), spacing);
        let available = direction.extent(inner.size());
        let solution = solve_tracks(&tracks, available, spacing_total, prev.get(direction))
            .map_err(|short| unsatisfiable(id, direction, short))?;

        let cross_available = cross.extent(inner.size());
        let mut rects = vec![Rect::new(inner.x, inner.y, 0, 0); children.len()];
        let mut dispositions = vec![None; children.len()];
        let mut pos = i64::from(direction.start(inner)) + i64::from(self.alignment.offset(solution.slack));

        for (k, &i) in visible.iter().enumerate() {
            let child = &children[i];
            let main = solution.sizes[k];
            let (extent, offset) =
                child.place_across(id, cross, cross_available, self.cross_alignment)?;
            let cross_pos = i64::from(cross.start(inner)) + i64::from(offset);
            rects[i] = match direction {
                Direction::Horizontal => {
                    Rect::new(clamp_i32(pos), clamp_i32(cross_pos), main, extent)
                }
                Direction::Vertical => Rect::new(clamp_i32(cross_pos), clamp_i32(pos), extent, main),
            };
            dispositions[i] = Some(solution.dispositions[k]);
            pos += i64::from(main) + i64::from(spacing);
        }

        let content_main = (solution.used() + spacing_total).min(u64::from(u32::MAX)) as u32;
        let (content, slack) = match direction {
            Direction::Horizontal => (
                Size::new(content_main, inner.height),
                Size::new(solution.slack, 0),
            ),
            Direction::Vertical => (
                Size::new(inner.width, content_main),
                Size::new(0, solution.slack),
            ),
        };

        let mut allocation = Allocation::default();
        allocation.set(direction, solution.sizes);
        Ok(Placement {
            rects,
            dispositions,
            metrics: ContainerMetrics {
                inner,
                content,
                slack,
                spacing,
            },
            allocation,
        })
    }

    fn arrange_grid(
        &self,
        id: ItemId,
        columns: u32,
        inner: Rect,
        children: &[ChildSpec],
        spacing: u32,
        prev: &Allocation,
    ) -> Result<Placement, LayoutError> {
        let visible: Vec<usize> = (0..children.len())
            .filter(|&i| children[i].is_visible())
            .collect();
        let specs: Vec<&ChildSpec> = visible.iter().map(|&i| &children[i]).collect();
        let (col_tracks, row_tracks) = grid_tracks(&specs, columns);

        let cols = solve_axis(id, Direction::Horizontal, &col_tracks, inner.width, spacing, prev)?;
        let rows = solve_axis(id, Direction::Vertical, &row_tracks, inner.height, spacing, prev)?;
        let col_starts = track_starts(inner.x, &cols, spacing, self.alignment);
        let row_starts = track_starts(inner.y, &rows, spacing, self.alignment);

        let per_row = columns.max(1) as usize;
        let mut rects = vec![Rect::new(inner.x, inner.y, 0, 0); children.len()];
        let mut dispositions = vec![None; children.len()];
        for (k, &i) in visible.iter().enumerate() {
            let (r, c) = (k / per_row, k % per_row);
            let child = &children[i];
            let (width, dx) = child.place_across(
                id,
                Direction::Horizontal,
                cols.sizes[c],
                self.cross_alignment,
            )?;
            let (height, dy) =
                child.place_across(id, Direction::Vertical, rows.sizes[r], self.cross_alignment)?;
            rects[i] = Rect::new(
                clamp_i32(col_starts[c] + i64::from(dx)),
                clamp_i32(row_starts[r] + i64::from(dy)),
                width,
                height,
            );
            dispositions[i] = Some(cols.dispositions[c]);
        }

        let content = Size::new(
            (cols.used() + gaps(cols.sizes.len(), spacing)).min(u64::from(u32::MAX)) as u32,
            (rows.used() + gaps(rows.sizes.len(), spacing)).min(u64::from(u32::MAX)) as u32,
        );
        let slack = Size::new(cols.slack, rows.slack);

        let mut allocation = Allocation::default();
        allocation.set(Direction::Horizontal, cols.sizes);
        allocation.set(Direction::Vertical, rows.sizes);
        Ok(Placement {
            rects,
            dispositions,
            metrics: ContainerMetrics {
                inner,
                content,
                slack,
                spacing,
            },
            allocation,
        })
    }
}

/// A child as seen by its container: device-pixel sizing and flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildSpec {
    pub sizing: ItemSizing,
    pub flags: ItemFlags,
}

impl ChildSpec {
    pub fn new(sizing: ItemSizing, flags: ItemFlags) -> Self {
        Self { sizing, flags }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(ItemFlags::VISIBLE)
    }

    #[inline]
    fn is_fixed(&self, direction: Direction) -> bool {
        self.flags.contains(ItemFlags::fixed_along(direction))
    }

    fn track(&self, direction: Direction) -> Track {
        let hint = self.sizing.hint(direction);
        if self.is_fixed(direction) {
            return Track::fixed(hint.clamped_preferred());
        }
        Track::new(
            hint.min,
            hint.preferred,
            hint.max,
            self.sizing.weight.get(direction),
        )
    }

    /// Extent and leading offset within a cell of `available` pixels.
    fn place_across(
        &self,
        container: ItemId,
        direction: Direction,
        available: u32,
        align: CrossAlignment,
    ) -> Result<(u32, u32), LayoutError> {
        let hint = self.sizing.hint(direction);
        let required = if self.is_fixed(direction) {
            hint.clamped_preferred()
        } else {
            hint.min
        };
        if required > available {
            return Err(LayoutError::Unsatisfiable {
                container,
                direction,
                required: u64::from(required),
                available,
            });
        }
        let extent = if self.is_fixed(direction) {
            required
        } else if align == CrossAlignment::Stretch {
            hint.clamp(available)
        } else {
            hint.clamp(hint.preferred.min(available))
        };
        Ok((extent, align.offset(available, extent)))
    }
}

/// Track sizes per axis from one arrangement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub horizontal: Option<Vec<u32>>,
    pub vertical: Option<Vec<u32>>,
}

impl Allocation {
    pub fn get(&self, direction: Direction) -> Option<&[u32]> {
        match direction {
            Direction::Horizontal => self.horizontal.as_deref(),
            Direction::Vertical => self.vertical.as_deref(),
        }
    }

    pub fn set(&mut self, direction: Direction, sizes: Vec<u32>) {
        match direction {
            Direction::Horizontal => self.horizontal = Some(sizes),
            Direction::Vertical => self.vertical = Some(sizes),
        }
    }
}

/// Geometry summary of one container pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerMetrics {
    /// Area after margin.
    pub inner: Rect,
    /// Extent covered by items plus spacing.
    pub content: Size,
    /// Extent no item could absorb, placed by alignment.
    pub slack: Size,
    /// Device-pixel gap between adjacent items.
    pub spacing: u32,
}

/// Output of [`Container::arrange`], indexed like the input children.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rects: Vec<Rect>,
    /// `None` for hidden children.
    pub dispositions: Vec<Option<Disposition>>,
    pub metrics: ContainerMetrics,
    pub allocation: Allocation,
}

fn solve_axis(
    id: ItemId,
    direction: Direction,
    tracks: &[Track],
    available: u32,
    spacing: u32,
    prev: &Allocation,
) -> Result<TrackSolution, LayoutError> {
    solve_tracks(tracks, available, gaps(tracks.len(), spacing), prev.get(direction))
        .map_err(|short| unsatisfiable(id, direction, short))
}

fn unsatisfiable(container: ItemId, direction: Direction, short: Shortfall) -> LayoutError {
    LayoutError::Unsatisfiable {
        container,
        direction,
        required: short.required,
        available: short.available,
    }
}

/// Total spacing for `count` adjacent items.
#[inline]
fn gaps(count: usize, spacing: u32) -> u64 {
    count.saturating_sub(1) as u64 * u64::from(spacing)
}

#[inline]
fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn track_starts(origin: i32, solution: &TrackSolution, spacing: u32, align: Alignment) -> Vec<i64> {
    let mut pos = i64::from(origin) + i64::from(align.offset(solution.slack));
    solution
        .sizes
        .iter()
        .map(|&size| {
            let start = pos;
            pos += i64::from(size) + i64::from(spacing);
            start
        })
        .collect()
}

/// Column and row tracks for `columns` cells per row.
///
/// A track needs the largest member minimum, prefers the largest member
/// preference, stops at the smallest bounded member maximum (never below its
/// own minimum) and grows with the largest member weight. It is fixed only
/// if every member is fixed along that axis.
fn grid_tracks(children: &[&ChildSpec], columns: u32) -> (Vec<Track>, Vec<Track>) {
    let per_row = columns.max(1) as usize;
    let col_count = children.len().min(per_row);
    let row_count = children.len().div_ceil(per_row);
    let mut cols: Vec<Vec<Track>> = vec![Vec::new(); col_count];
    let mut rows: Vec<Vec<Track>> = vec![Vec::new(); row_count];
    for (k, child) in children.iter().enumerate() {
        cols[k % per_row].push(child.track(Direction::Horizontal));
        rows[k / per_row].push(child.track(Direction::Vertical));
    }
    (
        cols.iter().map(|m| merge_tracks(m)).collect(),
        rows.iter().map(|m| merge_tracks(m)).collect(),
    )
}

fn merge_tracks(members: &[Track]) -> Track {
    let min = members.iter().map(|t| t.min).max().unwrap_or(0);
    let preferred = members.iter().map(|t| t.preferred.max(t.min)).max().unwrap_or(0);
    let max = members
        .iter()
        .filter(|t| !t.fixed)
        .filter_map(|t| t.max)
        .min()
        .map(|m| m.max(min));
    let weight = members.iter().map(|t| t.weight).fold(0.0f32, f32::max);
    let fixed = !members.is_empty() && members.iter().all(|t| t.fixed);
    if fixed {
        return Track::fixed(preferred);
    }
    Track {
        min,
        preferred,
        max,
        weight,
        fixed: false,
    }
}

/// Sum of tracks plus spacing, as a hint.
fn sum_tracks(tracks: &[Track], spacing: u32) -> SizeHint {
    let spacing = gaps(tracks.len(), spacing);
    let min: u64 = tracks.iter().map(|t| u64::from(t.min)).sum::<u64>() + spacing;
    let preferred: u64 = tracks
        .iter()
        .map(|t| u64::from(t.preferred.max(t.min)))
        .sum::<u64>()
        + spacing;
    let max = tracks
        .iter()
        .map(|t| t.max.map(|m| u64::from(m.max(t.min))))
        .sum::<Option<u64>>()
        .map(|m| saturate(m + spacing));
    SizeHint::new(saturate(min), saturate(preferred), max)
}

/// Largest track, as a hint.
fn max_tracks(tracks: &[Track]) -> SizeHint {
    let min = tracks.iter().map(|t| t.min).max().unwrap_or(0);
    let preferred = tracks
        .iter()
        .map(|t| t.preferred.max(t.min))
        .max()
        .unwrap_or(0);
    let max = if tracks.is_empty() {
        Some(0)
    } else {
        tracks
            .iter()
            .map(|t| t.max.map(|m| m.max(t.min)))
            .collect::<Option<Vec<u32>>>()
            .map(|maxes| maxes.into_iter().max().unwrap_or(0))
    };
    SizeHint::new(min, preferred, max)
}

fn pad(hint: SizeHint, margin: u32) -> SizeHint {
    SizeHint::new(
        hint.min.saturating_add(margin),
        hint.preferred.saturating_add(margin),
        hint.max.map(|m| m.saturating_add(margin)),
    )
}

#[inline]
fn saturate(value: u64) -> u32 {
    value.min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use pretty_assertions::assert_eq;

    fn ctx() -> LayoutContext {
        LayoutContext::default()
    }

    fn id() -> ItemId {
        ItemId::MIN
    }

    fn widget(min: u32, preferred: u32, max: Option<u32>, weight: f32) -> ChildSpec {
        ChildSpec::new(
            ItemSizing::new(
                SizeHint::new(min, preferred, max),
                SizeHint::new(min, preferred, max),
            )
            .with_weight(Weight::uniform(weight)),
            ItemFlags::VISIBLE,
        )
    }

    fn fixed(w: u32, h: u32) -> ChildSpec {
        ChildSpec::new(ItemSizing::exact(w, h), ItemFlags::VISIBLE | ItemFlags::FIXED)
    }

    fn arrange(container: &Container, area: Rect, children: &[ChildSpec]) -> Placement {
        container
            .arrange(id(), area, children, &ctx(), &Allocation::default())
            .expect("feasible")
    }

    #[test]
    fn horizontal_fixed_then_expanding() {
        let c = Container::horizontal();
        let p = arrange(
            &c,
            Rect::new(0, 0, 100, 10),
            &[fixed(10, 10), widget(0, 0, None, 1.0)],
        );
        assert_eq!(p.rects[0], Rect::new(0, 0, 10, 10));
        assert_eq!(p.rects[1], Rect::new(10, 0, 90, 10));
        assert_eq!(p.dispositions, vec![Some(Disposition::Fixed), Some(Disposition::Weighted)]);
    }

    #[test]
    fn spacing_between_items() {
        let c = Container::horizontal().spacing(5);
        let p = arrange(&c, Rect::new(0, 0, 100, 10), &[fixed(10, 10), fixed(10, 10)]);
        assert_eq!(p.rects[0], Rect::new(0, 0, 10, 10));
        assert_eq!(p.rects[1], Rect::new(15, 0, 10, 10));
        assert_eq!(p.metrics.content, Size::new(25, 10));
        assert_eq!(p.metrics.slack, Size::new(75, 0));
    }

    #[test]
    fn alignment_end_places_slack_first() {
        let c = Container::horizontal().alignment(Alignment::End);
        let p = arrange(&c, Rect::new(0, 0, 100, 10), &[fixed(10, 10), fixed(10, 10)]);
        assert_eq!(p.rects[0], Rect::new(80, 0, 10, 10));
        assert_eq!(p.rects[1], Rect::new(90, 0, 10, 10));
    }

    #[test]
    fn alignment_center_vertical() {
        let c = Container::vertical().alignment(Alignment::Center);
        let p = arrange(&c, Rect::new(0, 0, 50, 100), &[fixed(10, 10)]);
        assert_eq!(p.rects[0].y, 45);
    }

    #[test]
    fn margin_shrinks_inner_area() {
        let c = Container::horizontal().margin(Sides::all(10));
        let p = arrange(&c, Rect::new(0, 0, 100, 100), &[widget(0, 0, None, 1.0)]);
        assert_eq!(p.rects[0], Rect::new(10, 10, 80, 80));
        assert_eq!(p.metrics.inner, Rect::new(10, 10, 80, 80));
    }

    #[test]
    fn hidden_children_take_no_space_or_spacing() {
        let c = Container::horizontal().spacing(4);
        let mut hidden = fixed(30, 10);
        hidden.flags.remove(ItemFlags::VISIBLE);
        let p = arrange(
            &c,
            Rect::new(0, 0, 100, 10),
            &[fixed(10, 10), hidden, fixed(10, 10)],
        );
        assert_eq!(p.rects[1].width, 0);
        assert_eq!(p.dispositions[1], None);
        assert_eq!(p.rects[2].x, 14);
    }

    #[test]
    fn cross_stretch_respects_max() {
        let c = Container::horizontal();
        let p = arrange(&c, Rect::new(0, 0, 100, 50), &[widget(0, 10, Some(20), 1.0)]);
        assert_eq!(p.rects[0].height, 20);
        assert_eq!(p.rects[0].y, 0);
    }

    #[test]
    fn cross_center_uses_preferred() {
        let c = Container::horizontal().cross_alignment(CrossAlignment::Center);
        let p = arrange(&c, Rect::new(0, 0, 100, 50), &[widget(0, 10, None, 1.0)]);
        assert_eq!(p.rects[0].height, 10);
        assert_eq!(p.rects[0].y, 20);
    }

    #[test]
    fn main_axis_shortfall_is_an_error() {
        let c = Container::horizontal().spacing(10);
        let err = c
            .arrange(
                id(),
                Rect::new(0, 0, 50, 10),
                &[widget(30, 30, None, 0.0), widget(20, 20, None, 0.0)],
                &ctx(),
                &Allocation::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            LayoutError::Unsatisfiable {
                container: id(),
                direction: Direction::Horizontal,
                required: 60,
                available: 50,
            }
        );
    }

    #[test]
    fn cross_axis_shortfall_is_an_error() {
        let c = Container::horizontal();
        let err = c
            .arrange(
                id(),
                Rect::new(0, 0, 50, 10),
                &[widget(5, 5, None, 0.0), fixed(5, 12)],
                &ctx(),
                &Allocation::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::Unsatisfiable {
                direction: Direction::Vertical,
                required: 12,
                available: 10,
                ..
            }
        ));
    }

    #[test]
    fn config_defaults_apply_when_unset() {
        let ctx = LayoutContext::default().with_config(
            LayoutConfig::default()
                .with_default_spacing(3)
                .with_default_margin(2),
        );
        let c = Container::horizontal();
        let p = c
            .arrange(
                id(),
                Rect::new(0, 0, 100, 20),
                &[fixed(10, 10), fixed(10, 10)],
                &ctx,
                &Allocation::default(),
            )
            .expect("feasible");
        assert_eq!(p.rects[0].x, 2);
        assert_eq!(p.rects[1].x, 15);
    }

    #[test]
    fn scale_applies_to_spacing_and_margin() {
        let ctx = LayoutContext::with_scale_factor(2.0).expect("valid scale");
        let c = Container::horizontal().spacing(2).margin(Sides::all(1));
        let p = c
            .arrange(
                id(),
                Rect::new(0, 0, 100, 20),
                &[fixed(10, 10), fixed(10, 10)],
                &ctx,
                &Allocation::default(),
            )
            .expect("feasible");
        assert_eq!(p.rects[0].x, 2);
        assert_eq!(p.rects[1].x, 16);
        assert_eq!(p.metrics.spacing, 4);
    }

    #[test]
    fn grid_places_row_major() {
        let c = Container::grid(2).spacing(2);
        let children = [
            widget(0, 0, None, 1.0),
            widget(0, 0, None, 1.0),
            widget(0, 0, None, 1.0),
        ];
        let p = arrange(&c, Rect::new(0, 0, 42, 22), &children);
        assert_eq!(p.rects[0], Rect::new(0, 0, 20, 10));
        assert_eq!(p.rects[1], Rect::new(22, 0, 20, 10));
        assert_eq!(p.rects[2], Rect::new(0, 12, 20, 10));
        assert_eq!(p.metrics.content, Size::new(42, 22));
    }

    #[test]
    fn grid_column_takes_widest_minimum() {
        let c = Container::grid(2);
        let children = [
            widget(30, 30, None, 0.0),
            widget(0, 0, None, 1.0),
            widget(10, 10, None, 0.0),
            widget(0, 0, None, 1.0),
        ];
        let p = arrange(&c, Rect::new(0, 0, 100, 40), &children);
        assert_eq!(p.rects[0].width, 30);
        assert_eq!(p.rects[2].width, 30);
        assert_eq!(p.rects[1].x, 30);
        assert_eq!(p.rects[1].width, 70);
    }

    #[test]
    fn grid_zero_columns_is_one_column() {
        assert_eq!(
            Container::grid(0).arrangement(),
            Arrangement::Grid { columns: 1 }
        );
    }

    #[test]
    fn aggregate_linear_sums_main_and_maxes_cross() {
        let c = Container::horizontal().spacing(2).margin(Sides::all(1));
        let agg = c.aggregate(
            &[widget(10, 20, Some(30), 1.0), fixed(5, 40)],
            &ctx(),
        );
        assert_eq!(agg.width, SizeHint::new(10 + 5 + 2 + 2, 20 + 5 + 2 + 2, Some(30 + 5 + 2 + 2)));
        assert_eq!(agg.height, SizeHint::new(40 + 2, 40 + 2, Some(40 + 2)));
        assert_eq!(agg.weight, Weight::uniform(1.0));
    }

    #[test]
    fn aggregate_unbounded_child_unbounds_container() {
        let agg = Container::vertical().aggregate(&[widget(1, 2, None, 0.0)], &ctx());
        assert_eq!(agg.height.max, None);
        assert_eq!(agg.width.max, None);
    }

    #[test]
    fn aggregate_empty_container_is_margin_only() {
        let c = Container::vertical().margin(Sides::all(3));
        let agg = c.aggregate(&[], &ctx());
        assert_eq!(agg.width, SizeHint::exact(6));
        assert_eq!(agg.height, SizeHint::exact(6));
    }

    #[test]
    fn previous_allocation_is_returned_for_coherence() {
        let c = Container::horizontal();
        let p = arrange(
            &c,
            Rect::new(0, 0, 101, 10),
            &[widget(0, 0, None, 1.0), widget(0, 0, None, 1.0)],
        );
        assert_eq!(p.allocation.get(Direction::Horizontal), Some(&[51, 50][..]));
        let mut prev = Allocation::default();
        prev.set(Direction::Horizontal, vec![50, 51]);
        let again = c
            .arrange(
                id(),
                Rect::new(0, 0, 101, 10),
                &[widget(0, 0, None, 1.0), widget(0, 0, None, 1.0)],
                &ctx(),
                &prev,
            )
            .expect("feasible");
        assert_eq!(again.rects[0].width, 50);
    }
}
