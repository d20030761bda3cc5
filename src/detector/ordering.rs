//! Puts loose ChESS corners into board order.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;
use log::trace;

type Cell = (i32, i32);

const STEPS: [Cell; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
/// Search radius around a predicted neighbour, as a fraction of the local spacing.
const SEARCH_RATIO: f32 = 0.35;
const MAX_SEEDS: usize = 16;

/// Row-major `cols x rows` corners, or `None` unless the lattice holds exactly one full window.
///
/// `points` should be sorted strongest first, seeds are taken from the front.
pub fn order_corners(points: &[Vec2], cols: usize, rows: usize) -> Option<Vec<Vec2>> {
    if points.len() < cols * rows {
        return None;
    }
    (0..points.len().min(MAX_SEEDS)).find_map(|seed| {
        let cells = grow_lattice(points, seed)?;
        let grid = unique_window(points, &cells, cols, rows)?;
        Some(canonical_order(grid))
    })
}

fn nearest_free(points: &[Vec2], taken: &[bool], target: Vec2, radius: f32) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(idx, p)| !taken[*idx] && p.distance_squared(target) <= radius * radius)
        .min_by(|a, b| a.1.distance_squared(target).total_cmp(&b.1.distance_squared(target)))
        .map(|(idx, _)| idx)
}

/// Breadth-first lattice from `seed`, each step predicted from the neighbour behind it.
fn grow_lattice(points: &[Vec2], seed: usize) -> Option<HashMap<Cell, usize>> {
    let origin = points[seed];
    let mut others: Vec<usize> = (0..points.len()).filter(|i| *i != seed).collect();
    others.sort_by(|a, b| points[*a].distance(origin).total_cmp(&points[*b].distance(origin)));
    let &u_idx = others.first()?;
    let u = points[u_idx] - origin;
    if u.length() < 1.0 {
        return None;
    }
    // second axis: the nearest point roughly perpendicular to the first
    let &v_idx = others.iter().skip(1).find(|idx| {
        let d = points[**idx] - origin;
        let ratio = d.length() / u.length();
        u.normalize().dot(d.normalize()).abs() < 0.5 && (0.5..2.0).contains(&ratio)
    })?;
    let v = points[v_idx] - origin;

    let mut cells = HashMap::from([((0, 0), seed), ((1, 0), u_idx), ((0, 1), v_idx)]);
    let mut taken = vec![false; points.len()];
    for idx in [seed, u_idx, v_idx] {
        taken[idx] = true;
    }
    let mut queue: VecDeque<Cell> = cells.keys().copied().collect();
    while let Some(cell) = queue.pop_front() {
        let here = points[cells[&cell]];
        for dir in STEPS {
            let next = (cell.0 + dir.0, cell.1 + dir.1);
            if cells.contains_key(&next) {
                continue;
            }
            let step = match cells.get(&(cell.0 - dir.0, cell.1 - dir.1)) {
                Some(back) => here - points[*back],
                None if dir.0 != 0 => u * dir.0 as f32,
                None => v * dir.1 as f32,
            };
            if let Some(found) = nearest_free(points, &taken, here + step, SEARCH_RATIO * step.length()) {
                cells.insert(next, found);
                taken[found] = true;
                queue.push_back(next);
            }
        }
    }
    trace!("seed {} grew {} cells", seed, cells.len());
    Some(cells)
}

/// The single fully populated `cols x rows` window, as `[row][col]`.
fn unique_window(points: &[Vec2], cells: &HashMap<Cell, usize>, cols: usize, rows: usize) -> Option<Vec<Vec<Vec2>>> {
    let (cols, rows) = (cols as i32, rows as i32);
    let (min_x, max_x) = cells.keys().fold((i32::MAX, i32::MIN), |(lo, hi), c| (lo.min(c.0), hi.max(c.0)));
    let (min_y, max_y) = cells.keys().fold((i32::MAX, i32::MIN), |(lo, hi), c| (lo.min(c.1), hi.max(c.1)));
    let layouts: &[bool] = if cols == rows { &[false] } else { &[false, true] };

    let mut windows = Vec::new();
    for &transposed in layouts {
        let (span_x, span_y) = if transposed { (rows, cols) } else { (cols, rows) };
        for y0 in min_y..=max_y - span_y + 1 {
            for x0 in min_x..=max_x - span_x + 1 {
                if (0..span_y).all(|dy| (0..span_x).all(|dx| cells.contains_key(&(x0 + dx, y0 + dy)))) {
                    windows.push((transposed, x0, y0));
                }
            }
        }
    }
    let &[(transposed, x0, y0)] = windows.as_slice() else {
        trace!("{} candidate windows", windows.len());
        return None;
    };
    let grid = (0..rows)
        .map(|j| {
            (0..cols)
                .map(|i| {
                    let cell = if transposed { (x0 + j, y0 + i) } else { (x0 + i, y0 + j) };
                    points[cells[&cell]]
                })
                .collect()
        })
        .collect();
    Some(grid)
}

fn origin_key(grid: &[Vec<Vec2>]) -> f32 {
    grid[0][0].x + grid[0][0].y
}

fn rotate_180(grid: &[Vec<Vec2>]) -> Vec<Vec<Vec2>> {
    grid.iter().rev().map(|row| row.iter().rev().copied().collect()).collect()
}

fn rotate_90(grid: &[Vec<Vec2>]) -> Vec<Vec<Vec2>> {
    let n = grid.len();
    (0..n).map(|j| (0..n).map(|i| grid[n - 1 - i][j]).collect()).collect()
}

/// Flattened row-major order with image handedness, first corner nearest the top-left.
fn canonical_order(mut grid: Vec<Vec<Vec2>>) -> Vec<Vec2> {
    let (rows, cols) = (grid.len(), grid[0].len());
    let u = grid[0][cols - 1] - grid[0][0];
    let v = grid[rows - 1][0] - grid[0][0];
    if u.perp_dot(v) < 0.0 {
        grid.reverse();
    }
    let mut candidates = vec![rotate_180(&grid)];
    if rows == cols {
        let quarter = rotate_90(&grid);
        candidates.push(rotate_180(&quarter));
        candidates.push(quarter);
    }
    candidates
        .into_iter()
        .fold(grid, |best, c| if origin_key(&c) < origin_key(&best) { c } else { best })
        .into_iter()
        .flatten()
        .collect()
}
