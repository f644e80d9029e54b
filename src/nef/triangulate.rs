// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact ear clipping of planar loops with holes
//!
//! Loops are index lists into a shared point array so callers can lift the
//! triangles back to 3D without a lookup. Holes are first joined to the outer
//! loop through bridge edges (Eberly's visible-vertex search), then the single
//! resulting loop is clipped.

use crate::number::{orient2d, Point2, Scalar, Sign};

/// Triangulate the region bounded by a counterclockwise `outer` loop and
/// clockwise `holes`. Returns counterclockwise index triangles, or `None`
/// when the loops are too degenerate to clip.
pub fn triangulate(points: &[Point2], outer: &[usize], holes: &[Vec<usize>]) -> Option<Vec<[usize; 3]>> {
    let mut ring = outer.to_vec();
    let mut holes: Vec<&Vec<usize>> = holes.iter().filter(|h| h.len() >= 3).collect();
    // rightmost holes first so earlier bridges never block later ones
    holes.sort_by(|a, b| rightmost(points, b).1.cmp(rightmost(points, a).1));
    for hole in holes {
        bridge_hole(points, &mut ring, hole)?;
    }
    ear_clip(points, ring)
}

/// Position in `loop_` of its vertex with the largest x (then largest y).
fn rightmost<'a>(points: &'a [Point2], loop_: &[usize]) -> (usize, &'a Point2) {
    let mut best = 0;
    for (i, &v) in loop_.iter().enumerate() {
        let (p, q) = (&points[v], &points[loop_[best]]);
        if (&p.x, &p.y) > (&q.x, &q.y) {
            best = i;
        }
    }
    (best, &points[loop_[best]])
}

fn inside_closed_triangle(a: &Point2, b: &Point2, c: &Point2, q: &Point2) -> bool {
    let s = [orient2d(a, b, q), orient2d(b, c, q), orient2d(c, a, q)];
    !s.contains(&Sign::Negative) || !s.contains(&Sign::Positive)
}

fn neighbours(ring: &[usize], i: usize) -> (usize, usize) {
    let n = ring.len();
    (ring[(i + n - 1) % n], ring[(i + 1) % n])
}

/// Whether the direction from ring vertex `i` towards `m` starts inside the
/// polygon.
fn locally_inside(points: &[Point2], ring: &[usize], i: usize, m: &Point2) -> bool {
    let (u, w) = neighbours(ring, i);
    let (u, v, w) = (&points[u], &points[ring[i]], &points[w]);
    let left_of_in = orient2d(u, v, m) == Sign::Positive;
    let left_of_out = orient2d(v, w, m) == Sign::Positive;
    if orient2d(u, v, w) == Sign::Negative {
        left_of_in || left_of_out
    } else {
        left_of_in && left_of_out
    }
}

fn bridge_hole(points: &[Point2], ring: &mut Vec<usize>, hole: &[usize]) -> Option<()> {
    let (start, m) = rightmost(points, hole);
    let n = ring.len();

    // nearest crossing of the +x ray from m with an upward edge
    let mut hit: Option<(Scalar, usize)> = None;
    for i in 0..n {
        let (a, b) = (&points[ring[i]], &points[ring[(i + 1) % n]]);
        if !(a.y <= m.y && m.y <= b.y && a.y < b.y) {
            continue;
        }
        let t = (&m.y - &a.y).checked_div(&(&b.y - &a.y)).ok()?;
        let x = &a.x + &(&t * &(&b.x - &a.x));
        if x < m.x {
            continue;
        }
        if hit.as_ref().map_or(true, |(best, _)| x < *best) {
            hit = Some((x, i));
        }
    }
    let (hit_x, edge) = hit?;
    let hit_point = Point2::new(hit_x, m.y.clone());

    let (ea, eb) = (ring[edge], ring[(edge + 1) % n]);
    let target = if points[ea] == hit_point {
        points[ea].clone()
    } else if points[eb] == hit_point {
        points[eb].clone()
    } else {
        let candidate = if points[ea].x > points[eb].x { ea } else { eb };
        let p = &points[candidate];
        // a reflex vertex inside (m, hit, p) hides p; take the one closest
        // in angle to the ray
        let mut best: Option<&Point2> = None;
        for i in 0..n {
            let v = &points[ring[i]];
            if v == p || v == m || v.x <= m.x {
                continue;
            }
            let (u, w) = neighbours(ring, i);
            if orient2d(&points[u], v, &points[w]) != Sign::Negative
                || !inside_closed_triangle(m, &hit_point, p, v)
            {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let lhs = (&v.y - &m.y).abs() * (&b.x - &m.x);
                    let rhs = (&b.y - &m.y).abs() * (&v.x - &m.x);
                    lhs < rhs || (lhs == rhs && v.x < b.x)
                }
            };
            if better {
                best = Some(v);
            }
        }
        best.unwrap_or(p).clone()
    };

    let occurrences: Vec<usize> = (0..n).filter(|&i| points[ring[i]] == target).collect();
    let at = occurrences
        .iter()
        .copied()
        .find(|&i| locally_inside(points, ring, i, m))
        .or_else(|| occurrences.first().copied())?;

    let k = hole.len();
    let mut splice = Vec::with_capacity(k + 2);
    for j in 0..=k {
        splice.push(hole[(start + j) % k]);
    }
    splice.push(ring[at]);
    ring.splice(at + 1..at + 1, splice);
    Some(())
}

fn is_ear(points: &[Point2], ring: &[usize], i: usize, strict: bool) -> bool {
    let (u, w) = neighbours(ring, i);
    let (a, b, c) = (&points[u], &points[ring[i]], &points[w]);
    if orient2d(a, b, c) != Sign::Positive {
        return false;
    }
    ring.iter().all(|&j| {
        let q = &points[j];
        if q == a || q == b || q == c {
            return true;
        }
        if strict {
            let s = [orient2d(a, b, q), orient2d(b, c, q), orient2d(c, a, q)];
            s.contains(&Sign::Negative) || s.contains(&Sign::Zero)
        } else {
            !inside_closed_triangle(a, b, c, q)
        }
    })
}

fn ear_clip(points: &[Point2], mut ring: Vec<usize>) -> Option<Vec<[usize; 3]>> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    while ring.len() > 3 {
        let ear = (0..ring.len())
            .find(|&i| is_ear(points, &ring, i, false))
            .or_else(|| (0..ring.len()).find(|&i| is_ear(points, &ring, i, true)));
        match ear {
            Some(i) => {
                let (u, w) = neighbours(&ring, i);
                triangles.push([u, ring[i], w]);
                ring.remove(i);
            }
            None => {
                // a spike or straight run left behind by bridging has no area
                let flat = (0..ring.len()).find(|&i| {
                    let (u, w) = neighbours(&ring, i);
                    orient2d(&points[u], &points[ring[i]], &points[w]) == Sign::Zero
                        && (points[u] == points[w] || !between(&points[u], &points[ring[i]], &points[w]))
                })?;
                ring.remove(flat);
            }
        }
    }
    if let [a, b, c] = ring[..] {
        match orient2d(&points[a], &points[b], &points[c]) {
            Sign::Positive => triangles.push([a, b, c]),
            Sign::Zero => {}
            Sign::Negative => return None,
        }
    }
    Some(triangles)
}

/// `b` lies strictly inside segment `a`–`c`, all three collinear.
fn between(a: &Point2, b: &Point2, c: &Point2) -> bool {
    let ab = b - a;
    let bc = c - b;
    ab.dot(&bc).sign() == Sign::Positive
}
