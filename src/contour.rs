//! Closed contours made of line segments and circular arcs.
//!
//! Only the operations the collision engine needs are provided: rigid
//! transforms, point distances, farthest points, containment and the minimum
//! distance between two contours.

use crate::error::{PositionerError, PositionerResult, ensure_positive};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Maximum gap allowed between consecutive figures of a closed contour (mm).
pub const CLOSURE_TOLERANCE: f64 = 1e-9;

const ANGLE_EPSILON: f64 = 1e-12;

/// One piece of a contour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Figure {
    /// Straight segment from `pa` to `pb`.
    Segment { pa: DVec2, pb: DVec2 },
    /// Counter-clockwise arc from angle `start` to angle `end` (radians),
    /// with `0 < end - start <= 2π`.
    Arc {
        center: DVec2,
        radius: f64,
        start: f64,
        end: f64,
    },
}

impl Figure {
    pub fn segment(pa: DVec2, pb: DVec2) -> Self {
        Self::Segment { pa, pb }
    }

    pub fn arc(center: DVec2, radius: f64, start: f64, end: f64) -> Self {
        Self::Arc {
            center,
            radius,
            start,
            end,
        }
    }

    pub fn start_point(&self) -> DVec2 {
        match *self {
            Self::Segment { pa, .. } => pa,
            Self::Arc {
                center,
                radius,
                start,
                ..
            } => center + radius * DVec2::from_angle(start),
        }
    }

    pub fn end_point(&self) -> DVec2 {
        match *self {
            Self::Segment { pb, .. } => pb,
            Self::Arc {
                center,
                radius,
                end,
                ..
            } => center + radius * DVec2::from_angle(end),
        }
    }

    fn validate(&self) -> PositionerResult<()> {
        match *self {
            Self::Segment { pa, pb } => {
                if !pa.is_finite() || !pb.is_finite() || pa == pb {
                    return Err(PositionerError::invalid_argument(
                        "segment endpoints must be finite and distinct",
                    ));
                }
            }
            Self::Arc {
                center,
                radius,
                start,
                end,
            } => {
                ensure_positive("arc radius", radius)?;
                let sweep = end - start;
                if !center.is_finite() || !sweep.is_finite() || sweep <= 0.0 || sweep > TAU {
                    return Err(PositionerError::invalid_argument(format!(
                        "arc sweep must lie in (0, 2π], got {sweep}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rotates by `angle` about the local origin, then translates by `offset`.
    pub fn transformed(&self, angle: f64, offset: DVec2) -> Self {
        let rot = DVec2::from_angle(angle);
        match *self {
            Self::Segment { pa, pb } => Self::Segment {
                pa: rot.rotate(pa) + offset,
                pb: rot.rotate(pb) + offset,
            },
            Self::Arc {
                center,
                radius,
                start,
                end,
            } => Self::Arc {
                center: rot.rotate(center) + offset,
                radius,
                start: start + angle,
                end: end + angle,
            },
        }
    }

    pub fn distance_to_point(&self, p: DVec2) -> f64 {
        match *self {
            Self::Segment { pa, pb } => p.distance(closest_on_segment(pa, pb, p)),
            Self::Arc {
                center,
                radius,
                start,
                end,
            } => {
                let v = p - center;
                let len = v.length();
                if len == 0.0 {
                    return radius;
                }
                if arc_contains_angle(start, end, v.y.atan2(v.x)) {
                    (len - radius).abs()
                } else {
                    p.distance(self.start_point())
                        .min(p.distance(self.end_point()))
                }
            }
        }
    }

    /// Point of the figure farthest from `p`, with its distance.
    pub fn farthest_point_from(&self, p: DVec2) -> (DVec2, f64) {
        let (a, b) = (self.start_point(), self.end_point());
        let mut best = if p.distance(a) >= p.distance(b) {
            (a, p.distance(a))
        } else {
            (b, p.distance(b))
        };
        if let Self::Arc {
            center,
            radius,
            start,
            end,
        } = *self
        {
            let dir = center - p;
            let len = dir.length();
            if len == 0.0 {
                return (a, radius);
            }
            if arc_contains_angle(start, end, dir.y.atan2(dir.x)) && len + radius > best.1 {
                best = (center + dir * (radius / len), len + radius);
            }
        }
        best
    }

    pub fn intersects(&self, other: &Figure) -> bool {
        match (*self, *other) {
            (Self::Segment { pa, pb }, Self::Segment { pa: pc, pb: pd }) => {
                segments_intersect(pa, pb, pc, pd)
            }
            (
                Self::Segment { pa, pb },
                Self::Arc {
                    center,
                    radius,
                    start,
                    end,
                },
            )
            | (
                Self::Arc {
                    center,
                    radius,
                    start,
                    end,
                },
                Self::Segment { pa, pb },
            ) => segment_circle_points(pa, pb, center, radius)
                .into_iter()
                .flatten()
                .any(|q| {
                    let v = q - center;
                    arc_contains_angle(start, end, v.y.atan2(v.x))
                }),
            (
                Self::Arc {
                    center: c1,
                    radius: r1,
                    start: s1,
                    end: e1,
                },
                Self::Arc {
                    center: c2,
                    radius: r2,
                    start: s2,
                    end: e2,
                },
            ) => {
                let d = c1.distance(c2);
                if d == 0.0 {
                    // Concentric: only coincident circles can meet, and then
                    // only where the spans overlap.
                    return r1 == r2
                        && (arc_contains_angle(s1, e1, s2)
                            || arc_contains_angle(s1, e1, e2)
                            || arc_contains_angle(s2, e2, s1));
                }
                circle_circle_points(c1, r1, c2, r2)
                    .into_iter()
                    .flatten()
                    .any(|q| {
                        let (v1, v2) = (q - c1, q - c2);
                        arc_contains_angle(s1, e1, v1.y.atan2(v1.x))
                            && arc_contains_angle(s2, e2, v2.y.atan2(v2.x))
                    })
            }
        }
    }

    /// Minimum distance between the two figures, zero when they meet.
    pub fn distance_to(&self, other: &Figure) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        let mut d = other
            .distance_to_point(self.start_point())
            .min(other.distance_to_point(self.end_point()))
            .min(self.distance_to_point(other.start_point()))
            .min(self.distance_to_point(other.end_point()));

        // Interior-to-interior minima only occur along lines through arc centres.
        match (*self, *other) {
            (Self::Segment { .. }, Self::Segment { .. }) => {}
            (
                Self::Segment { pa, pb },
                Self::Arc {
                    center,
                    radius,
                    start,
                    end,
                },
            )
            | (
                Self::Arc {
                    center,
                    radius,
                    start,
                    end,
                },
                Self::Segment { pa, pb },
            ) => {
                let v = closest_on_segment(pa, pb, center) - center;
                let len = v.length();
                if len >= radius && arc_contains_angle(start, end, v.y.atan2(v.x)) {
                    d = d.min(len - radius);
                }
            }
            (
                Self::Arc {
                    center: c1,
                    radius: r1,
                    start: s1,
                    end: e1,
                },
                Self::Arc {
                    center: c2,
                    radius: r2,
                    start: s2,
                    end: e2,
                },
            ) => {
                let axis = c2 - c1;
                if axis.length() > 0.0 {
                    let angle = axis.y.atan2(axis.x);
                    for a in [angle, angle + PI] {
                        if arc_contains_angle(s1, e1, a) {
                            d = d.min(other.distance_to_point(c1 + r1 * DVec2::from_angle(a)));
                        }
                        if arc_contains_angle(s2, e2, a) {
                            d = d.min(self.distance_to_point(c2 + r2 * DVec2::from_angle(a)));
                        }
                    }
                }
            }
        }
        d
    }
}

/// A closed, ordered sequence of figures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContour")]
pub struct Contour {
    figures: Vec<Figure>,
}

#[derive(Deserialize)]
struct RawContour {
    figures: Vec<Figure>,
}

impl TryFrom<RawContour> for Contour {
    type Error = PositionerError;

    fn try_from(raw: RawContour) -> PositionerResult<Self> {
        Self::new(raw.figures)
    }
}

impl Contour {
    /// Validates that `figures` is non-empty and chains end-to-start into a closed loop.
    pub fn new(figures: Vec<Figure>) -> PositionerResult<Self> {
        if figures.is_empty() {
            return Err(PositionerError::invalid_argument("contour has no figures"));
        }
        for figure in &figures {
            figure.validate()?;
        }
        let n = figures.len();
        for i in 0..n {
            let next = &figures[(i + 1) % n];
            let gap = figures[i].end_point().distance(next.start_point());
            if gap > CLOSURE_TOLERANCE {
                return Err(PositionerError::invalid_argument(format!(
                    "contour is not closed: figure {i} ends {gap} mm away from the next start"
                )));
            }
        }
        Ok(Self { figures })
    }

    /// Full circle as two half arcs.
    pub fn circle(center: DVec2, radius: f64) -> PositionerResult<Self> {
        Self::new(vec![
            Figure::arc(center, radius, 0.0, PI),
            Figure::arc(center, radius, PI, TAU),
        ])
    }

    /// Rounded bar from the origin to `(length, 0)` with half-width `radius`.
    pub fn stadium(length: f64, radius: f64) -> PositionerResult<Self> {
        ensure_positive("stadium length", length)?;
        ensure_positive("stadium radius", radius)?;
        Self::new(vec![
            Figure::segment(DVec2::new(0.0, -radius), DVec2::new(length, -radius)),
            Figure::arc(DVec2::new(length, 0.0), radius, -FRAC_PI_2, FRAC_PI_2),
            Figure::segment(DVec2::new(length, radius), DVec2::new(0.0, radius)),
            Figure::arc(DVec2::ZERO, radius, FRAC_PI_2, FRAC_PI_2 + PI),
        ])
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn transformed(&self, angle: f64, offset: DVec2) -> Self {
        Self {
            figures: self
                .figures
                .iter()
                .map(|f| f.transformed(angle, offset))
                .collect(),
        }
    }

    pub fn distance_to_point(&self, p: DVec2) -> f64 {
        self.figures
            .iter()
            .map(|f| f.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn farthest_point_from(&self, p: DVec2) -> (DVec2, f64) {
        self.figures
            .iter()
            .map(|f| f.farthest_point_from(p))
            .fold((p, 0.0), |best, cand| if cand.1 > best.1 { cand } else { best })
    }

    pub fn farthest_distance_from(&self, p: DVec2) -> f64 {
        self.farthest_point_from(p).1
    }

    /// Even-odd test on the chord polygon, corrected by every arc's circular segment.
    pub fn contains(&self, p: DVec2) -> bool {
        let mut inside = false;
        for figure in &self.figures {
            let (a, b) = (figure.start_point(), figure.end_point());
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            if let Figure::Arc {
                center,
                radius,
                start,
                end,
            } = *figure
                && in_circular_segment(center, radius, start, end, p)
            {
                inside = !inside;
            }
        }
        inside
    }

    fn overlaps(&self, other: &Contour) -> bool {
        self.contains(other.figures[0].start_point()) || other.contains(self.figures[0].start_point())
    }

    /// Minimum distance between the contours, evaluated figure by figure with
    /// `self` on the outer loop. Zero when they cross or one encloses the other.
    pub fn distance_to(&self, other: &Contour) -> f64 {
        if self.overlaps(other) {
            return 0.0;
        }
        let mut d = f64::INFINITY;
        for fa in &self.figures {
            for fb in &other.figures {
                d = d.min(fa.distance_to(fb));
                if d == 0.0 {
                    return 0.0;
                }
            }
        }
        d
    }

    /// `true` when the contours meet or come closer than `tolerance`.
    pub fn is_closer_than(&self, other: &Contour, tolerance: f64) -> bool {
        if self.overlaps(other) {
            return true;
        }
        self.figures.iter().any(|fa| {
            other.figures.iter().any(|fb| {
                let d = fa.distance_to(fb);
                d <= 0.0 || d < tolerance
            })
        })
    }
}

fn arc_contains_angle(start: f64, end: f64, angle: f64) -> bool {
    let sweep = end - start;
    let d = (angle - start).rem_euclid(TAU);
    d <= sweep + ANGLE_EPSILON || d >= TAU - ANGLE_EPSILON
}

fn in_circular_segment(center: DVec2, radius: f64, start: f64, end: f64, p: DVec2) -> bool {
    if p.distance(center) >= radius {
        return false;
    }
    if end - start >= TAU - ANGLE_EPSILON {
        return true;
    }
    let a = center + radius * DVec2::from_angle(start);
    let b = center + radius * DVec2::from_angle(end);
    let mid = center + radius * DVec2::from_angle(0.5 * (start + end));
    let chord = b - a;
    chord.perp_dot(p - a) * chord.perp_dot(mid - a) > 0.0
}

fn closest_on_segment(pa: DVec2, pb: DVec2, p: DVec2) -> DVec2 {
    let d = pb - pa;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return pa;
    }
    let t = ((p - pa).dot(d) / len2).clamp(0.0, 1.0);
    pa + t * d
}

fn segments_intersect(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> bool {
    let d1 = (d - c).perp_dot(a - c);
    let d2 = (d - c).perp_dot(b - c);
    let d3 = (b - a).perp_dot(c - a);
    let d4 = (b - a).perp_dot(d - a);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && in_bounds(c, d, a))
        || (d2 == 0.0 && in_bounds(c, d, b))
        || (d3 == 0.0 && in_bounds(a, b, c))
        || (d4 == 0.0 && in_bounds(a, b, d))
}

/// For a point known to be collinear with `p`–`q`, whether it lies between them.
fn in_bounds(p: DVec2, q: DVec2, r: DVec2) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

fn segment_circle_points(pa: DVec2, pb: DVec2, center: DVec2, radius: f64) -> [Option<DVec2>; 2] {
    let d = pb - pa;
    let f = pa - center;
    let a = d.length_squared();
    let b = 2.0 * f.dot(d);
    let c = f.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if a == 0.0 || disc < 0.0 {
        return [None, None];
    }
    let s = disc.sqrt();
    let at = |t: f64| (0.0..=1.0).contains(&t).then(|| pa + t * d);
    [at((-b - s) / (2.0 * a)), at((-b + s) / (2.0 * a))]
}

fn circle_circle_points(c1: DVec2, r1: f64, c2: DVec2, r2: f64) -> [Option<DVec2>; 2] {
    let axis = c2 - c1;
    let d = axis.length();
    if d == 0.0 || d > r1 + r2 || d < (r1 - r2).abs() {
        return [None, None];
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let u = axis / d;
    let base = c1 + a * u;
    [Some(base + h * u.perp()), Some(base - h * u.perp())]
}
