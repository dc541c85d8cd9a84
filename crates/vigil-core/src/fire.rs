//! Fire-like region detection, a pure color-threshold heuristic.
//!
//! Pixels in the red-orange HSV band (hue 0–35 on the 0–179 scale,
//! saturation and value >= 150) form a binary mask that is eroded and
//! dilated to drop speckle, then grouped into connected components.
//! Components over 1000 px² are reported as fire-like regions.

use image::RgbImage;

use crate::types::BoundingBox;

const HUE_MAX: u8 = 35;
const SAT_MIN: u8 = 150;
const VAL_MIN: u8 = 150;
const MORPH_ITERATIONS: usize = 2;
const MIN_REGION_AREA: usize = 1000;

/// Detect fire-like regions in an RGB frame.
pub fn detect_fire_regions(frame: &RgbImage) -> Vec<BoundingBox> {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let mut mask: Vec<bool> = frame
        .pixels()
        .map(|p| {
            let (hue, sat, val) = rgb_to_hsv(p.0[0], p.0[1], p.0[2]);
            hue <= HUE_MAX && sat >= SAT_MIN && val >= VAL_MIN
        })
        .collect();

    for _ in 0..MORPH_ITERATIONS {
        mask = erode(&mask, w, h);
    }
    for _ in 0..MORPH_ITERATIONS {
        mask = dilate(&mask, w, h);
    }

    components(&mask, w, h)
        .into_iter()
        .filter(|c| c.area > MIN_REGION_AREA)
        .map(|c| BoundingBox::new(
            c.min_x as f32,
            c.min_y as f32,
            (c.max_x - c.min_x + 1) as f32,
            (c.max_y - c.min_y + 1) as f32,
        ))
        .collect()
}

/// RGB to HSV on the OpenCV scale: hue 0–179, saturation/value 0–255.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let val = max;
    let sat = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * ((gf - bf) / delta).rem_euclid(6.0)
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };

    ((hue_deg / 2.0).round() as u8, sat.round() as u8, val.round() as u8)
}

/// 3x3 erosion; out-of-bounds neighbors count as unset.
fn erode(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    morph(mask, w, h, true)
}

/// 3x3 dilation; out-of-bounds neighbors count as unset.
fn dilate(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    morph(mask, w, h, false)
}

fn morph(mask: &[bool], w: usize, h: usize, require_all: bool) -> Vec<bool> {
    let mut out = vec![false; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let mut all = true;
            let mut any = false;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    let set = nx >= 0
                        && ny >= 0
                        && (nx as usize) < w
                        && (ny as usize) < h
                        && mask[ny as usize * w + nx as usize];
                    all &= set;
                    any |= set;
                }
            }
            out[y * w + x] = if require_all { all } else { any };
        }
    }
    out
}

struct Component {
    area: usize,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

/// 4-connected components over the binary mask.
fn components(mask: &[bool], w: usize, h: usize) -> Vec<Component> {
    let mut seen = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        let mut c = Component {
            area: 0,
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        };
        seen[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            c.area += 1;
            c.min_x = c.min_x.min(x);
            c.min_y = c.min_y.min(y);
            c.max_x = c.max_x.max(x);
            c.max_y = c.max_y.max(y);

            let mut visit = |nx: usize, ny: usize| {
                let nidx = ny * w + nx;
                if mask[nidx] && !seen[nidx] {
                    seen[nidx] = true;
                    stack.push(nidx);
                }
            };
            if x > 0 {
                visit(x - 1, y);
            }
            if x + 1 < w {
                visit(x + 1, y);
            }
            if y > 0 {
                visit(x, y - 1);
            }
            if y + 1 < h {
                visit(x, y + 1);
            }
        }
        out.push(c);
    }
    out
}
