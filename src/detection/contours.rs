use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;
use crate::models::Region;

/// Label 8-connected foreground (non-zero) components of a binary mask.
/// Regions are returned top-to-bottom, left-to-right.
pub fn find_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labeled = connected_components(mask, Connectivity::Eight, Luma([0]));

    let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // background
        }

        regions.entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    let mut found: Vec<Region> = regions.into_iter()
        .map(|(label, (min_x, min_y, max_x, max_y, count))| {
            Region {
                label,
                min_x,
                min_y,
                max_x,
                max_y,
                pixel_count: count,
            }
        })
        .filter(|r| r.pixel_count >= min_area)
        .collect();

    found.sort_by_key(|r| (r.min_y, r.min_x));
    found
}

/// An outermost border traced in a binary mask
#[derive(Debug, Clone)]
pub struct ExternalContour {
    pub points: Vec<Point<i32>>,
}

impl ExternalContour {
    /// Enclosed polygon area (shoelace formula over the traced border)
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area: i64 = 0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    /// Inclusive bounds of the border points as a `Region`
    pub fn bounding_region(&self) -> Option<Region> {
        let first = self.points.first()?;
        let mut region = Region {
            label: 0,
            min_x: first.x as u32,
            min_y: first.y as u32,
            max_x: first.x as u32,
            max_y: first.y as u32,
            pixel_count: self.points.len() as u32,
        };
        for p in &self.points {
            region.min_x = region.min_x.min(p.x as u32);
            region.min_y = region.min_y.min(p.y as u32);
            region.max_x = region.max_x.max(p.x as u32);
            region.max_y = region.max_y.max(p.y as u32);
        }
        Some(region)
    }
}

/// Outer borders that are not nested inside any other border.
///
/// The mask is traced inside a one-pixel background frame so foreground
/// touching the image edge still yields a border; points are returned in the
/// mask's own coordinates.
pub fn external_contours(mask: &GrayImage) -> Vec<ExternalContour> {
    let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut framed, mask, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| ExternalContour {
            points: c.points.into_iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect(),
        })
        .collect()
}
