use super::*;
use std::f64::consts::PI;

const POINTS: u32 = 5;
const INNER_RATIO: f64 = 0.5;

pub struct StarIcon;
impl IconShape for StarIcon {
    fn metadata(&self) -> IconMetadata {
        IconMetadata { id: "star".to_string(), name: "Star".to_string(), category: "reactions".to_string() }
    }

    fn build_path(&self, w: f64, h: f64) -> BezPath {
        let rx = w / 2.0;
        let ry = h / 2.0;
        let mut path = BezPath::new();
        for i in 0..(POINTS * 2) {
            let angle = (i as f64 * PI / POINTS as f64) - (PI / 2.0);
            let r = if i % 2 == 0 { 1.0 } else { INNER_RATIO };
            let p = (rx * r * angle.cos(), ry * r * angle.sin());
            if i == 0 { path.move_to(p); } else { path.line_to(p); }
        }
        path.close_path();
        path
    }
}
