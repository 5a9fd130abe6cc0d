use super::*;
use kurbo::{Ellipse, Point, Shape};

pub struct CircleIcon;
impl IconShape for CircleIcon {
    fn metadata(&self) -> IconMetadata {
        IconMetadata { id: "circle".to_string(), name: "Circle".to_string(), category: "symbols".to_string() }
    }

    fn build_path(&self, w: f64, h: f64) -> BezPath {
        Ellipse::new(Point::ORIGIN, (w / 2.0, h / 2.0), 0.0).to_path(0.1)
    }
}
