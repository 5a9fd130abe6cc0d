use super::*;

const HEAD_WIDTH: f64 = 0.6;
const HEAD_LENGTH: f64 = 0.4;
const SHAFT: f64 = 0.3;

pub struct ArrowIcon;
impl IconShape for ArrowIcon {
    fn metadata(&self) -> IconMetadata {
        IconMetadata { id: "arrow".to_string(), name: "Arrow Right".to_string(), category: "arrows".to_string() }
    }

    fn build_path(&self, w: f64, h: f64) -> BezPath {
        let (hw, hh) = (w / 2.0, h / 2.0);
        let shaft_y = h * SHAFT / 2.0;
        let head_y = h * HEAD_WIDTH / 2.0;
        let shaft_end_x = hw - w * HEAD_LENGTH;
        debug_assert!(head_y <= hh);

        let mut path = BezPath::new();
        path.move_to((-hw, -shaft_y));
        path.line_to((shaft_end_x, -shaft_y));
        path.line_to((shaft_end_x, -head_y));
        path.line_to((hw, 0.0));
        path.line_to((shaft_end_x, head_y));
        path.line_to((shaft_end_x, shaft_y));
        path.line_to((-hw, shaft_y));
        path.close_path();
        path
    }
}
