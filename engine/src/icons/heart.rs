use super::*;

pub struct HeartIcon;
impl IconShape for HeartIcon {
    fn metadata(&self) -> IconMetadata {
        IconMetadata { id: "heart".to_string(), name: "Heart".to_string(), category: "reactions".to_string() }
    }

    fn build_path(&self, w: f64, h: f64) -> BezPath {
        let (hw, hh) = (w / 2.0, h / 2.0);
        let mut path = BezPath::new();
        path.move_to((0.0, -hh * 0.45));
        path.curve_to((-hw * 0.2, -hh), (-hw, -hh), (-hw, -hh * 0.35));
        path.curve_to((-hw, hh * 0.2), (-hw * 0.3, hh * 0.55), (0.0, hh));
        path.curve_to((hw * 0.3, hh * 0.55), (hw, hh * 0.2), (hw, -hh * 0.35));
        path.curve_to((hw, -hh), (hw * 0.2, -hh), (0.0, -hh * 0.45));
        path.close_path();
        path
    }
}
