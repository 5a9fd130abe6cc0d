use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use futures::executor::block_on;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use kurbo::Point;
use meme_engine::config::BackendConfig;
use meme_engine::export::{export, ExportOptions};
use meme_engine::feed::{FeedOrder, MemeFilter, VoteValue};
use meme_engine::icons::IconKind;
use meme_engine::loader::{load_image, LoadOutcome, LoadTarget, RasterDecoder};
use meme_engine::storage::{cast_vote, load_feed, save_meme, MemoryMemeStore, SaveImages, SaveRequest};
use meme_engine::{Action, CanvasSize, EditorConfig, EditorSession, InteractionState, Key, Modifiers};

fn png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(color)))
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

#[test]
fn build_a_meme_end_to_end() {
    let session = Rc::new(RefCell::new(EditorSession::default()));

    let outcome = block_on(load_image(&session, &RasterDecoder, &png(1600, 1200, [0, 128, 0, 255]), LoadTarget::Background, None)).unwrap();
    assert!(matches!(outcome, LoadOutcome::Applied(_)));

    let mut s = session.borrow_mut();
    assert_eq!(s.scene().canvas_size(), CanvasSize::new(800.0, 600.0));

    s.add_text(Some("top text"), None);
    let text_id = s.scene().selection().unwrap();
    s.set_text_metrics(text_id, 200.0, 40.0);
    // Export refuses to drop the caption until the host supplies its pixels.
    assert!(export(s.scene(), &ExportOptions::default()).is_err());
    s.set_text_raster(text_id, RgbaImage::from_pixel(200, 40, Rgba([255, 255, 255, 255])));
    s.add_icon(IconKind::Star, None, None);
    let star = s.scene().selection().unwrap();

    // Drag the star off the text.
    s.pointer_down(Point::new(400.0, 300.0));
    s.pointer_move(Point::new(500.0, 450.0));
    let actions = s.pointer_up(Point::new(500.0, 450.0));
    assert_eq!(actions, vec![Action::ObjectModified { id: star }]);

    // Clicking the text now selects it, the star is no longer on top of it.
    let actions = s.pointer_down(Point::new(400.0, 300.0));
    assert!(actions.contains(&Action::SelectionChanged { id: Some(text_id) }));
    s.pointer_up(Point::new(400.0, 300.0));

    s.send_backward_selected();
    assert_eq!(s.scene().index_of(text_id), Some(0));
    s.bring_forward_selected();
    assert_eq!(s.scene().index_of(text_id), Some(1));

    let full = export(s.scene(), &ExportOptions::default()).unwrap();
    assert_eq!((full.width, full.height), (800, 600));
    let thumb = export(s.scene(), &ExportOptions::png(0.3)).unwrap();
    assert_eq!((thumb.width, thumb.height), (240, 180));
    let decoded = image::load_from_memory(&full.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(5, 5).0, [0, 128, 0, 255]);
    assert_eq!(decoded.get_pixel(400, 300).0, [255, 255, 255, 255]);
}

#[test]
fn selection_always_points_at_a_live_object() {
    let mut s = EditorSession::default();
    for kind in IconKind::ALL {
        s.add_icon(kind, Some(30.0), None);
    }
    let events: Vec<Box<dyn Fn(&mut EditorSession) -> Vec<Action>>> = vec![
        Box::new(|s: &mut EditorSession| s.pointer_down(Point::new(400.0, 300.0))),
        Box::new(|s: &mut EditorSession| s.key_down(&Key::Delete, Modifiers::default())),
        Box::new(|s: &mut EditorSession| s.key_down(&Key::Char('z'), ctrl())),
        Box::new(|s: &mut EditorSession| s.key_down(&Key::Char('c'), ctrl())),
        Box::new(|s: &mut EditorSession| s.key_down(&Key::Char('v'), ctrl())),
        Box::new(|s: &mut EditorSession| s.pointer_down(Point::new(5.0, 5.0))),
        Box::new(|s: &mut EditorSession| s.duplicate_selected()),
        Box::new(|s: &mut EditorSession| s.key_down(&Key::Char('y'), ctrl())),
    ];
    for round in 0..3 {
        for event in &events {
            event(&mut s);
            if let Some(id) = s.scene().selection() {
                assert!(s.scene().get(id).is_some(), "round {} left a dangling selection", round);
            }
        }
    }
}

#[test]
fn paste_twice_yields_two_objects_at_same_offset() {
    let mut s = EditorSession::default();
    s.add_icon(IconKind::Heart, None, None);
    s.key_down(&Key::Char('c'), ctrl());
    s.key_down(&Key::Char('v'), ctrl());
    let a = s.scene().selected().unwrap().clone();
    s.key_down(&Key::Char('v'), ctrl());
    let b = s.scene().selected().unwrap().clone();
    assert_ne!(a.id, b.id);
    assert_eq!(a.center(), Point::new(410.0, 310.0));
    assert_eq!(a.center(), b.center());
    assert_eq!(s.scene().len(), 3);
}

#[test]
fn text_editing_blocks_shortcuts_until_escape() {
    let mut s = EditorSession::default();
    s.add_text(Some("edit me"), None);
    let id = s.scene().selection().unwrap();
    s.double_click(Point::new(400.0, 300.0));
    assert_eq!(s.state(), &InteractionState::TextEditing { id, recorded: false });
    assert!(s.key_down(&Key::Char('c'), ctrl()).is_empty());
    assert!(s.clipboard().is_empty());
    s.text_input("edited");
    s.key_down(&Key::Escape, Modifiers::default());
    s.key_down(&Key::Char('c'), ctrl());
    assert_eq!(s.clipboard().peek().unwrap().as_text().unwrap().content, "edited");
}

#[test]
fn stale_background_load_is_discarded() {
    let mut s = EditorSession::default();
    let slow = s.begin_load(LoadTarget::Background);
    let fast = s.begin_load(LoadTarget::Background);
    let small = meme_engine::loader::decode_bytes(&png(400, 300, [255, 0, 0, 255])).unwrap();
    let big = meme_engine::loader::decode_bytes(&png(1000, 700, [0, 0, 255, 255])).unwrap();
    assert!(matches!(s.complete_load(fast, small, None), LoadOutcome::Applied(_)));
    assert_eq!(s.complete_load(slow, big, None), LoadOutcome::Stale);
    // Upscaled by default.
    assert_eq!(s.scene().canvas_size(), CanvasSize::new(800.0, 600.0));
}

#[test]
fn no_upscale_policy_keeps_small_backgrounds() {
    let config = EditorConfig { allow_upscale: false, ..EditorConfig::default() };
    let mut s = EditorSession::new(config);
    let ticket = s.begin_load(LoadTarget::Background);
    let small = meme_engine::loader::decode_bytes(&png(400, 300, [255, 0, 0, 255])).unwrap();
    s.complete_load(ticket, small, None);
    assert_eq!(s.scene().canvas_size(), CanvasSize::new(400.0, 300.0));
}

#[test]
fn save_and_vote_through_memory_store() {
    let mut config = EditorConfig::default();
    config.backend = BackendConfig { database_app_id: Some("app".to_string()), ..Default::default() };
    let mut s = EditorSession::new(config.clone());
    s.add_text(Some("caption"), None);
    let caption = s.scene().selection().unwrap();
    assert!(SaveImages::capture(s.scene(), s.config()).is_err());
    s.set_text_raster(caption, RgbaImage::from_pixel(64, 16, Rgba([0, 0, 0, 255])));

    let images = SaveImages::capture(s.scene(), s.config()).unwrap();
    let store = MemoryMemeStore::new();
    let request = SaveRequest { title: "My meme".to_string(), owner_id: "u1".to_string(), owner_label: String::new() };
    let id = block_on(save_meme(&store, None, &config, &images, &request, 5_000.0)).unwrap();

    block_on(cast_vote(&store, &id, "u2", VoteValue::Up)).unwrap();
    let feed = block_on(load_feed(&store, &MemeFilter::Owner("u1".to_string()), FeedOrder::Trending, 6_000.0)).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].meme.owner_label, "Unknown");
    assert_eq!(feed[0].score.upvotes, 1);
    assert!(feed[0].meme.thumbnail_url.starts_with("data:image/png;base64,"));
}
