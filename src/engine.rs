use crate::browser;
use anyhow::{anyhow, Error, Result};
// wasm is single threaded, Rc RefCell over Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref cast from Javascript type to Rust type
    // - we create the closure and specify its type, so the cast holds
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::KeyState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &KeyState);
    fn draw(&mut self, renderer: &Renderer);
}

/// length of a frame in milliseconds
pub const FRAME_SIZE: f64 = 1.0 / 60.0 * 1000.0;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    /// Fixed step loop
    /// - update() runs once per FRAME_SIZE of elapsed time
    /// - draw() runs once per animation frame
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut keyevent_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut keystate = KeyState::new();
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            input::process_input(&mut keystate, &mut keyevent_receiver);

            game_loop.accumulated_delta += perf - game_loop.last_frame;
            while game_loop.accumulated_delta > FRAME_SIZE {
                game.update(&keystate);
                keystate.end_update();
                game_loop.accumulated_delta -= FRAME_SIZE;
            }
            game_loop.last_frame = perf;
            game.draw(&renderer);

            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(callback) {
                    error!("GameLoop: {:#?}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

// ==================== Geometry ====================
/// Also used as a 2D vector for velocities and accelerations
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Point) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// Axis aligned rectangle, `position` is the top left corner (y grows down)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn new_from_x_y(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(Point::new(x, y), Size::new(width, height))
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn left(&self) -> f64 {
        self.x()
    }

    pub fn right(&self) -> f64 {
        self.x() + self.width()
    }

    pub fn top(&self) -> f64 {
        self.y()
    }

    pub fn bottom(&self) -> f64 {
        self.y() + self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x() + self.width() * 0.5,
            self.y() + self.height() * 0.5,
        )
    }

    pub fn mid_bottom(&self) -> Point {
        Point::new(self.x() + self.width() * 0.5, self.bottom())
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left(), self.bottom())
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    // anchor setters consume and return the rect, same size, new position
    pub fn with_center(mut self, center: Point) -> Self {
        self.position = Point::new(
            center.x - self.width() * 0.5,
            center.y - self.height() * 0.5,
        );
        self
    }

    pub fn with_mid_bottom(mut self, mid_bottom: Point) -> Self {
        self.position = Point::new(
            mid_bottom.x - self.width() * 0.5,
            mid_bottom.y - self.height(),
        );
        self
    }

    pub fn with_bottom_left(mut self, bottom_left: Point) -> Self {
        self.position = Point::new(bottom_left.x, bottom_left.y - self.height());
        self
    }

    pub fn with_bottom_right(mut self, bottom_right: Point) -> Self {
        self.position = Point::new(
            bottom_right.x - self.width(),
            bottom_right.y - self.height(),
        );
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn translated(mut self, dx: f64, dy: f64) -> Self {
        self.position += Point::new(dx, dy);
        self
    }

    /// Strict overlap, touching edges don't count and empty rects never
    /// intersect anything
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// True if any part of the segment `start -> end` lies inside the rect.
    /// Liang-Barsky clipping without keeping the result.
    ///
    /// All four edges count as inside, right and bottom included. Integer
    /// pixel rects stop one short of `right()`/`bottom()`, these are float
    /// boxes and a skier grazing the far edge still hits it.
    pub fn clips_segment(&self, start: Point, end: Point) -> bool {
        if self.is_empty() {
            return false;
        }

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let mut entering = 0.0_f64;
        let mut leaving = 1.0_f64;

        let boundaries = [
            (-dx, start.x - self.left()),
            (dx, self.right() - start.x),
            (-dy, start.y - self.top()),
            (dy, self.bottom() - start.y),
        ];

        for (p, q) in boundaries {
            if p == 0.0 {
                // parallel to this edge and outside of it
                if q < 0.0 {
                    return false;
                }
                continue;
            }

            let r = q / p;
            if p < 0.0 {
                if r > leaving {
                    return false;
                }
                entering = entering.max(r);
            } else {
                if r < entering {
                    return false;
                }
                leaving = leaving.min(r);
            }
        }

        true
    }
}

// ==================== Rendering ====================
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Vertical anchor for text, text is always centered horizontally
#[derive(Debug, Copy, Clone)]
pub enum Baseline {
    Top,
    Middle,
    Bottom,
}

impl Baseline {
    fn as_str(&self) -> &'static str {
        match self {
            Baseline::Top => "top",
            Baseline::Middle => "middle",
            Baseline::Bottom => "bottom",
        }
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn fill_rect(&self, rect: &Rect, color: Color) {
        self.context.set_fill_style_str(&color.css());
        self.context
            .fill_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn stroke_rect(&self, rect: &Rect, color: Color) {
        self.context.set_stroke_style_str(&color.css());
        self.context
            .stroke_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn draw_entire_image(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.x(),
                destination.y(),
                destination.width(),
                destination.height(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    /// Mirror the image around its vertical axis
    /// - scale(-1, 1) flips the x axis, so we draw at -right instead of left
    pub fn draw_flipped_image(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context.save();
        self.context
            .scale(-1.0, 1.0)
            .expect("Scaling is throwing exceptions! Unrecoverable error");
        self.draw_entire_image(
            image,
            &Rect::new_from_x_y(
                -destination.right(),
                destination.y(),
                destination.width(),
                destination.height(),
            ),
        );
        self.context.restore();
    }

    pub fn draw_text(&self, text: &str, font: &str, color: Color, anchor: Point, baseline: Baseline) {
        self.context.set_font(font);
        self.context.set_fill_style_str(&color.css());
        self.context.set_text_align("center");
        self.context.set_text_baseline(baseline.as_str());
        if let Err(err) = self.context.fill_text(text, anchor.x, anchor.y) {
            error!("Could not draw text '{}' : {:#?}", text, err);
        }
    }
}

#[cfg(debug_assertions)]
pub trait DebugDraw {
    fn draw_debug(&self, renderer: &Renderer);
}

#[cfg(debug_assertions)]
impl DebugDraw for Rect {
    fn draw_debug(&self, renderer: &Renderer) {
        renderer.stroke_rect(self, Color(200, 200, 200));
    }
}

/// A loaded image together with its natural size
#[derive(Debug, Clone)]
pub struct Image {
    element: HtmlImageElement,
    size: Size,
}

impl Image {
    pub fn new(element: HtmlImageElement) -> Self {
        let size = Size::new(element.natural_width().into(), element.natural_height().into());
        Image { element, size }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Draw at `destination`, which should carry this image's size
    pub fn draw(&self, renderer: &Renderer, destination: &Rect, flipped: bool) {
        if flipped {
            renderer.draw_flipped_image(&self.element, destination);
        } else {
            renderer.draw_entire_image(&self.element, destination);
        }
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::create_html_image_element()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading image: {:#?}", err)));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - first ? yields the channel result
    // - second ? propagates the image load error
    rx.await??;

    Ok(image)
}

pub mod input {
    use crate::browser;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;

    pub enum KeyPress {
        KeyUp(String),
        KeyDown(String),
    }

    /// Keys by `KeyboardEvent.code`
    /// - held    : down right now
    /// - pressed : went down since the last update (edge triggered, so
    ///             holding a key or OS key repeat counts once)
    #[derive(Debug, Default)]
    pub struct KeyState {
        held: HashSet<String>,
        pressed: HashSet<String>,
    }

    impl KeyState {
        pub fn new() -> Self {
            KeyState::default()
        }

        pub fn is_pressed(&self, code: &str) -> bool {
            self.held.contains(code)
        }

        pub fn was_pressed(&self, code: &str) -> bool {
            self.pressed.contains(code)
        }

        pub fn set_pressed(&mut self, code: &str) {
            if self.held.insert(code.to_string()) {
                self.pressed.insert(code.to_string());
            }
        }

        pub fn set_released(&mut self, code: &str) {
            self.held.remove(code);
        }

        /// Forget the presses once an update has seen them
        pub fn end_update(&mut self) {
            self.pressed.clear();
        }
    }

    pub fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
        let (keydown_sender, keyevent_receiver) = unbounded();
        let keydown_sender = Rc::new(RefCell::new(keydown_sender));
        let keyup_sender = Rc::clone(&keydown_sender);

        let onkeydown = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keydown_sender
                .borrow_mut()
                .start_send(KeyPress::KeyDown(event.code()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keyup_sender
                .borrow_mut()
                .start_send(KeyPress::KeyUp(event.code()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let canvas = browser::canvas()?;
        canvas.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        canvas.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        onkeydown.forget();
        onkeyup.forget();

        Ok(keyevent_receiver)
    }

    pub fn process_input(state: &mut KeyState, keyevent_receiver: &mut UnboundedReceiver<KeyPress>) {
        loop {
            match keyevent_receiver.try_next() {
                Ok(None) => break,
                Err(_err) => break,
                Ok(Some(evt)) => match evt {
                    KeyPress::KeyUp(code) => state.set_released(&code),
                    KeyPress::KeyDown(code) => state.set_pressed(&code),
                },
            };
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn a_held_key_is_pressed_only_once() {
            let mut keys = KeyState::new();
            keys.set_pressed("ArrowLeft");
            assert!(keys.was_pressed("ArrowLeft"));
            assert!(keys.is_pressed("ArrowLeft"));

            keys.end_update();
            // key repeat sends another keydown while held
            keys.set_pressed("ArrowLeft");
            assert!(!keys.was_pressed("ArrowLeft"));
            assert!(keys.is_pressed("ArrowLeft"));

            keys.set_released("ArrowLeft");
            keys.set_pressed("ArrowLeft");
            assert!(keys.was_pressed("ArrowLeft"));
        }

        #[test]
        fn press_and_release_between_updates_still_counts() {
            let mut keys = KeyState::new();
            keys.set_pressed("KeyA");
            keys.set_released("KeyA");
            assert!(keys.was_pressed("KeyA"));
            assert!(!keys.is_pressed("KeyA"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn anchors_move_the_rect_without_resizing() {
        let rect = Rect::new_from_x_y(0.0, 0.0, 20.0, 40.0);

        let centered = rect.with_center(Point::new(100.0, 100.0));
        assert_eq!(centered.position, Point::new(90.0, 80.0));
        assert_eq!(centered.size, rect.size);

        let bottom_right = rect.with_bottom_right(Point::new(50.0, 50.0));
        assert_eq!(bottom_right.bottom_right(), Point::new(50.0, 50.0));
        assert_eq!(bottom_right.position, Point::new(30.0, 10.0));

        let mid_bottom = rect.with_mid_bottom(Point::new(10.0, 10.0));
        assert_eq!(mid_bottom.mid_bottom(), Point::new(10.0, 10.0));

        let bottom_left = rect.with_bottom_left(Point::new(5.0, 45.0));
        assert_eq!(bottom_left.position, Point::new(5.0, 5.0));
    }

    #[test]
    fn intersects_is_strict() {
        let a = Rect::new_from_x_y(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new_from_x_y(5.0, 5.0, 10.0, 10.0)));
        // sharing an edge is not an overlap
        assert!(!a.intersects(&Rect::new_from_x_y(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new_from_x_y(3.0, 3.0, 0.0, 4.0)));
    }

    #[test]
    fn segment_crossing_the_rect_is_clipped() {
        let rect = Rect::new_from_x_y(10.0, 10.0, 10.0, 5.0);
        // passes straight through, neither end inside
        assert!(rect.clips_segment(Point::new(15.0, 0.0), Point::new(15.0, 30.0)));
        // ends inside
        assert!(rect.clips_segment(Point::new(0.0, 0.0), Point::new(12.0, 12.0)));
        // fully inside
        assert!(rect.clips_segment(Point::new(11.0, 11.0), Point::new(12.0, 12.0)));
        // a single point on the edge
        assert!(rect.clips_segment(Point::new(10.0, 12.0), Point::new(10.0, 12.0)));
    }

    #[test]
    fn far_edges_are_part_of_the_rect() {
        let rect = Rect::new_from_x_y(10.0, 10.0, 10.0, 5.0);
        // ends exactly on the right edge
        assert!(rect.clips_segment(Point::new(25.0, 12.0), Point::new(20.0, 12.0)));
        // runs along the right edge
        assert!(rect.clips_segment(Point::new(20.0, 0.0), Point::new(20.0, 30.0)));
        // ends exactly on the bottom edge
        assert!(rect.clips_segment(Point::new(15.0, 30.0), Point::new(15.0, 15.0)));
        // just past them
        assert!(!rect.clips_segment(Point::new(20.1, 0.0), Point::new(20.1, 30.0)));
        assert!(!rect.clips_segment(Point::new(0.0, 15.1), Point::new(30.0, 15.1)));
    }

    #[test]
    fn segment_missing_the_rect_is_not_clipped() {
        let rect = Rect::new_from_x_y(10.0, 10.0, 10.0, 5.0);
        assert!(!rect.clips_segment(Point::new(0.0, 0.0), Point::new(0.0, 30.0)));
        // stops just before the top edge
        assert!(!rect.clips_segment(Point::new(15.0, 0.0), Point::new(15.0, 9.9)));
        // diagonal passing the corner
        assert!(!rect.clips_segment(Point::new(0.0, 12.0), Point::new(8.0, 0.0)));
        assert!(!Rect::default().clips_segment(Point::new(0.0, 0.0), Point::new(1.0, 1.0)));
    }

    #[test]
    fn point_behaves_as_a_vector() {
        let v = Point::new(3.0, 4.0);
        assert_relative_eq!(v.length(), 5.0);
        assert_eq!(v * 2.0 - Point::new(1.0, 1.0), Point::new(5.0, 7.0));
    }
}
