//! Preview overlay: open/close, dragging by its header, resizing from a
//! corner handle. All geometry is in CSS pixels relative to the viewport.

use crate::core::events::UiEvent;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalConfig {
    /// Gap kept between a dragged modal and the viewport edge.
    pub pad: f64,
    pub min_width: f64,
    pub min_height: f64,
    /// Resizing stops this far short of the viewport size.
    pub margin: f64,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self { pad: 8.0, min_width: 300.0, min_height: 200.0, margin: 40.0 }
    }
}

/// Where a pointer or click event landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Overlay,
    Header,
    DragHandle,
    Content,
    ResizeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open,
    Dragging,
    Resizing,
}

pub type ListenerId = u64;

/// The document-level move/up listeners a gesture needs while it runs.
pub trait PointerHost: Send + Sync {
    fn attach_pointer_listeners(&self) -> ListenerId;
    fn detach_pointer_listeners(&self, id: ListenerId);
}

/// Host that only keeps count; used headless and in tests.
#[derive(Debug, Default)]
pub struct ListenerCounter {
    next: AtomicU64,
    attached: AtomicUsize,
}

impl ListenerCounter {
    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }
}

impl PointerHost for ListenerCounter {
    fn attach_pointer_listeners(&self) -> ListenerId {
        self.attached.fetch_add(1, Ordering::SeqCst);
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn detach_pointer_listeners(&self, _id: ListenerId) {
        self.attached.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Attached listeners; detached when dropped.
struct Capture {
    host: Arc<dyn PointerHost>,
    id: ListenerId,
}

impl Capture {
    fn acquire(host: &Arc<dyn PointerHost>) -> Self {
        Self { host: host.clone(), id: host.attach_pointer_listeners() }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.host.detach_pointer_listeners(self.id);
    }
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Drag { offset: Point },
    Resize { start: Point, start_size: Size },
}

pub struct ModalController {
    host: Arc<dyn PointerHost>,
    config: ModalConfig,
    viewport: Size,
    rect: Rect,
    open: bool,
    content_html: String,
    gesture: Option<(Gesture, Capture)>,
    event_tx: Option<broadcast::Sender<UiEvent>>,
}

impl ModalController {
    pub fn new(host: Arc<dyn PointerHost>, config: ModalConfig, viewport: Size, rect: Rect) -> Self {
        Self {
            host,
            config,
            viewport,
            rect,
            open: false,
            content_html: String::new(),
            gesture: None,
            event_tx: None,
        }
    }

    pub fn with_events(mut self, event_tx: broadcast::Sender<UiEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn state(&self) -> ModalState {
        match (&self.gesture, self.open) {
            (_, false) => ModalState::Closed,
            (Some((Gesture::Drag { .. }, _)), true) => ModalState::Dragging,
            (Some((Gesture::Resize { .. }, _)), true) => ModalState::Resizing,
            (None, true) => ModalState::Open,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn content(&self) -> &str {
        &self.content_html
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn open_with(&mut self, html: impl Into<String>) {
        self.content_html = html.into();
        if !self.open {
            self.open = true;
            self.emit(true);
        }
    }

    pub fn set_content(&mut self, html: impl Into<String>) {
        self.content_html = html.into();
    }

    pub fn close(&mut self) {
        self.gesture = None;
        if self.open {
            self.open = false;
            self.emit(false);
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if key == Key::Escape {
            self.close();
        }
    }

    /// Only a click on the overlay background itself closes the modal.
    pub fn click(&mut self, target: Region) {
        if target == Region::Overlay {
            self.close();
        }
    }

    pub fn pointer_down(&mut self, target: Region, at: Point) {
        if !self.open || self.gesture.is_some() {
            return;
        }
        let gesture = match target {
            Region::Header | Region::DragHandle => Gesture::Drag {
                offset: Point::new(at.x - self.rect.left, at.y - self.rect.top),
            },
            Region::ResizeHandle => Gesture::Resize {
                start: at,
                start_size: Size { width: self.rect.width, height: self.rect.height },
            },
            Region::Content | Region::Overlay => return,
        };
        self.gesture = Some((gesture, Capture::acquire(&self.host)));
    }

    pub fn pointer_move(&mut self, at: Point) {
        let gesture = match &self.gesture {
            Some((g, _)) => *g,
            None => return,
        };
        match gesture {
            Gesture::Drag { offset } => {
                self.rect.left = self.clamp_left(at.x - offset.x);
                self.rect.top = self.clamp_top(at.y - offset.y);
            }
            Gesture::Resize { start, start_size } => {
                let c = self.config;
                self.rect.width = (start_size.width + (at.x - start.x))
                    .min(self.viewport.width - c.margin)
                    .max(c.min_width);
                self.rect.height = (start_size.height + (at.y - start.y))
                    .min(self.viewport.height - c.margin)
                    .max(c.min_height);
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }

    fn clamp_left(&self, left: f64) -> f64 {
        let pad = self.config.pad;
        left.min(self.viewport.width - self.rect.width - pad).max(pad)
    }

    fn clamp_top(&self, top: f64) -> f64 {
        let pad = self.config.pad;
        top.min(self.viewport.height - self.rect.height - pad).max(pad)
    }

    fn emit(&self, open: bool) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(UiEvent::ModalChanged { open });
        }
    }
}
