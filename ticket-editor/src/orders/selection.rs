//! Selection Tracker
//!
//! Holds at most one selected line, the target of increment/decrement
//! gestures. The presentation layer hands over a [`RowHandle`] for the row it
//! rendered; the tracker never searches rendered output to find it again.

use super::snapshot::SnapshotStore;
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a presentation-layer row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowHandle(String);

impl RowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual state of selected rows, implemented by the presentation layer
pub trait RowHighlighter: Send + Sync {
    fn highlight(&self, handle: &RowHandle);
    fn clear(&self, handle: &RowHandle);
}

/// Highlighter for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHighlighter;

impl RowHighlighter for NoopHighlighter {
    fn highlight(&self, _handle: &RowHandle) {}
    fn clear(&self, _handle: &RowHandle) {}
}

/// Resolves the row currently rendered for a menu line (auto-select)
pub trait RowResolver: Send + Sync {
    fn resolve(&self, menu_name: &str) -> Option<RowHandle>;
}

/// The currently selected line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub order_id: String,
    pub menu_id: String,
    pub menu_name: String,
    /// Display quantity, refreshed after each gesture
    pub quantity: u32,
    pub price: i64,
    pub original_quantity: u32,
}

pub struct SelectionTracker {
    current: Option<Selection>,
    handle: Option<RowHandle>,
    highlighter: Arc<dyn RowHighlighter>,
}

impl fmt::Debug for SelectionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionTracker")
            .field("current", &self.current)
            .field("handle", &self.handle)
            .field("highlighter", &"<dyn RowHighlighter>")
            .finish()
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new(Arc::new(NoopHighlighter))
    }
}

impl SelectionTracker {
    pub fn new(highlighter: Arc<dyn RowHighlighter>) -> Self {
        Self {
            current: None,
            handle: None,
            highlighter,
        }
    }

    /// Select a line, replacing any prior selection
    ///
    /// `menu_id`/`price`/`original_quantity` come from the snapshot when the
    /// line is committed; a line that only exists as a pending add defaults to
    /// `menu_id = order_id`, `price = 0`.
    pub fn select(
        &mut self,
        order_id: &str,
        menu_name: &str,
        quantity: u32,
        handle: Option<RowHandle>,
        snapshot: &SnapshotStore,
    ) -> bool {
        self.clear();

        let (menu_id, price, original_quantity) = match snapshot.get(menu_name) {
            Some(line) => (line.menu_id.clone(), line.price, line.quantity),
            None => (order_id.to_string(), 0, 0),
        };

        if let Some(h) = &handle {
            self.highlighter.highlight(h);
        }
        self.current = Some(Selection {
            order_id: order_id.to_string(),
            menu_id,
            menu_name: menu_name.to_string(),
            quantity,
            price,
            original_quantity,
        });
        self.handle = handle;
        tracing::debug!(menu_name = %menu_name, "Line selected");
        true
    }

    /// Second click on the selected line deselects it (returns false)
    pub fn toggle(
        &mut self,
        order_id: &str,
        menu_name: &str,
        quantity: u32,
        handle: Option<RowHandle>,
        snapshot: &SnapshotStore,
    ) -> bool {
        if self.is_selected(menu_name) {
            self.clear();
            return false;
        }
        self.select(order_id, menu_name, quantity, handle, snapshot)
    }

    /// Drop the selection and release its row
    pub fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.highlighter.clear(&handle);
        }
        self.current = None;
    }

    /// Swap the presentation callbacks, the selection itself is kept
    ///
    /// A highlighted row is released by the old highlighter and re-marked by
    /// the new one.
    pub fn set_highlighter(&mut self, highlighter: Arc<dyn RowHighlighter>) {
        if let Some(handle) = &self.handle {
            self.highlighter.clear(handle);
            highlighter.highlight(handle);
        }
        self.highlighter = highlighter;
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn handle(&self) -> Option<&RowHandle> {
        self.handle.as_ref()
    }

    pub fn has_selection(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_selected(&self, menu_name: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.menu_name == menu_name)
    }

    pub(crate) fn refresh_quantity(&mut self, quantity: u32) {
        if let Some(selection) = self.current.as_mut() {
            selection.quantity = quantity;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared::ticket::OrderLine;

    /// Records highlight/clear calls in order
    #[derive(Default)]
    pub(crate) struct RecordingHighlighter {
        pub events: Mutex<Vec<String>>,
    }

    impl RowHighlighter for RecordingHighlighter {
        fn highlight(&self, handle: &RowHandle) {
            self.events.lock().push(format!("on:{}", handle));
        }
        fn clear(&self, handle: &RowHandle) {
            self.events.lock().push(format!("off:{}", handle));
        }
    }

    fn snapshot() -> SnapshotStore {
        SnapshotStore::from_lines([
            OrderLine::new("m1", "Fried Chicken", 18000, 2),
            OrderLine::new("m2", "Cola", 3000, 1),
        ])
    }

    #[test]
    fn test_select_resolves_from_snapshot() {
        let mut tracker = SelectionTracker::default();
        assert!(tracker.select("order-1", "Cola", 1, None, &snapshot()));

        let sel = tracker.current().unwrap();
        assert_eq!(sel.menu_id, "m2");
        assert_eq!(sel.price, 3000);
        assert_eq!(sel.original_quantity, 1);
    }

    #[test]
    fn test_set_highlighter_moves_active_highlight() {
        let old = Arc::new(RecordingHighlighter::default());
        let new = Arc::new(RecordingHighlighter::default());
        let mut tracker = SelectionTracker::new(old.clone());
        tracker.select("order-1", "Cola", 1, Some(RowHandle::new("row-2")), &snapshot());

        tracker.set_highlighter(new.clone());
        assert_eq!(tracker.current().unwrap().menu_name, "Cola");
        assert_eq!(*old.events.lock(), vec!["on:row-2", "off:row-2"]);
        assert_eq!(*new.events.lock(), vec!["on:row-2"]);

        tracker.clear();
        assert_eq!(old.events.lock().len(), 2);
        assert_eq!(*new.events.lock(), vec!["on:row-2", "off:row-2"]);
    }

    #[test]
    fn test_select_unknown_line_uses_defaults() {
        let mut tracker = SelectionTracker::default();
        tracker.select("order-1", "Beer", 2, None, &snapshot());

        let sel = tracker.current().unwrap();
        assert_eq!(sel.menu_id, "order-1");
        assert_eq!(sel.price, 0);
        assert_eq!(sel.original_quantity, 0);
    }

    #[test]
    fn test_selecting_b_releases_a() {
        let highlighter = Arc::new(RecordingHighlighter::default());
        let mut tracker = SelectionTracker::new(highlighter.clone());
        let snap = snapshot();

        tracker.select("o", "Fried Chicken", 2, Some(RowHandle::new("row-a")), &snap);
        tracker.select("o", "Cola", 1, Some(RowHandle::new("row-b")), &snap);

        assert_eq!(tracker.current().unwrap().menu_name, "Cola");
        assert_eq!(tracker.handle(), Some(&RowHandle::new("row-b")));
        assert!(!tracker.is_selected("Fried Chicken"));
        assert_eq!(
            *highlighter.events.lock(),
            vec!["on:row-a", "off:row-a", "on:row-b"]
        );
    }

    #[test]
    fn test_toggle_same_line_deselects() {
        let highlighter = Arc::new(RecordingHighlighter::default());
        let mut tracker = SelectionTracker::new(highlighter.clone());
        let snap = snapshot();

        assert!(tracker.toggle("o", "Cola", 1, Some(RowHandle::new("row-b")), &snap));
        assert!(!tracker.toggle("o", "Cola", 1, Some(RowHandle::new("row-b")), &snap));
        assert!(!tracker.has_selection());
        assert!(tracker.handle().is_none());
        assert_eq!(highlighter.events.lock().last().unwrap(), "off:row-b");

        // different line switches instead of deselecting
        assert!(tracker.toggle("o", "Cola", 1, None, &snap));
        assert!(tracker.toggle("o", "Fried Chicken", 2, None, &snap));
        assert!(tracker.is_selected("Fried Chicken"));
    }
}
