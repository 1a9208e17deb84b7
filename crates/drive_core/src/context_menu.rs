use shared::domain::ItemRef;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    Download,
    Rename,
    Share,
    Details,
    CancelUpload,
    Delete,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Download => "Download",
            MenuAction::Rename => "Rename",
            MenuAction::Share => "Share",
            MenuAction::Details => "Details",
            MenuAction::CancelUpload => "Cancel Upload",
            MenuAction::Delete => "Delete",
        }
    }
}

/// Actions offered for `item`, in display order.
pub fn menu_entries(item: &ItemRef) -> Vec<MenuAction> {
    match item {
        ItemRef::Upload(_) => vec![MenuAction::CancelUpload],
        ItemRef::Directory(_) => vec![
            MenuAction::Rename,
            MenuAction::Share,
            MenuAction::Details,
            MenuAction::Delete,
        ],
        ItemRef::File(_) => vec![
            MenuAction::Download,
            MenuAction::Rename,
            MenuAction::Share,
            MenuAction::Details,
            MenuAction::Delete,
        ],
    }
}

/// Where a pointer interaction landed, as resolved by the input dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// Inside the open menu's region.
    Menu(ItemRef),
    /// On an item's menu trigger; toggling is handled separately.
    Trigger(ItemRef),
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    OutsidePointer,
    Navigation,
    MutationSucceeded,
    ActionChosen,
}

/// Identifies one opening of a transient overlay. Clearing with a stale
/// token is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayToken(u64);

#[derive(Debug, Default)]
pub struct ContextMenuController {
    open: Option<(ItemRef, OverlayToken)>,
    next_token: u64,
}

impl ContextMenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_item(&self) -> Option<&ItemRef> {
        self.open.as_ref().map(|(item, _)| item)
    }

    pub fn is_open(&self, item: &ItemRef) -> bool {
        self.open_item() == Some(item)
    }

    pub fn active_token(&self) -> Option<OverlayToken> {
        self.open.as_ref().map(|(_, token)| *token)
    }

    /// Opens the menu for `item`, closing any other first.
    pub fn open(&mut self, item: ItemRef) -> OverlayToken {
        if let Some((previous, _)) = self.open.take() {
            debug!(%previous, "closing context menu before opening another");
        }
        self.next_token += 1;
        let token = OverlayToken(self.next_token);
        self.open = Some((item, token));
        token
    }

    pub fn toggle(&mut self, item: ItemRef) -> Option<OverlayToken> {
        if self.is_open(&item) {
            self.open = None;
            None
        } else {
            Some(self.open(item))
        }
    }

    pub fn close(&mut self, reason: DismissReason) -> Option<ItemRef> {
        let closed = self.open.take().map(|(item, _)| item);
        if let Some(item) = &closed {
            debug!(%item, ?reason, "context menu dismissed");
        }
        closed
    }

    pub fn clear_token(&mut self, token: OverlayToken) -> bool {
        if self.active_token() == Some(token) {
            self.open = None;
            true
        } else {
            false
        }
    }

    /// Returns whether the interaction dismissed the open menu.
    pub fn pointer_down(&mut self, target: &PointerTarget) -> bool {
        match target {
            PointerTarget::Menu(item) | PointerTarget::Trigger(item) if self.is_open(item) => false,
            PointerTarget::Trigger(_) => false,
            PointerTarget::Menu(_) | PointerTarget::Outside => {
                self.close(DismissReason::OutsidePointer).is_some()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/context_menu_tests.rs"]
mod tests;
