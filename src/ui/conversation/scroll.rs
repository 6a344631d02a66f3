use tracing::debug;

use crate::events::ScrollMetrics;

/// Rendering surface the follower reads geometry from and scrolls.
pub trait Viewport {
    fn metrics(&self) -> ScrollMetrics;
    fn scroll_to_bottom(&mut self, smooth: bool);
}

/// Scroll command issued to a [`Viewport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCommand {
    pub smooth: bool,
}

/// Decides whether new messages pull the viewport to the bottom or leave the reader where they are.
#[derive(Debug, Clone)]
pub struct ScrollFollower {
    auto_follow: bool,
    tolerance: u32,
    smooth: bool,
    last_message_count: Option<usize>,
}

impl ScrollFollower {
    pub fn new(tolerance: u32, smooth: bool) -> Self {
        Self {
            auto_follow: true,
            tolerance,
            smooth,
            last_message_count: None,
        }
    }

    pub fn auto_follow(&self) -> bool {
        self.auto_follow
    }

    pub fn within_tolerance(&self, metrics: ScrollMetrics) -> bool {
        metrics.distance_to_bottom() <= self.tolerance
    }

    /// Viewport scrolled. Reaching the bottom resumes following.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        if self.within_tolerance(metrics) && !self.auto_follow {
            debug!("auto-follow resumed");
            self.auto_follow = true;
        }
    }

    /// The user is scrolling up to read history. Stops following unless already at the bottom.
    pub fn disable_auto_scroll(&mut self, metrics: ScrollMetrics) {
        if !self.within_tolerance(metrics) && self.auto_follow {
            debug!("auto-follow paused");
            self.auto_follow = false;
        }
    }

    /// Message count observed after a layout pass. Scrolls when it changed and we are following.
    pub fn on_content_change<V: Viewport>(
        &mut self,
        message_count: usize,
        viewport: &mut V,
    ) -> Option<ScrollCommand> {
        if self.last_message_count == Some(message_count) {
            return None;
        }
        self.last_message_count = Some(message_count);

        if !self.auto_follow {
            return None;
        }

        viewport.scroll_to_bottom(self.smooth);
        Some(ScrollCommand {
            smooth: self.smooth,
        })
    }

    /// Explicit jump to the newest message; resumes following.
    pub fn jump_to_bottom<V: Viewport>(&mut self, viewport: &mut V) -> ScrollCommand {
        self.auto_follow = true;
        viewport.scroll_to_bottom(self.smooth);
        ScrollCommand {
            smooth: self.smooth,
        }
    }
}

impl Default for ScrollFollower {
    fn default() -> Self {
        Self::new(20, false)
    }
}
