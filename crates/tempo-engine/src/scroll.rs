//! Scroll following: keep the view pinned to growing content unless the user
//! scrolled away.

use crate::config::ScrollConfig;

/// How the surface should move to the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    /// Jump straight to the bottom.
    Instant,
    /// Converge on the bottom over a few frames.
    Smooth,
}

/// Decides when content growth should pull the view to the bottom.
#[derive(Debug, Clone)]
pub struct ScrollFollower {
    threshold_rows: usize,
    at_bottom: bool,
    initialized: bool,
    force_next: bool,
}

impl ScrollFollower {
    /// Create a follower that starts at the bottom.
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            threshold_rows: config.threshold_rows,
            at_bottom: true,
            initialized: false,
            force_next: false,
        }
    }

    /// Record where the view currently is.
    pub fn on_viewport(&mut self, viewport: &Viewport) {
        self.at_bottom = viewport.distance_from_bottom() <= self.threshold_rows;
    }

    /// Content grew. Returns the scroll to perform, if any.
    ///
    /// The first growth for a view jumps and leaves a pending force request
    /// for the growth after it. Later a pending force request scrolls
    /// regardless of position, and otherwise the view only follows if it was
    /// already at the bottom.
    pub fn on_growth(&mut self) -> Option<ScrollCommand> {
        if !self.initialized {
            self.initialized = true;
            return Some(ScrollCommand::Instant);
        }
        if self.force_next {
            self.force_next = false;
            return Some(ScrollCommand::Smooth);
        }
        self.at_bottom.then_some(ScrollCommand::Smooth)
    }

    /// Follow the next growth even if the user scrolled away (set on submit).
    pub fn force_follow_on_next(&mut self) {
        self.force_next = true;
    }

    /// Explicit "scroll to bottom" request. Leaves the force flag alone.
    pub fn scroll_to_bottom(&self) -> ScrollCommand {
        ScrollCommand::Smooth
    }

    pub fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// Forget the view, e.g. after switching conversations.
    pub fn reset(&mut self) {
        self.initialized = false;
        self.force_next = false;
        self.at_bottom = true;
    }
}

/// Row offset into content taller than the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    offset: usize,
    view_height: usize,
    content_height: usize,
    following: bool,
}

impl Viewport {
    /// Create a viewport over empty content.
    pub fn new(view_height: usize) -> Self {
        Self {
            view_height,
            ..Self::default()
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn view_height(&self) -> usize {
        self.view_height
    }

    pub fn content_height(&self) -> usize {
        self.content_height
    }

    pub fn set_view_height(&mut self, rows: usize) {
        self.view_height = rows;
        self.clamp();
    }

    pub fn set_content_height(&mut self, rows: usize) {
        self.content_height = rows;
        self.clamp();
    }

    /// Offset that shows the last row.
    pub fn max_offset(&self) -> usize {
        self.content_height.saturating_sub(self.view_height)
    }

    /// Rows between the view and the end of content.
    pub fn distance_from_bottom(&self) -> usize {
        self.max_offset().saturating_sub(self.offset)
    }

    /// User scroll up; cancels any smooth scroll in progress.
    pub fn scroll_up(&mut self, rows: usize) {
        self.following = false;
        self.offset = self.offset.saturating_sub(rows);
    }

    /// User scroll down; cancels any smooth scroll in progress.
    pub fn scroll_down(&mut self, rows: usize) {
        self.following = false;
        self.offset = (self.offset + rows).min(self.max_offset());
    }

    /// Apply a scroll command.
    pub fn apply(&mut self, command: ScrollCommand) {
        match command {
            ScrollCommand::Instant => {
                self.following = false;
                self.offset = self.max_offset();
            }
            ScrollCommand::Smooth => self.following = true,
        }
    }

    /// Advance a smooth scroll by one frame, halving the remaining distance.
    ///
    /// Returns `true` while still moving.
    pub fn step(&mut self) -> bool {
        if !self.following {
            return false;
        }
        let remaining = self.distance_from_bottom();
        if remaining == 0 {
            self.following = false;
            return false;
        }
        self.offset += remaining.div_ceil(2);
        if self.distance_from_bottom() == 0 {
            self.following = false;
        }
        true
    }

    /// Check if a smooth scroll is still converging.
    pub fn is_scrolling(&self) -> bool {
        self.following
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower() -> ScrollFollower {
        ScrollFollower::new(&ScrollConfig::default())
    }

    fn viewport(offset: usize, view: usize, content: usize) -> Viewport {
        let mut vp = Viewport::new(view);
        vp.set_content_height(content);
        vp.scroll_down(offset);
        vp
    }

    #[test]
    fn test_first_growth_jumps() {
        let mut f = follower();
        f.on_viewport(&viewport(0, 10, 50));
        assert_eq!(f.on_growth(), Some(ScrollCommand::Instant));
    }

    #[test]
    fn test_not_at_bottom_without_force_stays() {
        let mut f = follower();
        f.on_growth();
        f.on_viewport(&viewport(10, 10, 50));
        assert!(!f.is_at_bottom());
        assert_eq!(f.on_growth(), None);
    }

    #[test]
    fn test_at_bottom_follows_smoothly() {
        let mut f = follower();
        f.on_growth();
        // one row short of the end is within the threshold
        f.on_viewport(&viewport(39, 10, 50));
        assert!(f.is_at_bottom());
        assert_eq!(f.on_growth(), Some(ScrollCommand::Smooth));
    }

    #[test]
    fn test_force_is_one_shot() {
        let mut f = follower();
        f.on_growth();
        f.on_viewport(&viewport(0, 10, 50));

        f.force_follow_on_next();
        assert_eq!(f.on_growth(), Some(ScrollCommand::Smooth));
        assert_eq!(f.on_growth(), None);
    }

    #[test]
    fn test_first_jump_leaves_force_pending() {
        let mut f = follower();
        f.force_follow_on_next();
        assert_eq!(f.on_growth(), Some(ScrollCommand::Instant));

        f.on_viewport(&viewport(0, 10, 50));
        assert_eq!(f.on_growth(), Some(ScrollCommand::Smooth));
        assert_eq!(f.on_growth(), None);
    }

    #[test]
    fn test_scroll_to_bottom_keeps_force() {
        let mut f = follower();
        f.on_growth();
        f.on_viewport(&viewport(0, 10, 50));
        f.force_follow_on_next();

        assert_eq!(f.scroll_to_bottom(), ScrollCommand::Smooth);
        assert_eq!(f.on_growth(), Some(ScrollCommand::Smooth));
    }

    #[test]
    fn test_reset_jumps_again() {
        let mut f = follower();
        f.on_growth();
        f.reset();
        assert_eq!(f.on_growth(), Some(ScrollCommand::Instant));
    }

    #[test]
    fn test_smooth_scroll_converges() {
        let mut vp = viewport(0, 10, 50);
        vp.apply(ScrollCommand::Smooth);

        let mut frames = 0;
        while vp.step() {
            frames += 1;
            assert!(frames < 20);
        }
        assert_eq!(vp.offset(), 40);
        assert!(!vp.is_scrolling());
    }

    #[test]
    fn test_smooth_scroll_tracks_growth() {
        let mut vp = viewport(0, 10, 50);
        vp.apply(ScrollCommand::Smooth);
        vp.step();
        vp.set_content_height(80);
        while vp.step() {}
        assert_eq!(vp.offset(), 70);
    }

    #[test]
    fn test_user_scroll_cancels_smooth() {
        let mut vp = viewport(0, 10, 50);
        vp.apply(ScrollCommand::Smooth);
        vp.step();
        vp.scroll_up(3);
        assert!(!vp.is_scrolling());
        assert!(!vp.step());
    }

    #[test]
    fn test_instant_and_clamping() {
        let mut vp = viewport(0, 10, 50);
        vp.apply(ScrollCommand::Instant);
        assert_eq!(vp.offset(), 40);

        vp.set_content_height(20);
        assert_eq!(vp.offset(), 10);
        vp.set_view_height(30);
        assert_eq!(vp.offset(), 0);
        assert_eq!(vp.distance_from_bottom(), 0);
    }
}
