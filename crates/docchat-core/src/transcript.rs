//! Paginated transcript of one session, with scroll anchoring.
//!
//! The transcript owns pagination state (which page is loaded, whether older
//! pages exist, whether one is loading) and a [`Viewport`] measured in
//! rendered lines. Older pages are requested when the viewport nears the
//! top; prepending them shifts `scroll_top` by the added height so the lines
//! under the reader's eyes stay put. New content at the bottom is followed
//! only while the reader is near the bottom.

use docchat_types::chat::Message;
use docchat_types::envelope::MessagePage;
use docchat_types::error::ClientError;
use docchat_types::event::Notice;
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::store::ChatStore;

/// Lines from the top at which older history is requested.
pub const LOAD_OLDER_THRESHOLD: u32 = 120;

/// Lines from the bottom within which the reader counts as following.
pub const NEAR_BOTTOM_THRESHOLD: u32 = 200;

/// Scrollable window over the rendered transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub scroll_top: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl Viewport {
    pub fn new(client_height: u32) -> Self {
        Self {
            client_height,
            ..Self::default()
        }
    }

    pub fn max_scroll_top(&self) -> u32 {
        self.scroll_height.saturating_sub(self.client_height)
    }

    pub fn distance_from_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top.saturating_add(self.client_height))
    }

    pub fn is_near_top(&self) -> bool {
        self.scroll_top < LOAD_OLDER_THRESHOLD
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_from_bottom() < NEAR_BOTTOM_THRESHOLD
    }

    pub fn scroll_to(&mut self, scroll_top: u32) {
        self.scroll_top = scroll_top.min(self.max_scroll_top());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.max_scroll_top();
    }

    /// Content was inserted above the visible area.
    pub fn grow_above(&mut self, added: u32) {
        self.scroll_height = self.scroll_height.saturating_add(added);
        self.scroll_top = self.scroll_top.saturating_add(added).min(self.max_scroll_top());
    }

    pub fn resize(&mut self, client_height: u32) {
        self.client_height = client_height;
        self.scroll_to(self.scroll_top);
    }
}

/// Rendered height of a message, in lines.
pub type Measure = Box<dyn Fn(&Message) -> u32 + Send + Sync>;

/// Role header, content lines, blank separator.
pub fn default_measure(message: &Message) -> u32 {
    let lines = message.content.lines().count().max(1) as u32;
    lines + 2
}

/// Pagination and scroll state for the session being viewed.
pub struct Transcript {
    store: ChatStore,
    session_id: Option<Uuid>,
    page_size: u32,
    page: u32,
    has_more: bool,
    loading_older: bool,
    following: bool,
    viewport: Viewport,
    measure: Measure,
}

impl Transcript {
    pub fn new(store: ChatStore, page_size: u32, client_height: u32) -> Self {
        Self {
            store,
            session_id: None,
            page_size,
            page: 0,
            has_more: false,
            loading_older: false,
            following: true,
            viewport: Viewport::new(client_height),
            measure: Box::new(default_measure),
        }
    }

    /// Measure messages with `measure` instead of counting content lines.
    pub fn with_measure(mut self, measure: impl Fn(&Message) -> u32 + Send + Sync + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Highest page loaded so far; 0 before the first load.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    /// Whether new content at the bottom is being followed.
    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Switch to `session_id`: clear the list, load its metadata and the
    /// newest page, and scroll to the bottom.
    ///
    /// A metadata failure only produces a notice; a page failure also
    /// returns the error.
    pub async fn open<B: ChatBackend>(
        &mut self,
        backend: &B,
        session_id: Uuid,
    ) -> Result<(), ClientError> {
        self.session_id = Some(session_id);
        self.page = 0;
        self.has_more = false;
        self.loading_older = false;
        self.following = true;
        self.store.set_messages(Vec::new());
        self.viewport.scroll_height = 0;
        self.viewport.scroll_top = 0;

        match backend.get_session(&session_id).await {
            Ok(session) => self.store.set_current_session(Some(session)),
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "failed to load session");
                self.store.bus().notify(Notice::error("Failed to load session"));
            }
        }

        self.store.set_loading(true);
        let result = backend.list_messages(&session_id, 1, self.page_size).await;
        self.store.set_loading(false);

        match result {
            Ok(page) => {
                tracing::debug!(
                    %session_id,
                    count = page.data.len(),
                    has_more = page.meta.has_next_page,
                    "loaded newest messages"
                );
                self.page = 1;
                self.has_more = page.meta.has_next_page;
                self.store.set_messages(page.data);
                self.viewport.scroll_height = self.content_height();
                self.viewport.scroll_to_bottom();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "failed to load messages");
                self.store.bus().notify(Notice::error("Failed to load messages"));
                Err(e)
            }
        }
    }

    /// The reader scrolled to `scroll_top`. Returns whether older history
    /// should be loaded now.
    pub fn on_scroll(&mut self, scroll_top: u32) -> bool {
        self.viewport.scroll_to(scroll_top);
        self.following = self.viewport.is_near_bottom();
        self.wants_older()
    }

    pub fn on_resize(&mut self, client_height: u32) {
        self.viewport.resize(client_height);
        if self.following {
            self.viewport.scroll_to_bottom();
        }
    }

    fn wants_older(&self) -> bool {
        self.session_id.is_some() && self.viewport.is_near_top() && self.has_more && !self.loading_older
    }

    /// Claim the next older page. Returns `None` while one is already
    /// loading or when history is exhausted.
    pub fn begin_load_older(&mut self) -> Option<u32> {
        if self.session_id.is_none() || self.loading_older || !self.has_more {
            return None;
        }
        self.loading_older = true;
        Some(self.page + 1)
    }

    /// Install a fetched older page, keeping the viewport anchored on the
    /// content the reader was looking at. Returns how many messages were new.
    pub fn finish_load_older(&mut self, page_number: u32, page: MessagePage) -> usize {
        self.loading_older = false;
        self.page = page_number;
        self.has_more = page.meta.has_next_page;

        let before = self.viewport.scroll_height;
        let added = self.store.prepend_messages(page.data);
        let after = self.content_height();
        self.viewport.grow_above(after.saturating_sub(before));
        added
    }

    /// Release the claim from [`begin_load_older`](Self::begin_load_older)
    /// after a failed fetch. Pagination state is left as it was.
    pub fn abort_load_older(&mut self) {
        self.loading_older = false;
    }

    /// Load the next older page if allowed. Returns the number of messages
    /// added; 0 when nothing was requested.
    pub async fn load_older<B: ChatBackend>(&mut self, backend: &B) -> Result<usize, ClientError> {
        let Some(session_id) = self.session_id else {
            return Ok(0);
        };
        let Some(page_number) = self.begin_load_older() else {
            return Ok(0);
        };

        match backend
            .list_messages(&session_id, page_number, self.page_size)
            .await
        {
            Ok(page) => {
                let added = self.finish_load_older(page_number, page);
                tracing::debug!(%session_id, page = page_number, added, has_more = self.has_more, "loaded older messages");
                Ok(added)
            }
            Err(e) => {
                self.abort_load_older();
                tracing::warn!(%session_id, page = page_number, error = %e, "failed to load older messages");
                self.store.bus().notify(Notice::error("Failed to load older messages"));
                Err(e)
            }
        }
    }

    /// Scroll to the top and load older history if there is any.
    pub async fn scroll_to_top<B: ChatBackend>(&mut self, backend: &B) -> Result<usize, ClientError> {
        if self.on_scroll(0) {
            self.load_older(backend).await
        } else {
            Ok(0)
        }
    }

    /// Messages changed at the bottom (a new message or a streamed chunk).
    /// Follows to the bottom only while the reader is following.
    pub fn content_changed(&mut self) {
        self.viewport.scroll_height = self.content_height();
        if self.following {
            self.viewport.scroll_to_bottom();
        } else {
            self.viewport.scroll_to(self.viewport.scroll_top);
        }
    }

    /// Jump to the newest message and resume following.
    pub fn jump_to_latest(&mut self) {
        self.following = true;
        self.viewport.scroll_height = self.content_height();
        self.viewport.scroll_to_bottom();
    }

    fn content_height(&self) -> u32 {
        self.store
            .messages()
            .iter()
            .map(|m| (self.measure)(m))
            .sum()
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("session_id", &self.session_id)
            .field("page", &self.page)
            .field("has_more", &self.has_more)
            .field("loading_older", &self.loading_older)
            .field("viewport", &self.viewport)
            .finish()
    }
}
