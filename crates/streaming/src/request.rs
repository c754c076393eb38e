/// Identifies one fetch issued by a consumer.
///
/// Tokens are small copyable handles that increase monotonically per
/// consumer, so "newer" is a plain integer comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

/// Last-request-wins gate for a single consumer.
///
/// Every new request supersedes the previous one. A response is accepted only
/// if it carries the latest token and has not been accepted before; anything
/// else is stale and must be dropped without touching visible state.
#[derive(Debug, Default, Clone)]
pub struct LatestRequest {
    next: u64,
    latest: Option<RequestToken>,
    pending: bool,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestToken {
        self.next += 1;
        let token = RequestToken(self.next);
        self.latest = Some(token);
        self.pending = true;
        token
    }

    pub fn latest(&self) -> Option<RequestToken> {
        self.latest
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest == Some(token)
    }

    /// `true` while the latest request has not been settled.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Accepts the response for `token` if it is the latest pending request.
    ///
    /// Returns `false` for stale tokens and for a second response to the
    /// same token.
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if self.pending && self.is_current(token) {
            self.pending = false;
            true
        } else {
            false
        }
    }

    /// Supersedes any pending request without issuing a new one.
    pub fn invalidate(&mut self) {
        self.next += 1;
        self.latest = None;
        self.pending = false;
    }
}
