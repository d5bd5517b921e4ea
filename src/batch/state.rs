use serde::Serialize;
use tracing::trace;

/// Where a single table request is in its lifecycle.
///
/// `Pending → Fetching → Extracting → [Persisting →] Succeeded | Failed`. A request can fail
/// from any in-flight state; the two terminal states are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Fetching,
    Extracting,
    Persisting,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Fetching => "fetching",
            RequestState::Extracting => "extracting",
            RequestState::Persisting => "persisting",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    /// Whether `self → next` is a legal step.
    pub fn can_advance_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (Pending, Fetching) => true,
            (Fetching, Extracting) => true,
            (Extracting, Persisting) | (Extracting, Succeeded) => true,
            (Persisting, Succeeded) => true,
            (Fetching | Extracting | Persisting, Failed) => true,
            _ => false,
        }
    }
}

/// Lifecycle of one table request, walked step by step by the batch runner.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    table_id: String,
    state: RequestState,
}

impl RequestTracker {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            state: RequestState::Pending,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {} for {}",
            self.state.as_str(),
            next.as_str(),
            self.table_id
        );
        trace!(
            table = %self.table_id,
            from = self.state.as_str(),
            to = next.as_str()
        );
        self.state = next;
    }

    /// Move to `Failed`, returning the state the request failed in.
    pub fn fail(&mut self) -> RequestState {
        let failed_in = self.state;
        self.advance(RequestState::Failed);
        failed_in
    }
}

#[cfg(test)]
mod tests {
    use super::RequestState::*;
    use super::RequestTracker;

    #[test]
    fn transitions() {
        assert!(Pending.can_advance_to(Fetching));
        assert!(Fetching.can_advance_to(Failed));
        assert!(Extracting.can_advance_to(Succeeded));
        assert!(Extracting.can_advance_to(Persisting));
        assert!(Persisting.can_advance_to(Failed));

        assert!(!Pending.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Pending));
        assert!(!Succeeded.can_advance_to(Fetching));
        assert!(!Fetching.can_advance_to(Succeeded));
    }

    #[test]
    fn terminal_states() {
        assert!(Succeeded.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Persisting.is_terminal());
        assert_eq!(Extracting.as_str(), "extracting");
    }

    #[test]
    fn tracker_walks_the_happy_path() {
        let mut t = RequestTracker::new("stats_standard");
        assert_eq!(t.state(), Pending);
        for next in [Fetching, Extracting, Persisting, Succeeded] {
            t.advance(next);
        }
        assert!(t.state().is_terminal());
    }

    #[test]
    fn tracker_reports_where_it_failed() {
        let mut t = RequestTracker::new("stats_misc");
        t.advance(Fetching);
        t.advance(Extracting);
        assert_eq!(t.fail(), Extracting);
        assert_eq!(t.state(), Failed);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "illegal transition")]
    fn tracker_rejects_skipping_the_fetch() {
        let mut t = RequestTracker::new("stats_gca");
        t.advance(Extracting);
    }
}
