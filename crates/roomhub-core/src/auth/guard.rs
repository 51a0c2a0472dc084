//! Route guard: gate protected views behind an authenticated session.

use std::fmt;

use tokio::sync::watch;

use super::Session;

/// Navigable views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Rooms,
    Applications,
    Login,
    Register,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Home,
        Route::Rooms,
        Route::Applications,
        Route::Login,
        Route::Register,
    ];

    /// Where anonymous users are sent.
    pub const LOGIN_ENTRY: Route = Route::Login;

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Rooms => "/rooms",
            Route::Applications => "/applications",
            Route::Login => "/login",
            Route::Register => "/register",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|r| r.path() == normalized)
    }

    pub fn is_protected(self) -> bool {
        matches!(self, Route::Home | Route::Rooms | Route::Applications)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Guard state for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Session not yet derived from storage; decide nothing.
    Evaluating,
    Allowed,
    Denied,
}

/// What to render for a requested route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<V> {
    Render(V),
    Redirect(Route),
    /// Startup read not finished; show neither the view nor the redirect.
    Pending,
}

impl<V> GuardDecision<V> {
    pub fn state(&self) -> GuardState {
        match self {
            GuardDecision::Render(_) => GuardState::Allowed,
            GuardDecision::Redirect(_) => GuardState::Denied,
            GuardDecision::Pending => GuardState::Evaluating,
        }
    }
}

/// Pure guard evaluation. `None` means the session is not known yet.
pub fn evaluate(session: Option<&Session>) -> GuardState {
    match session {
        None => GuardState::Evaluating,
        Some(Session::Authenticated(_)) => GuardState::Allowed,
        Some(Session::Anonymous) => GuardState::Denied,
    }
}

/// Decide what to render for `route`. Public routes always render.
pub fn decide<V>(session: Option<&Session>, route: Route, view: V) -> GuardDecision<V> {
    if !route.is_protected() {
        return GuardDecision::Render(view);
    }
    match evaluate(session) {
        GuardState::Allowed => GuardDecision::Render(view),
        GuardState::Denied => GuardDecision::Redirect(Route::LOGIN_ENTRY),
        GuardState::Evaluating => GuardDecision::Pending,
    }
}

/// Guard bound to a session store's change feed.
///
/// Every check reads the latest session, so a view rendered before
/// `logout()` redirects on its next check without a reload.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<Option<Session>>,
}

impl RouteGuard {
    pub fn new(session: watch::Receiver<Option<Session>>) -> Self {
        Self { session }
    }

    pub fn state(&self) -> GuardState {
        evaluate((*self.session.borrow()).as_ref())
    }

    pub fn check<V>(&self, route: Route, view: V) -> GuardDecision<V> {
        decide((*self.session.borrow()).as_ref(), route, view)
    }

    /// Wait for the next session replacement and return the new state.
    /// `None` once the session store is gone.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.session.changed().await.ok()?;
        Some(evaluate((*self.session.borrow_and_update()).as_ref()))
    }
}
