//! Navigation capability consumed by the session lifecycle.
//!
//! The core never renders anything; it only asks the presentation layer
//! to move between the two entry points it cares about: sign-in after a
//! session teardown, and the post-auth home after a successful login or
//! bootstrap. Duplicate `replace` calls to the current route must be
//! harmless no-ops.

/// Entry points the session lifecycle can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Home,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::SignIn => write!(f, "sign-in"),
            Route::Home => write!(f, "home"),
        }
    }
}

pub trait Navigator: Send + Sync {
    /// Replace the current route. Implementations must tolerate repeated
    /// calls with the same route.
    fn replace(&self, route: Route);
}
