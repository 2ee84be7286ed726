mod clock;
mod flow;
mod handoff;
mod provider;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use flow::{AuthorizationStart, FlowError, OAuthFlowService};
pub use handoff::{HANDOFF_TTL_SECONDS, HandoffError, HandoffStore, TokenBundle, spawn_sweeper};
pub use provider::{AuthorizationProvider, ExchangeError, RobloxOAuthProvider};
