//! Identity flows: login, registration, logout and the session check
//!
//! | Module    | Responsibility                                   |
//! |-----------|--------------------------------------------------|
//! | `types`   | Flow descriptors, sessions, submission payloads  |
//! | `extract` | Anti-forgery token and error message lookup      |
//! | `client`  | The two-phase initialize/submit exchanges        |

mod client;
mod extract;
mod types;

pub use client::{IdentityClient, Navigator, Teardown};
pub use extract::{csrf_token, error_message, CSRF_TOKEN_NODE, FALLBACK_ERROR};
pub use types::{
    FlowDescriptor, FlowFailure, FlowKind, FlowUi, LogoutFlow, NodeAttributes,
    RegistrationResult, Session, UiNode, UiText,
};
