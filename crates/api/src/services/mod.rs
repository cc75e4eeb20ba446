//! Application services.
//!
//! - [`account`] - register / login / update / reset / delete workflows
//! - [`confirmation`] - one-time confirmation-code registry
//! - [`csrf`] - anti-forgery token issue/verify
//! - [`mailer`] - outgoing mail seam

pub mod account;
pub mod confirmation;
pub mod csrf;
pub mod mailer;

pub use account::AccountService;
pub use confirmation::ConfirmationCodes;
pub use csrf::CsrfTokens;
pub use mailer::Mailer;
