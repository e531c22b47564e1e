//! Email adapters.

mod mock_mailer;
mod resend_mailer;

pub use mock_mailer::MockMailer;
pub use resend_mailer::ResendMailer;
