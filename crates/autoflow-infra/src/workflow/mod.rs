//! Outbound transports for workflow steps.
//!
//! - `http_client` -- reqwest implementation of the `HttpClient` port
//! - `mail_relay` -- `MailRelay` selection, the HTTP relay and the disabled stand-in
//! - `smtp` -- lettre SMTP implementation of the `MailRelay` port

pub mod http_client;
pub mod mail_relay;
pub mod smtp;
