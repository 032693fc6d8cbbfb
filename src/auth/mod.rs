//! Authentication: one-time codes, password login, JWT sessions.

mod handlers;
mod jwt;
mod service;

pub use handlers::{
    login, request_otp, session, set_password, verify_otp, AuthType, LoginResponse,
    VerifyOtpResponse,
};
pub use jwt::{Claims, JwtSecret, TokenPurpose, DEFAULT_ROLE};
pub use service::{AuthAppService, DomainPolicy};
