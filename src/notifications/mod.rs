mod email;

pub use email::EmailService;
