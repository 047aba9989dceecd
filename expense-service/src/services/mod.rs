pub mod database;
pub mod email;

pub use database::Database;
pub use email::{EmailProvider, ExpenseEmail, MockEmailService, SmtpEmailService};
