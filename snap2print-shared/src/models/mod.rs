/// Domain models for Snap2Print
///
/// Each model carries its own Postgres queries as associated functions that
/// accept any sqlx executor, so they run equally against a pool or inside a
/// transaction.
///
/// # Models
///
/// - `shop`: print shops and their shareable identifiers
/// - `user`: shop owner accounts
/// - `print_job`: one queued file per record, with its print options and status

pub mod print_job;
pub mod shop;
pub mod user;

pub use print_job::{CreatePrintJob, JobStatus, PrintJob, PrintType};
pub use shop::{CreateShop, Shop};
pub use user::{CreateUser, User, UserProfile};
