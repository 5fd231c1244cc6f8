mod company;
mod conversation;
mod invoice;

pub use company::{AccountLink, Company};
pub use conversation::{AccountTotal, Conversation, DailyTotal};
pub use invoice::{Invoice, MonthlyRevenue};
