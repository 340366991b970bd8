pub mod errors;
pub mod model;
mod reader;
pub mod schema;

pub use errors::LoadError;
pub use model::{TextEncoding, TransactionRow, TransactionsTable};
pub use reader::{load_transactions, parse_order_date, parse_transactions};
pub use schema::{SemanticType, TransactionColumn};

#[cfg(test)]
mod tests;
