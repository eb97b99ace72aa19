pub mod balance_writer;
pub mod operation_reader;
pub mod transaction_writer;
