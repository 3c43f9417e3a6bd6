// The stores isolate all SQL. Handlers grab a connection once and pass it in.
pub mod follows;
pub mod posts;
pub mod query;
pub mod users;
