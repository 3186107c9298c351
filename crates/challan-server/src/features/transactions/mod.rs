mod routes;

pub use routes::transactions_routes;
