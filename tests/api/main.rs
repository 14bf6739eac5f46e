mod doctors;
mod store;
mod user;
mod utils;
