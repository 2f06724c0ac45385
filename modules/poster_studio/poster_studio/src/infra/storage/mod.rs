pub mod mapper;
mod table_repo;

pub use table_repo::TableRepository;
