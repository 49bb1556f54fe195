pub mod model;
pub mod repository;

pub use model::*;
pub use repository::DataEventRepository;
