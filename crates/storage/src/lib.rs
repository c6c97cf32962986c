pub mod db;

pub use db::{
    create_db, get_processing_status, load_user_patterns, save_user_patterns,
    set_processing_status, DbPool,
};
