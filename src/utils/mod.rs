pub mod environment;
pub mod paths;

pub use environment::{get_cache_dir, resolve_cache_dir};
pub use paths::{
    decode_store_key, encode_store_key, encode_url_component, store_entry_path,
    validate_store_key,
};
