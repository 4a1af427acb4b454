pub mod helpers;
pub mod prepare_env;
