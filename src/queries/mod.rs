pub mod audios;
pub mod ddl;
pub mod metadata;
pub mod presets;
pub mod schedule_config;
pub mod slots;
pub mod users;
