pub mod backend;
pub mod citation;
pub mod config;
pub mod feedback;
pub mod history;
pub mod jobs;
pub mod markup;
pub mod models;
pub mod organization;
pub mod parser;
pub mod render;
pub mod sanitize;
pub mod server;

pub use config::AppConfig;
pub use render::AnswerRenderer;
pub use server::run_server;
