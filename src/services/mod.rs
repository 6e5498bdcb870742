pub mod analyst;
pub mod openai_client;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod report;

pub use analyst::*;
pub use openai_client::*;
pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use report::*;
