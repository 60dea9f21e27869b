pub mod archive;
pub mod git;
pub mod openai;
pub mod telegram;
